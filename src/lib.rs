//! # toolspec
//!
//! Schema derivation and argument materialization for LLM tool calling.
//!
//! `toolspec` turns typed tool definitions into the JSON schemas model
//! providers consume, and decodes what models produce back into validated
//! invocations:
//!
//! - **Definition**: describe a tool's parameters with [`TypeExpr`]
//!   annotations (scalars, lists, sets, optionals, enumerations, literal
//!   sets, structured records), or derive a tool straight from a record
//!   shape. Annotations resolve to canonical descriptors when the tool is
//!   built, so bad definitions fail early.
//! - **Schema**: every tool compiles to one JSON Schema parameters tree,
//!   projected into the [`SchemaFormat`] a provider expects (`base`,
//!   `gorilla`, `claude`). Object properties keep declaration order.
//! - **Decoding**: structured call metadata and textual call expressions
//!   (`get_weather(location="Paris", days=3)`) both materialize into
//!   validated arguments. The expression grammar admits literals only —
//!   nothing a model writes is ever evaluated.
//! - **Invocation**: handler tools await an async closure; record tools
//!   construct their record. Handler errors propagate untouched.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use serde_json::json;
//! use toolspec::{tool, SchemaFormat, ToolRegistry, TypeExpr};
//!
//! #[tokio::main]
//! async fn main() -> toolspec::Result<()> {
//!     let mut registry = ToolRegistry::new();
//!     registry.register(
//!         tool("get_weather", "Get the current weather for a location")
//!             .param("location", TypeExpr::string())
//!             .default_param("days", TypeExpr::integer(), json!(1))
//!             .build(|args| async move {
//!                 Ok(json!({"location": args["location"], "forecast": "sunny"}))
//!             })?,
//!     )?;
//!
//!     // Hand the schemas to a model provider.
//!     let schemas = registry.compile_all_json(SchemaFormat::Claude)?;
//!
//!     // Dispatch what the model sent back.
//!     let result = registry
//!         .invoke_from_text(r#"get_weather(location="Paris", days=3)"#)
//!         .await?;
//!     println!("{schemas}\n{result}");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// Environment-driven configuration
pub mod config;
/// Type annotations, record shapes, and the descriptor resolver
pub mod descriptor;
/// Error types
pub mod error;
/// Tool invocation and sync driving
pub mod invoke;
/// Argument binding and validation
pub mod materialize;
/// Call expression parsing
pub mod parser;
/// Tool registry with cached schema derivation
pub mod registry;
/// Schema compilation and wire-format projection
pub mod schema;
/// Tool definitions and the builder
pub mod tool;

pub use config::default_format;
pub use descriptor::{
    resolve, FieldDecl, FieldDescriptor, FieldTupleShape, ModelShape, RecordShape, Scalar,
    ScalarKind, StructuredType, TypeDescriptor, TypeExpr, TypedMapShape,
};
pub use error::{Error, Result};
pub use invoke::{block_on, invoke};
pub use materialize::{materialize, Invocation};
pub use parser::{parse_call, ParsedCall};
pub use registry::{DescriptionProvider, ToolDocs, ToolRegistry};
pub use schema::{compile, compile_parameters, project, SchemaFormat};
pub use tool::{record_tool, tool, Callable, Tool, ToolBuilder, ToolHandler};

/// Commonly used items.
pub mod prelude {
    pub use crate::descriptor::{FieldDecl, ModelShape, TypeExpr};
    pub use crate::error::{Error, Result};
    pub use crate::registry::ToolRegistry;
    pub use crate::schema::SchemaFormat;
    pub use crate::tool::{record_tool, tool, Tool};
}
