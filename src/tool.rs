//! Tool definitions and the fluent builder.
//!
//! A [`Tool`] pairs a name, an optional description, and a resolved
//! parameter list with something to run: either an async handler closure or
//! a record shape (invoking a record tool constructs the record — no user
//! code runs). Parameters are resolved when the tool is built, so an
//! unsupported or recursive annotation fails at definition time, not when a
//! model first calls the tool.
//!
//! # Examples
//!
//! ```rust,no_run
//! use serde_json::json;
//! use toolspec::{tool, TypeExpr};
//!
//! # fn main() -> toolspec::Result<()> {
//! let weather = tool("get_weather", "Get the current weather")
//!     .param("location", TypeExpr::string())
//!     .default_param("days", TypeExpr::integer(), json!(1))
//!     .build(|args| async move {
//!         let location = args["location"].as_str().unwrap_or("unknown");
//!         Ok(json!({"location": location, "forecast": "sunny"}))
//!     })?;
//!
//! let schema = weather.schema(Default::default());
//! # let _ = schema;
//! # Ok(())
//! # }
//! ```

use crate::descriptor::{resolve, resolve_fields, FieldDecl, FieldDescriptor, RecordShape, TypeExpr};
use crate::invoke;
use crate::materialize::{materialize, Invocation};
use crate::parser::parse_call;
use crate::schema::{compile_parameters, project, SchemaFormat};
use crate::{Error, Result};
use futures::future::BoxFuture;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Type-erased async tool handler. Receives the materialized arguments as a
/// JSON object and returns the tool's result.
pub type ToolHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// What invoking a tool does.
pub enum Callable {
    /// Await an async handler with the materialized arguments
    Handler(ToolHandler),
    /// Construct the record from the materialized fields
    Record(Arc<dyn RecordShape>),
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Handler(_) => f.write_str("Callable::Handler(..)"),
            Callable::Record(shape) => write!(f, "Callable::Record({})", shape.name()),
        }
    }
}

/// A defined tool: schema source and invocation target in one.
pub struct Tool {
    name: String,
    description: Option<String>,
    parameters: Vec<FieldDescriptor>,
    callable: Callable,
}

impl Tool {
    /// The tool's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The tool's description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Resolved parameters, in declaration order.
    pub fn parameters(&self) -> &[FieldDescriptor] {
        &self.parameters
    }

    pub(crate) fn callable(&self) -> &Callable {
        &self.callable
    }

    pub(crate) fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    pub(crate) fn describe_parameter(&mut self, name: &str, description: impl Into<String>) {
        if let Some(param) = self.parameters.iter_mut().find(|p| p.name == name) {
            param.description = Some(description.into());
        }
    }

    /// The `{"type": "object", ...}` parameters tree shared by every format.
    pub fn parameters_schema(&self) -> Value {
        compile_parameters(&self.parameters)
    }

    /// The tool's full schema in the given wire format.
    pub fn schema(&self, format: SchemaFormat) -> Value {
        project(
            format,
            &self.name,
            self.description.as_deref(),
            self.parameters_schema(),
        )
    }

    /// Invoke the tool with a JSON object of arguments.
    ///
    /// Arguments go through the same validation as a parsed call
    /// expression; handler errors propagate unchanged.
    pub async fn invoke_args(&self, args: Value) -> Result<Value> {
        let invocation = Invocation::from_args(&self.name, args)?;
        let bound = materialize(self, &invocation)?;
        invoke::invoke(self, bound).await
    }

    /// Parse a textual call expression naming this tool and invoke it.
    pub async fn invoke_text(&self, expr: &str) -> Result<Value> {
        let call = parse_call(expr)?;
        if call.name != self.name {
            return Err(Error::UnknownTool(call.name));
        }
        let invocation = Invocation::from(call);
        let bound = materialize(self, &invocation)?;
        invoke::invoke(self, bound).await
    }
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters.len())
            .field("callable", &self.callable)
            .finish()
    }
}

/// Start building a tool with the given name and description.
pub fn tool(name: impl Into<String>, description: impl Into<String>) -> ToolBuilder {
    ToolBuilder {
        name: name.into(),
        description: Some(description.into()),
        params: Vec::new(),
    }
}

/// Build a tool straight from a record shape: the record's fields become the
/// parameters, and invoking the tool constructs the record.
pub fn record_tool(shape: Arc<dyn RecordShape>) -> Result<Tool> {
    let descriptor = resolve(&TypeExpr::record(shape.clone()))?;
    let parameters = match descriptor {
        crate::descriptor::TypeDescriptor::Structured(st) => st.fields().to_vec(),
        _ => unreachable!("a record annotation resolves to a structured descriptor"),
    };
    Ok(Tool {
        name: shape.name().to_string(),
        description: shape.description().map(str::to_string),
        parameters,
        callable: Callable::Record(shape),
    })
}

/// Fluent tool builder. Parameters keep their declaration order.
#[derive(Debug)]
pub struct ToolBuilder {
    name: String,
    description: Option<String>,
    params: Vec<FieldDecl>,
}

impl ToolBuilder {
    /// Add a required parameter.
    pub fn param(mut self, name: impl Into<String>, type_expr: TypeExpr) -> Self {
        self.params.push(FieldDecl::new(name, type_expr));
        self
    }

    /// Add an optional parameter (null or absent passes through as unset).
    pub fn optional_param(mut self, name: impl Into<String>, inner: TypeExpr) -> Self {
        self.params
            .push(FieldDecl::new(name, TypeExpr::optional(inner)));
        self
    }

    /// Add a parameter with a default value. The default is validated
    /// through the same coercion rules as a supplied argument.
    pub fn default_param(
        mut self,
        name: impl Into<String>,
        type_expr: TypeExpr,
        default: Value,
    ) -> Self {
        self.params
            .push(FieldDecl::new(name, type_expr).with_default(default));
        self
    }

    /// Add a fully-specified parameter declaration.
    pub fn param_with(mut self, decl: FieldDecl) -> Self {
        self.params.push(decl);
        self
    }

    /// Resolve the parameters and finish with an async handler.
    ///
    /// Fails here, at definition time, if any annotation is unsupported or
    /// a record recurses as a direct value type.
    pub fn build<F, Fut>(self, handler: F) -> Result<Tool>
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let parameters = resolve_fields(&self.params)?;
        let handler: ToolHandler = Arc::new(move |args| Box::pin(handler(args)));
        Ok(Tool {
            name: self.name,
            description: self.description,
            parameters,
            callable: Callable::Handler(handler),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ModelShape;
    use serde_json::json;

    fn echo_tool() -> Tool {
        tool("echo", "Echo the arguments back")
            .param("text", TypeExpr::string())
            .default_param("repeat", TypeExpr::integer(), json!(1))
            .build(|args| async move { Ok(args) })
            .unwrap()
    }

    #[test]
    fn test_build_resolves_parameters_in_order() {
        let t = echo_tool();
        let names: Vec<_> = t.parameters().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["text", "repeat"]);
        assert!(t.parameters()[0].required);
        assert!(!t.parameters()[1].required);
    }

    #[test]
    fn test_build_fails_on_recursive_annotation() {
        let node = ModelShape::new("Node");
        node.define([FieldDecl::new("child", TypeExpr::record(node.clone()))]);

        let result = tool("make_node", "build a node")
            .param("node", TypeExpr::record(node))
            .build(|args| async move { Ok(args) });
        assert!(matches!(result, Err(Error::RecursiveType { .. })));
    }

    #[test]
    fn test_schema_carries_name_and_description() {
        let schema = echo_tool().schema(SchemaFormat::Base);
        assert_eq!(schema["function"]["name"], "echo");
        assert_eq!(schema["function"]["description"], "Echo the arguments back");
        assert_eq!(
            schema["function"]["parameters"]["required"],
            json!(["text"])
        );
    }

    #[tokio::test]
    async fn test_invoke_text_round_trip() {
        let result = echo_tool()
            .invoke_text(r#"echo(text="hi", repeat=2)"#)
            .await
            .unwrap();
        assert_eq!(result, json!({"text": "hi", "repeat": 2}));
    }

    #[tokio::test]
    async fn test_invoke_text_applies_defaults() {
        let result = echo_tool().invoke_text(r#"echo("hello")"#).await.unwrap();
        assert_eq!(result, json!({"text": "hello", "repeat": 1}));
    }

    #[tokio::test]
    async fn test_invoke_text_rejects_other_tool_names() {
        let err = echo_tool().invoke_text("other(1)").await.unwrap_err();
        assert!(matches!(err, Error::UnknownTool(name) if name == "other"));
    }

    #[tokio::test]
    async fn test_invoke_args_requires_an_object() {
        let err = echo_tool().invoke_args(json!([1, 2])).await.unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[tokio::test]
    async fn test_record_tool_constructs_without_a_handler() {
        let point = ModelShape::new("Point");
        point.define([
            FieldDecl::new("x", TypeExpr::number()),
            FieldDecl::new("y", TypeExpr::number()),
        ]);

        let t = record_tool(point).unwrap();
        assert_eq!(t.name(), "Point");
        let built = t.invoke_text("Point(x=1.5, y=2.5)").await.unwrap();
        assert_eq!(built, json!({"x": 1.5, "y": 2.5}));
    }

    #[test]
    fn test_debug_omits_the_handler() {
        let rendered = format!("{:?}", echo_tool());
        assert!(rendered.contains("echo"));
        assert!(rendered.contains("Handler"));
    }
}
