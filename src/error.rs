//! Error types for toolspec.
//!
//! The taxonomy splits along the pipeline stages: resolution errors
//! (`UnsupportedType`, `RecursiveType`) surface when a tool is defined,
//! parse errors (`Syntax`, `MixedArgumentOrder`) when a call expression is
//! decoded, and materialization errors (`MissingArgument`, `TypeMismatch`,
//! `InvalidChoice`, `UnknownArgument`) when raw arguments are validated.
//! Every failure is deterministic for a given input, so nothing here is ever
//! retried internally; callers should re-derive corrected arguments (for a
//! model, that means re-prompting) instead. Errors raised by a tool's own
//! handler body are never wrapped in these variants — they propagate as the
//! handler returned them.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    /// A type annotation the resolver does not support
    #[error("unsupported type annotation: {annotation}. Supported: {supported}")]
    UnsupportedType {
        /// Display form of the offending annotation
        annotation: String,
        /// Display form of the supported shapes
        supported: String,
    },

    /// A structured record contains itself as a direct value type
    #[error("field '{field}' of record '{record}' recursively contains the record as a value type")]
    RecursiveType {
        /// Record whose definition recurses
        record: String,
        /// Field where the recursion was detected
        field: String,
    },

    /// Malformed call expression
    #[error("syntax error at byte {offset}: {message}")]
    Syntax {
        /// Byte offset into the expression where parsing failed
        offset: usize,
        /// What went wrong
        message: String,
    },

    /// A positional argument appeared after a keyword argument
    #[error("positional argument at byte {offset} follows a keyword argument")]
    MixedArgumentOrder {
        /// Byte offset of the offending positional argument
        offset: usize,
    },

    /// A required parameter was not supplied and has no default
    #[error("required parameter '{parameter}' of tool '{tool}' missing")]
    MissingArgument {
        /// Tool (or nested record) being materialized
        tool: String,
        /// Dotted path to the missing parameter
        parameter: String,
    },

    /// A supplied value has the wrong runtime kind
    #[error("parameter '{parameter}': expected {expected}, got {received}")]
    TypeMismatch {
        /// Dotted path to the offending parameter
        parameter: String,
        /// What the descriptor required
        expected: String,
        /// What was actually supplied
        received: String,
    },

    /// A value is outside an enumeration or literal set
    #[error("parameter '{parameter}': {value} is not one of {choices:?}")]
    InvalidChoice {
        /// Dotted path to the offending parameter
        parameter: String,
        /// The rejected value
        value: String,
        /// The closed set of allowed values, in declaration order
        choices: Vec<String>,
    },

    /// An argument name that no parameter declares
    #[error("tool '{tool}' has no parameter '{argument}'")]
    UnknownArgument {
        /// Tool being materialized
        tool: String,
        /// The unrecognized argument name
        argument: String,
    },

    /// More positional values than declared parameters
    #[error("tool '{tool}' takes at most {expected} positional arguments but received {received}")]
    SurplusPositional {
        /// Tool being materialized
        tool: String,
        /// Number of declared parameters
        expected: usize,
        /// Number of positional values supplied
        received: usize,
    },

    /// An unrecognized schema format name
    #[error("unknown schema format '{0}'; expected base, gorilla, or claude")]
    InvalidFormat(String),

    /// Two tool collections (or two registrations) share a name
    #[error("tool with name '{0}' is already registered")]
    DuplicateName(String),

    /// Lookup of a tool name that was never registered
    #[error("tool with name '{0}' has not been registered")]
    UnknownTool(String),

    /// Tool handler failure, reported by the handler itself
    #[error("tool execution error: {0}")]
    Tool(String),

    /// An invocation could not be driven on the ambient async runtime
    #[error("runtime error: {0}")]
    Runtime(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error while persisting schemas
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an unsupported-type error
    pub fn unsupported_type(annotation: impl Into<String>, supported: impl Into<String>) -> Self {
        Error::UnsupportedType {
            annotation: annotation.into(),
            supported: supported.into(),
        }
    }

    /// Create a recursive-type error
    pub fn recursive_type(record: impl Into<String>, field: impl Into<String>) -> Self {
        Error::RecursiveType {
            record: record.into(),
            field: field.into(),
        }
    }

    /// Create a syntax error at a byte offset
    pub fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Error::Syntax {
            offset,
            message: message.into(),
        }
    }

    /// Create a missing-argument error
    pub fn missing_argument(tool: impl Into<String>, parameter: impl Into<String>) -> Self {
        Error::MissingArgument {
            tool: tool.into(),
            parameter: parameter.into(),
        }
    }

    /// Create a type-mismatch error
    pub fn type_mismatch(
        parameter: impl Into<String>,
        expected: impl Into<String>,
        received: impl Into<String>,
    ) -> Self {
        Error::TypeMismatch {
            parameter: parameter.into(),
            expected: expected.into(),
            received: received.into(),
        }
    }

    /// Create an invalid-choice error
    pub fn invalid_choice(
        parameter: impl Into<String>,
        value: impl Into<String>,
        choices: Vec<String>,
    ) -> Self {
        Error::InvalidChoice {
            parameter: parameter.into(),
            value: value.into(),
            choices,
        }
    }

    /// Create an unknown-argument error
    pub fn unknown_argument(tool: impl Into<String>, argument: impl Into<String>) -> Self {
        Error::UnknownArgument {
            tool: tool.into(),
            argument: argument.into(),
        }
    }

    /// Create a tool execution error
    pub fn tool(msg: impl Into<String>) -> Self {
        Error::Tool(msg.into())
    }
}
