//! Schema compilation: canonical descriptors to JSON Schema trees, and the
//! provider-specific projections of a compiled tool.
//!
//! Compilation is deterministic and pure. The same descriptor always emits
//! the same `Value`, with object properties and `enum` lists in declaration
//! order (`serde_json`'s `preserve_order` feature keeps insertion order).
//! Projections are relabeling only: every format carries the identical
//! parameters subtree, differing in envelope keys alone.

use crate::descriptor::{FieldDescriptor, TypeDescriptor};
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// The wire formats a compiled tool can be projected into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SchemaFormat {
    /// OpenAI-style `{"type": "function", "function": {...}}` envelope
    #[default]
    Base,
    /// Base envelope plus an `api_call` target key
    Gorilla,
    /// Flat content-block shape with `input_schema`
    Claude,
}

impl SchemaFormat {
    /// All formats, for iteration in tests and caches.
    pub const ALL: [SchemaFormat; 3] =
        [SchemaFormat::Base, SchemaFormat::Gorilla, SchemaFormat::Claude];

    /// The canonical lowercase name of this format.
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaFormat::Base => "base",
            SchemaFormat::Gorilla => "gorilla",
            SchemaFormat::Claude => "claude",
        }
    }
}

impl fmt::Display for SchemaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "base" => Ok(SchemaFormat::Base),
            "gorilla" => Ok(SchemaFormat::Gorilla),
            "claude" => Ok(SchemaFormat::Claude),
            other => Err(Error::InvalidFormat(other.to_string())),
        }
    }
}

/// Compile a descriptor into its JSON Schema tree.
///
/// `description`, when present, lands as the node's `description` key. For
/// structured records without an explicit description, the record's own
/// description (if any) is used.
pub fn compile(descriptor: &TypeDescriptor, description: Option<&str>) -> Value {
    Emitter::default().emit(descriptor, description)
}

/// Compile a parameter list into the `{"type": "object", ...}` tree that
/// anchors a tool's schema. Properties appear in declaration order;
/// `required` lists exactly the fields with no default and no optionality.
pub fn compile_parameters(fields: &[FieldDescriptor]) -> Value {
    Emitter::default().emit_object(fields, None)
}

/// Project a compiled parameters tree into the given wire format.
///
/// Pure relabeling: the parameters subtree is carried unchanged. A missing
/// description is omitted, never emitted as null.
pub fn project(
    format: SchemaFormat,
    name: &str,
    description: Option<&str>,
    parameters: Value,
) -> Value {
    match format {
        SchemaFormat::Base | SchemaFormat::Gorilla => {
            let mut function = Map::new();
            function.insert("name".to_string(), Value::String(name.to_string()));
            if format == SchemaFormat::Gorilla {
                function.insert("api_call".to_string(), Value::String(name.to_string()));
            }
            if let Some(desc) = description {
                function.insert("description".to_string(), Value::String(desc.to_string()));
            }
            function.insert("parameters".to_string(), parameters);

            let mut envelope = Map::new();
            envelope.insert("type".to_string(), Value::String("function".to_string()));
            envelope.insert("function".to_string(), Value::Object(function));
            Value::Object(envelope)
        }
        SchemaFormat::Claude => {
            let mut block = Map::new();
            block.insert("name".to_string(), Value::String(name.to_string()));
            if let Some(desc) = description {
                block.insert("description".to_string(), Value::String(desc.to_string()));
            }
            block.insert("input_schema".to_string(), parameters);
            Value::Object(block)
        }
    }
}

/// Emission state: the structured records on the current path, so cyclic
/// descriptor graphs still produce finite trees.
#[derive(Default)]
struct Emitter {
    path: Vec<usize>,
}

impl Emitter {
    fn emit(&mut self, descriptor: &TypeDescriptor, description: Option<&str>) -> Value {
        match descriptor {
            TypeDescriptor::Primitive(kind) => {
                let mut node = Map::new();
                node.insert(
                    "type".to_string(),
                    Value::String(kind.json_type().to_string()),
                );
                attach_description(&mut node, description);
                Value::Object(node)
            }
            // Optionality never changes the value schema, only `required`.
            TypeDescriptor::Optional(inner) => self.emit(inner, description),
            TypeDescriptor::Collection {
                element, unique, ..
            } => {
                let items = self.emit(element, None);
                let mut node = Map::new();
                node.insert("type".to_string(), Value::String("array".to_string()));
                attach_description(&mut node, description);
                node.insert("items".to_string(), items);
                if *unique {
                    node.insert("uniqueItems".to_string(), Value::Bool(true));
                }
                Value::Object(node)
            }
            TypeDescriptor::Enumeration(members) | TypeDescriptor::LiteralSet(members) => {
                // Non-empty and homogeneous, enforced at resolution.
                let kind = members[0].kind();
                let mut node = Map::new();
                node.insert(
                    "type".to_string(),
                    Value::String(kind.json_type().to_string()),
                );
                attach_description(&mut node, description);
                node.insert(
                    "enum".to_string(),
                    Value::Array(members.iter().map(|m| m.to_value()).collect()),
                );
                Value::Object(node)
            }
            TypeDescriptor::Structured(st) => {
                let key = Arc::as_ptr(st) as usize;
                if self.path.contains(&key) {
                    // Back-reference into a record already being emitted:
                    // terminate with a closed object node.
                    let mut node = Map::new();
                    node.insert("type".to_string(), Value::String("object".to_string()));
                    attach_description(&mut node, description.or(st.description()));
                    return Value::Object(node);
                }
                self.path.push(key);
                let node = self.emit_object(st.fields(), description.or(st.description()));
                self.path.pop();
                node
            }
        }
    }

    fn emit_object(&mut self, fields: &[FieldDescriptor], description: Option<&str>) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in fields {
            let child = self.emit(&field.ty, field.description.as_deref());
            properties.insert(field.name.clone(), child);
            if field.required {
                required.push(Value::String(field.name.clone()));
            }
        }

        let mut node = Map::new();
        node.insert("type".to_string(), Value::String("object".to_string()));
        attach_description(&mut node, description);
        node.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            node.insert("required".to_string(), Value::Array(required));
        }
        Value::Object(node)
    }
}

fn attach_description(node: &mut Map<String, Value>, description: Option<&str>) {
    if let Some(desc) = description {
        node.insert("description".to_string(), Value::String(desc.to_string()));
    }
}
