//! Argument materialization: raw invocation values to validated, typed
//! arguments.
//!
//! Binding walks the tool's parameters in declaration order. Each parameter
//! takes its value from the matching positional slot, then from a keyword
//! argument, then from its declared default; a required parameter with no
//! source fails with `MissingArgument`. Coercion is strict and
//! type-directed: no cross-type conversion, numeric strings stay strings
//! and are rejected where a number is expected. Nested failures carry a
//! dotted path (`profile.age`) so the offending leaf is named precisely.

use crate::descriptor::{TypeDescriptor, StructuredType};
use crate::parser::ParsedCall;
use crate::tool::Tool;
use crate::{Error, Result};
use serde_json::{Map, Value};
use tracing::debug;

/// A tool invocation before validation: the target name plus raw positional
/// and keyword values, from a parsed call expression or from structured
/// call metadata.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Invocation {
    /// Target tool name
    pub name: String,
    /// Raw positional values, in order
    pub positional: Vec<Value>,
    /// Raw keyword values
    pub keyword: Map<String, Value>,
}

impl From<ParsedCall> for Invocation {
    fn from(call: ParsedCall) -> Self {
        Self {
            name: call.name,
            positional: call.positional,
            keyword: call.keyword,
        }
    }
}

impl Invocation {
    /// Build an invocation from a JSON object of keyword arguments, the
    /// shape structured tool-call APIs deliver. Null stands for "no
    /// arguments"; anything else non-object is rejected.
    pub fn from_args(name: impl Into<String>, args: Value) -> Result<Self> {
        let keyword = match args {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(Error::type_mismatch(
                    "arguments",
                    "object",
                    value_kind(&other),
                ));
            }
        };
        Ok(Self {
            name: name.into(),
            positional: Vec::new(),
            keyword,
        })
    }

    /// Build an invocation from raw JSON text holding the argument object.
    pub fn from_json_text(name: impl Into<String>, text: &str) -> Result<Self> {
        let args: Value = serde_json::from_str(text)?;
        Self::from_args(name, args)
    }
}

/// Bind and validate an invocation's arguments against the tool's
/// parameters. Returns the materialized values keyed by parameter name, in
/// declaration order; optional parameters that were absent (or explicitly
/// null) are left out.
pub fn materialize(tool: &Tool, invocation: &Invocation) -> Result<Map<String, Value>> {
    let params = tool.parameters();
    debug!(
        tool = tool.name(),
        positional = invocation.positional.len(),
        keyword = invocation.keyword.len(),
        "materializing arguments"
    );

    if invocation.positional.len() > params.len() {
        return Err(Error::SurplusPositional {
            tool: tool.name().to_string(),
            expected: params.len(),
            received: invocation.positional.len(),
        });
    }

    let mut keyword = invocation.keyword.clone();
    let coercer = Coercer { tool: tool.name() };
    let mut out = Map::new();

    for (index, param) in params.iter().enumerate() {
        let supplied = if index < invocation.positional.len() {
            // A keyword naming an already positionally-bound parameter is
            // shadowed; the positional value wins.
            keyword.remove(&param.name);
            Some(invocation.positional[index].clone())
        } else {
            keyword.remove(&param.name)
        };

        match supplied {
            Some(value) => {
                let coerced = coercer.coerce(&param.name, &param.ty, &value)?;
                if coerced.is_null() && matches!(param.ty, TypeDescriptor::Optional(_)) {
                    continue;
                }
                out.insert(param.name.clone(), coerced);
            }
            None => {
                if let Some(default) = &param.default {
                    let coerced = coercer.coerce(&param.name, &param.ty, default)?;
                    out.insert(param.name.clone(), coerced);
                } else if matches!(param.ty, TypeDescriptor::Optional(_)) {
                    // Unset stays unset.
                } else {
                    return Err(Error::missing_argument(tool.name(), param.name.as_str()));
                }
            }
        }
    }

    if let Some((name, _)) = keyword.into_iter().next() {
        return Err(Error::unknown_argument(tool.name(), name));
    }

    Ok(out)
}

struct Coercer<'a> {
    tool: &'a str,
}

impl Coercer<'_> {
    fn coerce(&self, path: &str, ty: &TypeDescriptor, value: &Value) -> Result<Value> {
        match ty {
            TypeDescriptor::Optional(inner) => {
                if value.is_null() {
                    Ok(Value::Null)
                } else {
                    self.coerce(path, inner, value)
                }
            }
            TypeDescriptor::Primitive(kind) => {
                use crate::descriptor::ScalarKind;
                match kind {
                    ScalarKind::String => match value {
                        Value::String(_) => Ok(value.clone()),
                        other => Err(self.mismatch(path, "string", other)),
                    },
                    ScalarKind::Boolean => match value {
                        Value::Bool(_) => Ok(value.clone()),
                        other => Err(self.mismatch(path, "boolean", other)),
                    },
                    ScalarKind::Number => match value {
                        Value::Number(_) => Ok(value.clone()),
                        other => Err(self.mismatch(path, "number", other)),
                    },
                    ScalarKind::Integer => match value {
                        Value::Number(n) => {
                            if let Some(i) = n.as_i64() {
                                Ok(Value::from(i))
                            } else if let Some(u) = n.as_u64() {
                                Ok(Value::from(u))
                            // i64::MAX as f64 rounds up to 2^63, which is
                            // out of range; the upper bound must be strict.
                            } else if let Some(f) = n.as_f64().filter(|f| {
                                f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64
                            }) {
                                Ok(Value::from(f as i64))
                            } else {
                                Err(self.mismatch(path, "integer", value))
                            }
                        }
                        other => Err(self.mismatch(path, "integer", other)),
                    },
                }
            }
            TypeDescriptor::Collection {
                element, unique, ..
            } => {
                let Value::Array(items) = value else {
                    return Err(self.mismatch(path, "array", value));
                };
                let mut coerced = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    coerced.push(self.coerce(&format!("{path}[{i}]"), element, item)?);
                }
                if *unique {
                    for i in 0..coerced.len() {
                        if coerced[i + 1..].contains(&coerced[i]) {
                            return Err(Error::type_mismatch(
                                path,
                                "array with unique elements",
                                "array with duplicate elements",
                            ));
                        }
                    }
                }
                Ok(Value::Array(coerced))
            }
            TypeDescriptor::Enumeration(members) | TypeDescriptor::LiteralSet(members) => {
                // Exact, case-sensitive membership.
                for member in members {
                    if member.matches(value) {
                        return Ok(member.to_value());
                    }
                }
                Err(Error::invalid_choice(
                    path,
                    value.to_string(),
                    members.iter().map(|m| m.to_string()).collect(),
                ))
            }
            TypeDescriptor::Structured(st) => self.coerce_structured(path, st, value),
        }
    }

    fn coerce_structured(
        &self,
        path: &str,
        st: &StructuredType,
        value: &Value,
    ) -> Result<Value> {
        let Value::Object(supplied) = value else {
            return Err(self.mismatch(path, &format!("object ({})", st.name()), value));
        };

        let mut fields_out = Map::new();
        for field in st.fields() {
            let child_path = format!("{path}.{}", field.name);
            match supplied.get(&field.name) {
                Some(v) => {
                    let coerced = self.coerce(&child_path, &field.ty, v)?;
                    if coerced.is_null() && matches!(field.ty, TypeDescriptor::Optional(_)) {
                        continue;
                    }
                    fields_out.insert(field.name.clone(), coerced);
                }
                None => {
                    if let Some(default) = &field.default {
                        let coerced = self.coerce(&child_path, &field.ty, default)?;
                        fields_out.insert(field.name.clone(), coerced);
                    } else if matches!(field.ty, TypeDescriptor::Optional(_)) {
                        // Unset stays unset.
                    } else {
                        return Err(Error::missing_argument(self.tool, child_path));
                    }
                }
            }
        }
        // Keys the record does not declare are ignored.
        Ok(st.construct(fields_out))
    }

    fn mismatch(&self, path: &str, expected: &str, received: &Value) -> Error {
        Error::type_mismatch(path, expected, value_kind(received))
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) => {
            if n.is_f64() {
                "number"
            } else {
                "integer"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
