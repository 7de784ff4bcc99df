//! The tool registry: a named collection of tools with cached schema
//! derivation and call dispatch.
//!
//! Registration order is preserved everywhere it can be observed: schema
//! listings, iteration, and merges all follow insertion order. Derived
//! schemas are cached per `(tool name, format)` behind an `RwLock`; schema
//! compilation is deterministic, so two threads racing on a cold entry may
//! both compute it and either result is correct to keep.

use crate::materialize::{materialize, Invocation};
use crate::parser::parse_call;
use crate::schema::SchemaFormat;
use crate::tool::Tool;
use crate::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Documentation a [`DescriptionProvider`] can contribute for one tool.
#[derive(Debug, Clone, Default)]
pub struct ToolDocs {
    /// Tool-level description
    pub description: Option<String>,
    /// Per-parameter descriptions as `(parameter, text)` pairs
    pub parameter_docs: Vec<(String, String)>,
}

/// Best-effort documentation source consulted at registration time.
///
/// Provided docs fill gaps only: a description already present on the tool
/// or parameter wins, and a provider that knows nothing about a tool
/// changes nothing. Missing documentation is never an error.
pub trait DescriptionProvider: Send + Sync {
    /// Documentation for the named tool, if this provider has any.
    fn describe(&self, tool: &str) -> Option<ToolDocs>;
}

/// An insertion-ordered collection of tools.
pub struct ToolRegistry {
    tools: Vec<Arc<Tool>>,
    index: HashMap<String, usize>,
    allow_override: bool,
    provider: Option<Box<dyn DescriptionProvider>>,
    cache: RwLock<HashMap<(String, SchemaFormat), Value>>,
}

impl ToolRegistry {
    /// An empty registry. Re-registering an existing name fails with
    /// [`Error::DuplicateName`](crate::Error::DuplicateName).
    pub fn new() -> Self {
        Self::with_override(false)
    }

    /// An empty registry; `allow` opts into silent replacement on
    /// re-registration (the replaced tool's cached schemas are dropped).
    pub fn with_override(allow: bool) -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
            allow_override: allow,
            provider: None,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Attach a documentation source consulted by subsequent registrations.
    pub fn set_description_provider(&mut self, provider: Box<dyn DescriptionProvider>) {
        self.provider = Some(provider);
    }

    /// Register a tool.
    pub fn register(&mut self, tool: Tool) -> Result<()> {
        let mut tool = tool;
        if let Some(docs) = self.provider.as_ref().and_then(|p| p.describe(tool.name())) {
            if tool.description().is_none() {
                if let Some(text) = docs.description {
                    tool.set_description(text);
                }
            }
            for (param, text) in docs.parameter_docs {
                tool.describe_parameter(&param, text);
            }
        }
        self.register_arc(Arc::new(tool))
    }

    /// Register an already-shared tool. The description provider is not
    /// consulted for shared tools.
    pub fn register_arc(&mut self, tool: Arc<Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if let Some(&slot) = self.index.get(&name) {
            if !self.allow_override {
                return Err(Error::DuplicateName(name));
            }
            debug!(tool = name.as_str(), "replacing registered tool");
            self.tools[slot] = tool;
            self.invalidate(&name);
            return Ok(());
        }
        debug!(tool = name.as_str(), "registering tool");
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    fn invalidate(&self, name: &str) {
        if let Ok(mut cache) = self.cache.write() {
            cache.retain(|(cached, _), _| cached != name);
        }
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<Tool>> {
        self.index.get(name).map(|&slot| self.tools[slot].clone())
    }

    /// Whether a tool with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Registered tools, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Tool>> {
        self.tools.iter()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Combine two registries into a new one, keeping left-then-right
    /// registration order. Any shared name fails the merge.
    pub fn merge(&self, other: &ToolRegistry) -> Result<ToolRegistry> {
        let mut merged = ToolRegistry::with_override(self.allow_override);
        for tool in self.iter().chain(other.iter()) {
            if merged.contains(tool.name()) {
                return Err(Error::DuplicateName(tool.name().to_string()));
            }
            merged.register_arc(tool.clone())?;
        }
        Ok(merged)
    }

    /// One schema per registered tool, in registration order, served from
    /// the `(name, format)` cache.
    pub fn compile_all(&self, format: SchemaFormat) -> Vec<Value> {
        self.tools
            .iter()
            .map(|tool| self.schema_for(tool, format))
            .collect()
    }

    fn schema_for(&self, tool: &Arc<Tool>, format: SchemaFormat) -> Value {
        let key = (tool.name().to_string(), format);
        if let Ok(cache) = self.cache.read() {
            if let Some(hit) = cache.get(&key) {
                return hit.clone();
            }
        }
        let schema = tool.schema(format);
        debug!(tool = tool.name(), format = format.as_str(), "derived schema");
        if let Ok(mut cache) = self.cache.write() {
            // A racing thread may have inserted the same value already;
            // recomputation is deterministic, so keeping either is fine.
            cache.entry(key).or_insert_with(|| schema.clone());
        }
        schema
    }

    /// All schemas as one pretty-printed JSON array.
    pub fn compile_all_json(&self, format: SchemaFormat) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.compile_all(format))?)
    }

    /// Write all schemas to `path` as pretty-printed JSON. The write is
    /// atomic: a temp file in the same directory is renamed into place, so
    /// a concurrent reader sees the old content or the new, never a torn
    /// file.
    pub fn persist(&self, format: SchemaFormat, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.compile_all_json(format)?;
        let mut tmp = path.as_os_str().to_os_string();
        tmp.push(".tmp");
        let tmp = std::path::PathBuf::from(tmp);
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Parse a textual call expression, dispatch it to the named tool, and
    /// return the tool's result.
    pub async fn invoke_from_text(&self, expr: &str) -> Result<Value> {
        let call = parse_call(expr)?;
        let tool = self
            .get(&call.name)
            .ok_or_else(|| Error::UnknownTool(call.name.clone()))?;
        let invocation = Invocation::from(call);
        let bound = materialize(&tool, &invocation)?;
        crate::invoke::invoke(&tool, bound).await
    }

    /// Dispatch structured call metadata: a tool name plus arguments as a
    /// JSON object, or as a JSON string holding one (the shape provider
    /// APIs deliver).
    pub async fn invoke_from_metadata(&self, name: &str, args: Value) -> Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| Error::UnknownTool(name.to_string()))?;
        let invocation = match args {
            Value::String(text) => Invocation::from_json_text(name, &text)?,
            other => Invocation::from_args(name, other)?,
        };
        let bound = materialize(&tool, &invocation)?;
        crate::invoke::invoke(&tool, bound).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>())
            .field("allow_override", &self.allow_override)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TypeExpr;
    use crate::tool::tool;
    use serde_json::json;

    fn adder() -> Tool {
        tool("add", "Add two integers")
            .param("a", TypeExpr::integer())
            .param("b", TypeExpr::integer())
            .build(|args| async move {
                let a = args["a"].as_i64().unwrap_or(0);
                let b = args["b"].as_i64().unwrap_or(0);
                Ok(json!(a + b))
            })
            .unwrap()
    }

    fn named(name: &str) -> Tool {
        tool(name, "a tool")
            .build(|args| async move { Ok(args) })
            .unwrap()
    }

    #[test]
    fn test_duplicate_registration_fails_by_default() {
        let mut registry = ToolRegistry::new();
        registry.register(named("t")).unwrap();
        let err = registry.register(named("t")).unwrap_err();
        assert!(matches!(err, Error::DuplicateName(name) if name == "t"));
    }

    #[test]
    fn test_override_replaces_and_invalidates_cache() {
        let mut registry = ToolRegistry::with_override(true);
        registry.register(named("t")).unwrap();
        let before = registry.compile_all(SchemaFormat::Base);
        assert!(before[0]["function"]["parameters"]["properties"]
            .as_object()
            .unwrap()
            .is_empty());

        let replacement = tool("t", "a tool")
            .param("x", TypeExpr::string())
            .build(|args| async move { Ok(args) })
            .unwrap();
        registry.register(replacement).unwrap();

        let after = registry.compile_all(SchemaFormat::Base);
        assert!(after[0]["function"]["parameters"]["properties"]
            .as_object()
            .unwrap()
            .contains_key("x"));
    }

    #[test]
    fn test_compile_all_preserves_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(named("zeta")).unwrap();
        registry.register(named("alpha")).unwrap();
        let schemas = registry.compile_all(SchemaFormat::Claude);
        assert_eq!(schemas[0]["name"], "zeta");
        assert_eq!(schemas[1]["name"], "alpha");
    }

    #[test]
    fn test_compile_all_is_stable_across_calls() {
        let mut registry = ToolRegistry::new();
        registry.register(adder()).unwrap();
        let first = registry.compile_all(SchemaFormat::Gorilla);
        let second = registry.compile_all(SchemaFormat::Gorilla);
        assert_eq!(first, second);
    }

    #[test]
    fn test_merge_disjoint_keeps_order() {
        let mut left = ToolRegistry::new();
        left.register(named("a")).unwrap();
        let mut right = ToolRegistry::new();
        right.register(named("b")).unwrap();

        let merged = left.merge(&right).unwrap();
        let names: Vec<_> = merged.iter().map(|t| t.name().to_string()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn test_merge_overlap_fails() {
        let mut left = ToolRegistry::new();
        left.register(named("same")).unwrap();
        let mut right = ToolRegistry::new();
        right.register(named("same")).unwrap();
        let err = left.merge(&right).unwrap_err();
        assert!(matches!(err, Error::DuplicateName(name) if name == "same"));
    }

    #[tokio::test]
    async fn test_invoke_from_text_dispatches() {
        let mut registry = ToolRegistry::new();
        registry.register(adder()).unwrap();
        let result = registry.invoke_from_text("add(2, b=3)").await.unwrap();
        assert_eq!(result, json!(5));
    }

    #[tokio::test]
    async fn test_invoke_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry.invoke_from_text("missing(1)").await.unwrap_err();
        assert!(matches!(err, Error::UnknownTool(name) if name == "missing"));
    }

    #[tokio::test]
    async fn test_invoke_from_metadata_accepts_object_and_text() {
        let mut registry = ToolRegistry::new();
        registry.register(adder()).unwrap();

        let from_object = registry
            .invoke_from_metadata("add", json!({"a": 1, "b": 2}))
            .await
            .unwrap();
        assert_eq!(from_object, json!(3));

        let from_text = registry
            .invoke_from_metadata("add", json!(r#"{"a": 10, "b": 20}"#))
            .await
            .unwrap();
        assert_eq!(from_text, json!(30));
    }

    struct StaticDocs;

    impl DescriptionProvider for StaticDocs {
        fn describe(&self, tool: &str) -> Option<ToolDocs> {
            (tool == "plain").then(|| ToolDocs {
                description: Some("docs from the provider".to_string()),
                parameter_docs: vec![("x".to_string(), "the x value".to_string())],
            })
        }
    }

    #[test]
    fn test_description_provider_fills_gaps_only() {
        let mut registry = ToolRegistry::new();
        registry.set_description_provider(Box::new(StaticDocs));

        let plain = tool("plain", "authored description")
            .param("x", TypeExpr::integer())
            .build(|args| async move { Ok(args) })
            .unwrap();
        registry.register(plain).unwrap();

        let schema = &registry.compile_all(SchemaFormat::Base)[0];
        // Authored description wins over the provider's.
        assert_eq!(schema["function"]["description"], "authored description");
        // The parameter had no description, so the provider's is used.
        assert_eq!(
            schema["function"]["parameters"]["properties"]["x"]["description"],
            "the x value"
        );
    }

    #[test]
    fn test_persist_round_trips() {
        let mut registry = ToolRegistry::new();
        registry.register(adder()).unwrap();

        let dir = std::env::temp_dir().join("toolspec_persist_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("schemas.json");
        registry.persist(SchemaFormat::Base, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let parsed: Value = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, json!(registry.compile_all(SchemaFormat::Base)));
        std::fs::remove_file(&path).unwrap();
    }
}
