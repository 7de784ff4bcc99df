//! End-to-end tests: define tools, derive schemas, dispatch calls.

use serde_json::json;
use toolspec::{
    record_tool, tool, Error, FieldDecl, ModelShape, SchemaFormat, ToolRegistry, TypeExpr,
};

fn weather_tool() -> toolspec::Tool {
    tool("get_weather", "Get the current weather for a location")
        .param_with(
            FieldDecl::new("location", TypeExpr::string()).describe("City name or coordinates"),
        )
        .param_with(
            FieldDecl::new("unit", TypeExpr::literal(["celsius", "fahrenheit"]))
                .with_default(json!("celsius")),
        )
        .default_param("days", TypeExpr::integer(), json!(1))
        .build(|args| async move {
            Ok(json!({
                "location": args["location"],
                "unit": args.get("unit").cloned().unwrap_or(json!("celsius")),
                "forecast": "sunny",
            }))
        })
        .expect("weather tool definition is valid")
}

#[tokio::test]
async fn test_full_pipeline_text_call() {
    let mut registry = ToolRegistry::new();
    registry.register(weather_tool()).unwrap();

    let result = registry
        .invoke_from_text(r#"get_weather(location="Paris", days=3)"#)
        .await
        .unwrap();
    assert_eq!(result["location"], "Paris");
    assert_eq!(result["unit"], "celsius");
}

#[tokio::test]
async fn test_full_pipeline_metadata_call() {
    let mut registry = ToolRegistry::new();
    registry.register(weather_tool()).unwrap();

    let result = registry
        .invoke_from_metadata(
            "get_weather",
            json!({"location": "Tokyo", "unit": "fahrenheit"}),
        )
        .await
        .unwrap();
    assert_eq!(result["location"], "Tokyo");
    assert_eq!(result["unit"], "fahrenheit");
}

#[tokio::test]
async fn test_record_tool_through_the_registry() {
    let task = ModelShape::with_description("Task", "A unit of work");
    task.define([
        FieldDecl::new("title", TypeExpr::string()),
        FieldDecl::new("priority", TypeExpr::integer()).with_default(json!(2)),
        FieldDecl::new("tags", TypeExpr::optional(TypeExpr::set_of(TypeExpr::string()))),
    ]);

    let mut registry = ToolRegistry::new();
    registry.register(record_tool(task).unwrap()).unwrap();

    let built = registry
        .invoke_from_text(r#"Task(title="write docs", tags=["docs", "urgent"])"#)
        .await
        .unwrap();
    assert_eq!(
        built,
        json!({"title": "write docs", "priority": 2, "tags": ["docs", "urgent"]})
    );
}

#[tokio::test]
async fn test_validation_failures_never_reach_the_handler() {
    let mut registry = ToolRegistry::new();
    registry.register(
        tool("strict", "panics if reached with bad args")
            .param("n", TypeExpr::integer())
            .build(|args| async move {
                assert!(args["n"].is_i64());
                Ok(args)
            })
            .unwrap(),
    )
    .unwrap();

    let err = registry.invoke_from_text(r#"strict("5")"#).await.unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }));
}

#[test]
fn test_merge_then_compile_keeps_both_tool_sets() {
    let mut weather = ToolRegistry::new();
    weather.register(weather_tool()).unwrap();

    let mut math = ToolRegistry::new();
    math.register(
        tool("add", "Add two numbers")
            .param("a", TypeExpr::number())
            .param("b", TypeExpr::number())
            .build(|args| async move { Ok(args) })
            .unwrap(),
    )
    .unwrap();

    let merged = weather.merge(&math).unwrap();
    let schemas = merged.compile_all(SchemaFormat::Base);
    assert_eq!(schemas.len(), 2);
    assert_eq!(schemas[0]["function"]["name"], "get_weather");
    assert_eq!(schemas[1]["function"]["name"], "add");
}

#[test]
fn test_persist_matches_compile_all_json() {
    let mut registry = ToolRegistry::new();
    registry.register(weather_tool()).unwrap();

    let dir = std::env::temp_dir().join("toolspec_integration_persist");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("tools.json");
    registry.persist(SchemaFormat::Claude, &path).unwrap();

    let on_disk = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        on_disk,
        registry.compile_all_json(SchemaFormat::Claude).unwrap()
    );
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_definition_time_failure_for_recursive_records() {
    let node = ModelShape::new("Node");
    node.define([FieldDecl::new("child", TypeExpr::record(node.clone()))]);

    let result = tool("bad", "recursive parameter")
        .param("node", TypeExpr::record(node))
        .build(|args| async move { Ok(args) });
    assert!(matches!(result, Err(Error::RecursiveType { .. })));
}
