//! Call decoding and invocation behavior, including the error taxonomy as
//! observed from the outside.

use serde_json::json;
use toolspec::{block_on, parse_call, tool, Error, ToolRegistry, TypeExpr};

fn foo_tool() -> toolspec::Tool {
    tool("foo", "A three-parameter tool")
        .param("count", TypeExpr::integer())
        .param("label", TypeExpr::string())
        .default_param("key", TypeExpr::boolean(), json!(false))
        .build(|args| async move { Ok(args) })
        .unwrap()
}

#[tokio::test]
async fn test_mixed_positional_and_keyword_invocation() {
    let result = foo_tool()
        .invoke_text(r#"foo(1, "a", key=true)"#)
        .await
        .unwrap();
    assert_eq!(result, json!({"count": 1, "label": "a", "key": true}));
}

#[tokio::test]
async fn test_defaults_fill_unsupplied_parameters() {
    let result = foo_tool().invoke_text(r#"foo(1, "a")"#).await.unwrap();
    assert_eq!(result["key"], json!(false));
}

#[tokio::test]
async fn test_handler_error_passes_through_dispatch() {
    let mut registry = ToolRegistry::new();
    registry.register(
        tool("flaky", "always fails")
            .build(|_| async move { Err(Error::tool("upstream timeout")) })
            .unwrap(),
    )
    .unwrap();

    let err = registry.invoke_from_text("flaky()").await.unwrap_err();
    assert!(matches!(err, Error::Tool(msg) if msg == "upstream timeout"));
}

#[tokio::test]
async fn test_unknown_tool_name() {
    let registry = ToolRegistry::new();
    let err = registry.invoke_from_text("nope(1)").await.unwrap_err();
    assert!(matches!(err, Error::UnknownTool(name) if name == "nope"));
}

#[test]
fn test_parse_errors_carry_byte_offsets() {
    let input = "foo(1, oops)";
    match parse_call(input).unwrap_err() {
        Error::Syntax { offset, .. } => {
            assert_eq!(&input[offset..offset + 4], "oops");
        }
        other => panic!("expected syntax error, got {other}"),
    }
}

#[test]
fn test_mixed_argument_order_is_a_distinct_error() {
    match parse_call("foo(key=true, 1)").unwrap_err() {
        Error::MixedArgumentOrder { offset } => {
            assert_eq!(offset, "foo(key=true, ".len());
        }
        other => panic!("expected mixed argument order, got {other}"),
    }
}

#[tokio::test]
async fn test_metadata_args_as_raw_json_text() {
    let mut registry = ToolRegistry::new();
    registry.register(foo_tool()).unwrap();

    let result = registry
        .invoke_from_metadata("foo", json!(r#"{"count": 2, "label": "b"}"#))
        .await
        .unwrap();
    assert_eq!(result, json!({"count": 2, "label": "b", "key": false}));
}

#[tokio::test]
async fn test_metadata_args_must_be_an_object() {
    let mut registry = ToolRegistry::new();
    registry.register(foo_tool()).unwrap();

    let err = registry
        .invoke_from_metadata("foo", json!([1, 2]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }));
}

#[test]
fn test_block_on_drives_an_invocation_synchronously() {
    let t = foo_tool();
    let result = block_on(t.invoke_text(r#"foo(3, "sync")"#)).unwrap();
    assert_eq!(result["count"], json!(3));
}

#[tokio::test]
async fn test_unicode_arguments_survive_the_round_trip() {
    let result = foo_tool()
        .invoke_text(r#"foo(1, "héllo wörld ✓")"#)
        .await
        .unwrap();
    assert_eq!(result["label"], "héllo wörld ✓");
}
