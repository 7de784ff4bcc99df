//! Define a weather tool, print its schemas, and dispatch a model-style
//! textual call against it.
//!
//! Run with: cargo run --example weather_tool

use serde_json::json;
use toolspec::{tool, FieldDecl, SchemaFormat, ToolRegistry, TypeExpr};

#[tokio::main]
async fn main() -> toolspec::Result<()> {
    let mut registry = ToolRegistry::new();
    registry.register(
        tool("get_weather", "Get the current weather for a location")
            .param_with(
                FieldDecl::new("location", TypeExpr::string())
                    .describe("City name, e.g. 'Paris'"),
            )
            .param_with(
                FieldDecl::new("unit", TypeExpr::literal(["celsius", "fahrenheit"]))
                    .with_default(json!("celsius")),
            )
            .default_param("days", TypeExpr::integer(), json!(1))
            .build(|args| async move {
                // A real handler would call a weather API here.
                Ok(json!({
                    "location": args["location"],
                    "unit": args.get("unit").cloned().unwrap_or(json!("celsius")),
                    "days": args.get("days").cloned().unwrap_or(json!(1)),
                    "forecast": "sunny",
                    "temperature": 21,
                }))
            })?,
    )?;

    for format in SchemaFormat::ALL {
        println!("--- {format} ---");
        println!("{}", registry.compile_all_json(format)?);
    }

    let result = registry
        .invoke_from_text(r#"get_weather(location="Paris", days=3)"#)
        .await?;
    println!("--- result ---");
    println!("{}", serde_json::to_string_pretty(&result)?);

    // A bad call fails with a precise error instead of reaching the handler.
    let err = registry
        .invoke_from_text(r#"get_weather(location="Paris", unit="kelvin")"#)
        .await
        .unwrap_err();
    println!("--- rejected ---");
    println!("{err}");

    Ok(())
}
