//! Record-shaped tools: the tool's parameters are a record's fields, and
//! invoking the tool constructs the record. Shows a self-referencing record
//! and the three record styles.
//!
//! Run with: cargo run --example record_tools

use serde_json::json;
use toolspec::{
    record_tool, FieldDecl, FieldTupleShape, ModelShape, SchemaFormat, ToolRegistry, TypeExpr,
    TypedMapShape,
};

#[tokio::main]
async fn main() -> toolspec::Result<()> {
    // A linked node: the self-reference is legal because it sits behind an
    // Optional boundary.
    let node = ModelShape::with_description("Node", "One node of a linked list");
    node.define([
        FieldDecl::new("value", TypeExpr::integer()),
        FieldDecl::new("next", TypeExpr::optional(TypeExpr::record(node.clone()))),
    ]);

    // A plain typed mapping: absent optional fields stay absent.
    let options = TypedMapShape::new("Options");
    options.define([
        FieldDecl::new("verbose", TypeExpr::boolean()).with_default(json!(false)),
        FieldDecl::new("retries", TypeExpr::optional(TypeExpr::integer())),
    ]);

    // A field tuple: constructs an array in declaration order.
    let point = FieldTupleShape::new("Point");
    point.define([
        FieldDecl::new("x", TypeExpr::number()),
        FieldDecl::new("y", TypeExpr::number()),
    ]);

    let mut registry = ToolRegistry::new();
    registry.register(record_tool(node)?)?;
    registry.register(record_tool(options)?)?;
    registry.register(record_tool(point)?)?;

    println!("{}", registry.compile_all_json(SchemaFormat::Claude)?);

    let nested = registry
        .invoke_from_text(r#"Node(value=1, next={"value": 2})"#)
        .await?;
    println!("Node  -> {nested}");

    let opts = registry.invoke_from_text("Options(verbose=true)").await?;
    println!("Options -> {opts}");

    let pt = registry.invoke_from_text("Point(x=1.5, y=-2.0)").await?;
    println!("Point -> {pt}");

    Ok(())
}
