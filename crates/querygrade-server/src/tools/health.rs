use super::ToolContext;
use anyhow::Result;
use serde_json::Value;

pub fn health(ctx: &ToolContext) -> Result<Value> {
    Ok(serde_json::to_value(ctx.grader.health())?)
}
