use super::{str_arg, ToolContext, ToolError};
use anyhow::Result;
use serde_json::Value;

macro_rules! problem_id {
    ($args:expr) => {
        match str_arg($args, "problemId") {
            Ok(p) => p,
            Err(e) => return e.result(),
        }
    };
}

pub fn exercise_hints(ctx: &ToolContext, args: &Value) -> Result<Value> {
    let id = problem_id!(args);
    match ctx.grader.extract_hints(id) {
        Ok(verbs) => Ok(serde_json::json!({ "verbs": verbs })),
        Err(e) => ToolError::from_grade(ctx, &e).result(),
    }
}

pub fn list_exercises(ctx: &ToolContext) -> Result<Value> {
    Ok(serde_json::json!({ "exercises": ctx.grader.list_exercises() }))
}

pub fn get_exercise(ctx: &ToolContext, args: &Value) -> Result<Value> {
    let id = problem_id!(args);
    match ctx.grader.exercise(id) {
        Ok(view) => Ok(serde_json::to_value(view)?),
        Err(e) => ToolError::from_grade(ctx, &e).result(),
    }
}

pub fn next_exercise(ctx: &ToolContext, args: &Value) -> Result<Value> {
    let id = problem_id!(args);
    match ctx.grader.next_exercise(id) {
        Ok(next) => Ok(serde_json::json!({ "nextId": next })),
        Err(e) => ToolError::from_grade(ctx, &e).result(),
    }
}

pub fn exercise_solution(ctx: &ToolContext, args: &Value) -> Result<Value> {
    let id = problem_id!(args);
    match ctx.grader.solution(id) {
        Ok(sql) => Ok(serde_json::json!({ "sql": sql })),
        Err(e) => ToolError::from_grade(ctx, &e).result(),
    }
}
