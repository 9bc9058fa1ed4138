use super::{str_arg, ToolContext, ToolError};
use anyhow::Result;
use serde_json::Value;

fn checked_sql<'a>(ctx: &ToolContext, args: &'a Value) -> Result<&'a str, ToolError> {
    // absent or null is an empty submission, which validation refuses
    let sql = match args.get("sql") {
        None | Some(Value::Null) => "",
        Some(_) => str_arg(args, "sql")?,
    };
    if sql.len() > ctx.cfg.max_sql_bytes {
        return Err(ToolError::new(
            "E_LIMIT_EXCEEDED",
            &format!("sql bytes={} > max={}", sql.len(), ctx.cfg.max_sql_bytes),
        ));
    }
    Ok(sql)
}

pub async fn run_query(ctx: &ToolContext, args: &Value) -> Result<Value> {
    let sql = match checked_sql(ctx, args) {
        Ok(s) => s,
        Err(e) => return e.result(),
    };

    match ctx.grader.run_query(sql).await {
        Ok(rows) => Ok(serde_json::json!({ "rows": rows })),
        Err(e) => ToolError::from_grade(ctx, &e).result(),
    }
}

pub async fn grade_submission(ctx: &ToolContext, args: &Value) -> Result<Value> {
    let problem_id = match str_arg(args, "problemId") {
        Ok(p) => p,
        Err(e) => return e.result(),
    };
    let sql = match checked_sql(ctx, args) {
        Ok(s) => s,
        Err(e) => return e.result(),
    };

    match ctx.grader.grade_submission(problem_id, sql).await {
        Ok(verdict) => Ok(serde_json::to_value(verdict)?),
        Err(e) => ToolError::from_grade(ctx, &e).result(),
    }
}
