use querygrade_core::errors::GradeError;
use querygrade_core::Grader;
use serde_json::Value;

use crate::config::ServerConfig;

pub struct ToolContext {
    pub grader: Grader,
    pub cfg: ServerConfig,
}

#[derive(Debug, serde::Serialize)]
pub struct ToolError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ToolError {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Maps a grading failure 1:1 onto its code. Unknown ids carry the
    /// closest known id when there is one.
    pub fn from_grade(ctx: &ToolContext, e: &GradeError) -> Self {
        let err = Self::new(e.code(), &e.to_string());
        match e {
            GradeError::NotFound { id } => match ctx.grader.catalog().closest_id(id) {
                Some(close) => err.with_details(serde_json::json!({ "didYouMean": close })),
                None => err,
            },
            GradeError::ReferenceFailed { exercise_id, .. } => {
                err.with_details(serde_json::json!({ "exerciseId": exercise_id }))
            }
            _ => err,
        }
    }

    pub fn result(self) -> anyhow::Result<Value> {
        Ok(serde_json::json!({ "error": self }))
    }
}

pub mod catalog;
pub mod health;
pub mod query;

pub(crate) fn str_arg<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    args.get(key).and_then(Value::as_str).ok_or_else(|| {
        ToolError::new(
            "E_INVALID_ARGS",
            &format!("Missing '{}' argument", key),
        )
    })
}

fn problem_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": { "problemId": { "type": "string" } },
        "required": ["problemId"]
    })
}

pub fn list_tools(row_cap: usize) -> Vec<Value> {
    vec![
        serde_json::json!({
            "name": "run_query",
            "description": format!(
                "Run a read-only SELECT against the dataset. At most {row_cap} rows are returned."
            ),
            "inputSchema": {
                "type": "object",
                "properties": { "sql": { "type": "string" } },
                "required": ["sql"]
            }
        }),
        serde_json::json!({
            "name": "grade_submission",
            "description": "Grade a SELECT against an exercise's reference solution.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "problemId": { "type": "string" },
                    "sql": { "type": "string" }
                },
                "required": ["problemId", "sql"]
            }
        }),
        serde_json::json!({
            "name": "exercise_hints",
            "description": "SQL constructs used by an exercise's reference solution.",
            "inputSchema": problem_schema()
        }),
        serde_json::json!({
            "name": "list_exercises",
            "description": "All exercises in catalog order, without solutions.",
            "inputSchema": { "type": "object", "properties": {} }
        }),
        serde_json::json!({
            "name": "get_exercise",
            "description": "One exercise, without its solution.",
            "inputSchema": problem_schema()
        }),
        serde_json::json!({
            "name": "next_exercise",
            "description": "Id of the exercise following the given one, or null after the last.",
            "inputSchema": problem_schema()
        }),
        serde_json::json!({
            "name": "exercise_solution",
            "description": "Reveal an exercise's reference solution.",
            "inputSchema": problem_schema()
        }),
        serde_json::json!({
            "name": "health",
            "description": "Service status, catalog size and connection pool usage.",
            "inputSchema": { "type": "object", "properties": {} }
        }),
    ]
}

pub async fn handle_call(ctx: &ToolContext, name: &str, args: &Value) -> anyhow::Result<Value> {
    match name {
        "run_query" => query::run_query(ctx, args).await,
        "grade_submission" => query::grade_submission(ctx, args).await,
        "exercise_hints" => catalog::exercise_hints(ctx, args),
        "list_exercises" => catalog::list_exercises(ctx),
        "get_exercise" => catalog::get_exercise(ctx, args),
        "next_exercise" => catalog::next_exercise(ctx, args),
        "exercise_solution" => catalog::exercise_solution(ctx, args),
        "health" => health::health(ctx),
        _ => Err(anyhow::anyhow!("Unknown tool: {}", name)),
    }
}
