use crate::config::ServerConfig;
use crate::tools::{self, ToolContext, ToolError};
use anyhow::Result;
use querygrade_core::Grader;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::timeout;

static RID: AtomicU64 = AtomicU64::new(1);

fn next_rid() -> String {
    let n = RID.fetch_add(1, Ordering::Relaxed);
    format!("r-{n:06}")
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: Option<Value>,
    id: Option<Value>,
}

#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
    id: Option<Value>,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

impl JsonRpcResponse {
    fn ok(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    fn error(id: Option<Value>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError { code, message }),
            id,
        }
    }

    /// MCP `CallToolResult`: the tool payload as pretty JSON text.
    fn tool_result(id: Option<Value>, payload: &Value) -> Self {
        let is_error = payload.get("error").is_some();
        let text = serde_json::to_string_pretty(payload).unwrap_or_default();
        Self::ok(
            id,
            serde_json::json!({
                "content": [{ "type": "text", "text": text }],
                "isError": is_error
            }),
        )
    }
}

pub struct Server;

impl Server {
    pub async fn run(grader: Grader, cfg: ServerConfig) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        Self::serve(grader, cfg, stdin, tokio::io::stdout()).await
    }

    /// Reads one request per line. Every `tools/call` runs on its own task;
    /// all responses go through a single writer so lines never interleave.
    /// Returns once input is exhausted and every in-flight call has answered.
    pub async fn serve<R, W>(grader: Grader, cfg: ServerConfig, reader: R, writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<JsonRpcResponse>();
        let writer_task = tokio::spawn(write_responses(rx, writer));

        let ctx = Arc::new(ToolContext {
            grader,
            cfg: cfg.clone(),
        });

        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let rid = next_rid();

            if line.len() > cfg.max_msg_bytes {
                tracing::warn!(
                    event = "limit_exceeded",
                    rid = %rid,
                    bytes_in = line.len(),
                    max = cfg.max_msg_bytes
                );
                let payload = ToolError::new(
                    "E_LIMIT_EXCEEDED",
                    &format!("message bytes={} > max={}", line.len(), cfg.max_msg_bytes),
                )
                .result()?;
                let _ = tx.send(JsonRpcResponse::tool_result(None, &payload));
                continue;
            }

            if line.trim().is_empty() {
                continue;
            }

            let req: JsonRpcRequest = match serde_json::from_str(&line) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(event = "json_parse_error", rid = %rid, error = %e);
                    continue;
                }
            };

            let JsonRpcRequest {
                method, params, id, ..
            } = req;

            let resp = match method.as_str() {
                "initialize" => JsonRpcResponse::ok(
                    id,
                    serde_json::json!({
                        "protocolVersion": "2024-11-05",
                        "capabilities": { "tools": {} },
                        "serverInfo": {
                            "name": "querygrade-server",
                            "version": env!("CARGO_PKG_VERSION")
                        }
                    }),
                ),
                "notifications/initialized" => {
                    tracing::info!(event = "initialized", rid = %rid);
                    continue;
                }
                "tools/list" => {
                    let row_cap = ctx.grader.settings().row_cap;
                    JsonRpcResponse::ok(id, serde_json::json!({ "tools": tools::list_tools(row_cap) }))
                }
                "tools/call" => match params {
                    Some(params) => {
                        let ctx = ctx.clone();
                        let tx = tx.clone();
                        tokio::spawn(async move {
                            let resp = call_tool(&ctx, &rid, id, &params).await;
                            let _ = tx.send(resp);
                        });
                        continue;
                    }
                    None => JsonRpcResponse::error(id, -32602, "Missing params".to_string()),
                },
                _ => JsonRpcResponse::error(
                    id,
                    -32601,
                    format!("Method not found: {}", method),
                ),
            };

            let _ = tx.send(resp);
        }

        drop(tx);
        writer_task.await??;
        Ok(())
    }
}

async fn write_responses<W>(mut rx: mpsc::UnboundedReceiver<JsonRpcResponse>, mut out: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(resp) = rx.recv().await {
        let mut line = serde_json::to_string(&resp)?;
        line.push('\n');
        out.write_all(line.as_bytes()).await?;
        out.flush().await?;
    }
    Ok(())
}

async fn call_tool(ctx: &ToolContext, rid: &str, id: Option<Value>, params: &Value) -> JsonRpcResponse {
    let name = params.get("name").and_then(|s| s.as_str()).unwrap_or("");
    let default_args = serde_json::json!({});
    let args = params.get("arguments").unwrap_or(&default_args);
    let start = std::time::Instant::now();

    tracing::info!(
        event = "tool_call_start",
        rid = %rid,
        rpc_id = ?id,
        tool = name,
        bytes_in = serde_json::to_vec(args).map(|b| b.len()).unwrap_or(0)
    );

    let limit = ctx.cfg.call_timeout();
    let result = match timeout(limit, tools::handle_call(ctx, name, args)).await {
        Ok(res) => res,
        Err(_) => {
            tracing::warn!(
                event = "tool_call_timeout",
                rid = %rid,
                tool = name,
                duration_ms = start.elapsed().as_millis() as u64,
                code = "E_TIMEOUT"
            );
            ToolError::new(
                "E_TIMEOUT",
                &format!("Request exceeded {}ms", ctx.cfg.call_timeout_ms),
            )
            .result()
        }
    };

    let dur = start.elapsed().as_millis() as u64;
    let payload = match result {
        Ok(val) => {
            match val.get("error") {
                Some(err) => tracing::info!(
                    event = "tool_call_done",
                    rid = %rid,
                    tool = name,
                    duration_ms = dur,
                    outcome = "app_error",
                    code = err.get("code").and_then(|v| v.as_str()).unwrap_or("")
                ),
                None => tracing::info!(
                    event = "tool_call_done",
                    rid = %rid,
                    tool = name,
                    duration_ms = dur,
                    outcome = "ok"
                ),
            }
            val
        }
        Err(e) => {
            tracing::error!(
                event = "tool_call_crash",
                rid = %rid,
                tool = name,
                duration_ms = dur,
                error = %e
            );
            serde_json::json!({
                "error": { "code": "E_INTERNAL", "message": e.to_string() }
            })
        }
    };

    JsonRpcResponse::tool_result(id, &payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use querygrade_core::catalog::Catalog;
    use querygrade_core::engine::GradeSettings;
    use querygrade_core::errors::QueryError;
    use querygrade_core::model::{Row, RowSequence, Value as Cell};
    use querygrade_core::storage::Executor;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;

    struct Echo;

    #[async_trait]
    impl Executor for Echo {
        async fn execute(&self, sql: &str, _timeout: Duration) -> Result<RowSequence, QueryError> {
            if sql.contains("sleep") {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            let row: Row = [("tconst", Cell::from("tt0133093"))].into_iter().collect();
            Ok(vec![row])
        }
    }

    fn grader(settings: GradeSettings) -> Grader {
        let catalog = Catalog::from_str(
            r#"[{"id": "p1", "title": "t", "description": "d", "difficulty": "easy",
                 "solutionSql": "select tconst from basics"}]"#,
        )
        .unwrap();
        Grader::new(Arc::new(catalog), Arc::new(Echo), settings)
    }

    async fn exchange(cfg: ServerConfig, input: &str) -> Vec<serde_json::Value> {
        exchange_with(grader(GradeSettings::default()), cfg, input).await
    }

    async fn exchange_with(g: Grader, cfg: ServerConfig, input: &str) -> Vec<serde_json::Value> {
        let (client, server_out) = tokio::io::duplex(1 << 20);
        let reader = BufReader::new(input.as_bytes());
        Server::serve(g, cfg, reader, server_out).await.unwrap();

        let mut raw = String::new();
        let mut client = client;
        client.read_to_string(&mut raw).await.unwrap();
        raw.lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    fn inner(resp: &serde_json::Value) -> serde_json::Value {
        let text = resp["result"]["content"][0]["text"].as_str().unwrap();
        serde_json::from_str(text).unwrap()
    }

    #[tokio::test]
    async fn every_call_is_answered_before_shutdown() {
        let input = [
            r#"{"jsonrpc":"2.0","method":"tools/call","id":1,"params":{"name":"grade_submission","arguments":{"problemId":"p1","sql":"select tconst from basics"}}}"#,
            r#"{"jsonrpc":"2.0","method":"tools/call","id":2,"params":{"name":"exercise_hints","arguments":{"problemId":"p11"}}}"#,
            r#"{"jsonrpc":"2.0","method":"nope","id":3}"#,
            "not json",
        ]
        .join("\n");

        let mut out = exchange(ServerConfig::default(), &input).await;
        out.sort_by_key(|r| r["id"].as_i64());
        assert_eq!(out.len(), 3);

        let verdict = inner(&out[0]);
        assert_eq!(verdict["correct"], true);
        assert_eq!(verdict["sampleActual"][0]["tconst"], "0133093");

        assert_eq!(out[1]["result"]["isError"], true);
        let err = inner(&out[1]);
        assert_eq!(err["error"]["code"], "E_NOT_FOUND");
        assert_eq!(err["error"]["details"]["didYouMean"], "p1");

        assert_eq!(out[2]["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn slow_call_hits_the_outer_bound() {
        let cfg = ServerConfig {
            call_timeout_ms: 50,
            ..ServerConfig::default()
        };
        let input = r#"{"jsonrpc":"2.0","method":"tools/call","id":7,"params":{"name":"run_query","arguments":{"sql":"select sleep"}}}"#;
        let out = exchange(cfg, input).await;
        assert_eq!(inner(&out[0])["error"]["code"], "E_TIMEOUT");
    }

    #[tokio::test]
    async fn oversized_sql_is_refused() {
        let cfg = ServerConfig {
            max_sql_bytes: 16,
            ..ServerConfig::default()
        };
        let input = r#"{"jsonrpc":"2.0","method":"tools/call","id":1,"params":{"name":"run_query","arguments":{"sql":"select tconst from basics"}}}"#;
        let out = exchange(cfg, input).await;
        assert_eq!(inner(&out[0])["error"]["code"], "E_LIMIT_EXCEEDED");
    }

    #[tokio::test]
    async fn missing_or_null_sql_is_an_empty_submission() {
        let input = [
            r#"{"jsonrpc":"2.0","method":"tools/call","id":1,"params":{"name":"run_query","arguments":{}}}"#,
            r#"{"jsonrpc":"2.0","method":"tools/call","id":2,"params":{"name":"grade_submission","arguments":{"problemId":"p1","sql":null}}}"#,
            r#"{"jsonrpc":"2.0","method":"tools/call","id":3,"params":{"name":"run_query","arguments":{"sql":42}}}"#,
        ]
        .join("\n");
        let mut out = exchange(ServerConfig::default(), &input).await;
        out.sort_by_key(|r| r["id"].as_i64());
        assert_eq!(inner(&out[0])["error"]["code"], "E_VALIDATION");
        assert_eq!(inner(&out[1])["error"]["code"], "E_VALIDATION");
        assert_eq!(inner(&out[2])["error"]["code"], "E_INVALID_ARGS");
    }

    #[tokio::test]
    async fn run_query_description_follows_the_row_cap() {
        let settings = GradeSettings {
            row_cap: 3,
            sample_size: 2,
            ..GradeSettings::default()
        };
        let input = r#"{"jsonrpc":"2.0","method":"tools/list","id":1}"#;
        let out = exchange_with(grader(settings), ServerConfig::default(), input).await;
        let tools = out[0]["result"]["tools"].as_array().unwrap();
        let run_query = tools.iter().find(|t| t["name"] == "run_query").unwrap();
        assert!(run_query["description"]
            .as_str()
            .unwrap()
            .contains("At most 3 rows are returned."));
    }
}
