use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Outer bound on one tool call, above the per-statement timeout.
    pub call_timeout_ms: u64,
    pub max_msg_bytes: usize,
    pub max_sql_bytes: usize,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: 30_000,
            max_msg_bytes: 1_000_000,
            max_sql_bytes: 64_000,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = env::var("QUERYGRADE_CALL_TIMEOUT_MS") {
            if let Ok(n) = v.parse() {
                cfg.call_timeout_ms = n;
            }
        }
        if let Ok(v) = env::var("QUERYGRADE_MAX_MSG_BYTES") {
            if let Ok(n) = v.parse() {
                cfg.max_msg_bytes = n;
            }
        }
        if let Ok(v) = env::var("QUERYGRADE_MAX_SQL_BYTES") {
            if let Ok(n) = v.parse() {
                cfg.max_sql_bytes = n;
            }
        }
        if let Ok(v) = env::var("QUERYGRADE_LOG") {
            cfg.log_level = v;
        }
        cfg
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}
