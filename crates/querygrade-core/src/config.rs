use crate::errors::ConfigError;
use crate::model::{ROW_CAP, SAMPLE_SIZE};
use crate::storage::pool::PoolSettings;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;
pub const DEFAULT_QUERY_TIMEOUT_SECONDS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub version: u32,
    /// SQLite database file holding the movie/person dataset.
    pub database: String,
    /// Exercise catalog file (YAML or JSON).
    pub catalog: String,
    #[serde(default = "default_row_cap")]
    pub row_cap: usize,
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    #[serde(default = "default_query_timeout_seconds")]
    pub query_timeout_seconds: u64,
    #[serde(default)]
    pub pool: PoolSettings,
}

fn default_row_cap() -> usize {
    ROW_CAP
}

fn default_sample_size() -> usize {
    SAMPLE_SIZE
}

fn default_query_timeout_seconds() -> u64 {
    DEFAULT_QUERY_TIMEOUT_SECONDS
}

impl ServiceConfig {
    pub fn new(database: impl Into<String>, catalog: impl Into<String>) -> Self {
        Self {
            version: SUPPORTED_CONFIG_VERSION,
            database: database.into(),
            catalog: catalog.into(),
            row_cap: ROW_CAP,
            sample_size: SAMPLE_SIZE,
            query_timeout_seconds: DEFAULT_QUERY_TIMEOUT_SECONDS,
            pool: PoolSettings::default(),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.database)
    }

    pub fn catalog_path(&self) -> PathBuf {
        PathBuf::from(&self.catalog)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_seconds)
    }

    /// Anchors relative `database` and `catalog` paths at the directory of
    /// the config file they were read from.
    pub fn anchor_paths(&mut self, config_path: &Path) {
        let dir = config_path.parent().unwrap_or(Path::new("."));
        for field in [&mut self.database, &mut self.catalog] {
            if field.trim().is_empty() || Path::new(field.as_str()).is_absolute() {
                continue;
            }
            *field = lexical_join(dir, Path::new(field.as_str()))
                .display()
                .to_string();
        }
    }

    /// Applies `QUERYGRADE_*` / `QUERY_TIMEOUT_SECONDS` overrides from the
    /// process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides_from(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("QUERYGRADE_DB") {
            self.database = v;
        }
        if let Some(v) = var("QUERYGRADE_CATALOG") {
            self.catalog = v;
        }
        if let Some(n) = var("QUERY_TIMEOUT_SECONDS").and_then(|v| v.parse().ok()) {
            self.query_timeout_seconds = n;
        }
        if let Some(n) = var("QUERYGRADE_POOL_SIZE").and_then(|v| v.parse().ok()) {
            self.pool.max_size = n;
        }
        if let Some(n) = var("QUERYGRADE_POOL_ACQUIRE_MS").and_then(|v| v.parse().ok()) {
            self.pool.acquire_timeout_ms = n;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != SUPPORTED_CONFIG_VERSION {
            return Err(ConfigError(format!(
                "unsupported config version {} (supported: {})",
                self.version, SUPPORTED_CONFIG_VERSION
            )));
        }
        if self.database.trim().is_empty() {
            return Err(ConfigError("database path is empty".into()));
        }
        if self.catalog.trim().is_empty() {
            return Err(ConfigError("catalog path is empty".into()));
        }
        if self.row_cap == 0 {
            return Err(ConfigError("row_cap must be at least 1".into()));
        }
        if self.sample_size > self.row_cap {
            return Err(ConfigError(format!(
                "sample_size {} exceeds row_cap {}",
                self.sample_size, self.row_cap
            )));
        }
        if self.query_timeout_seconds == 0 {
            return Err(ConfigError(
                "query_timeout_seconds must be at least 1".into(),
            ));
        }
        if self.pool.max_size == 0 {
            return Err(ConfigError("pool.max_size must be at least 1".into()));
        }
        if self.pool.min_idle > self.pool.max_size {
            return Err(ConfigError(format!(
                "pool.min_idle {} exceeds pool.max_size {}",
                self.pool.min_idle, self.pool.max_size
            )));
        }
        Ok(())
    }
}

/// Loads, resolves and validates a service config file.
///
/// Unknown keys are an error in `strict` mode and a warning otherwise.
/// Environment overrides are applied after path resolution, so an override
/// path is taken as given.
pub fn load_config(path: &Path, strict: bool) -> Result<ServiceConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;

    let mut ignored_keys = std::collections::BTreeSet::new();
    let deserializer = serde_yaml::Deserializer::from_str(&raw);
    let mut cfg: ServiceConfig = serde_ignored::deserialize(deserializer, |p| {
        ignored_keys.insert(p.to_string());
    })
    .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;

    if !ignored_keys.is_empty() {
        if strict {
            return Err(ConfigError(format!(
                "Unknown fields detected in strict mode: {:?} (file: {})",
                ignored_keys,
                path.display()
            )));
        }
        tracing::warn!(
            event = "config_unknown_fields",
            fields = ?ignored_keys,
            file = %path.display()
        );
    }

    cfg.anchor_paths(path);

    cfg.apply_env_overrides();
    cfg.validate()?;
    Ok(cfg)
}

/// Joins without touching the filesystem; `..` drops the previous segment.
fn lexical_join(dir: &Path, rel: &Path) -> PathBuf {
    dir.join(rel)
        .components()
        .fold(PathBuf::new(), |mut acc, c| {
            match c {
                Component::CurDir => {}
                Component::ParentDir => {
                    acc.pop();
                }
                other => acc.push(other),
            }
            acc
        })
}

pub fn write_sample_config(path: &Path) -> Result<(), ConfigError> {
    std::fs::write(
        path,
        r#"version: 1
database: imdb.sqlite
catalog: exercises.yaml
row_cap: 10
sample_size: 5
query_timeout_seconds: 10
pool:
  max_size: 10
  min_idle: 1
  acquire_timeout_ms: 10000
"#,
    )
    .map_err(|e| ConfigError(format!("failed to write sample config: {}", e)))?;
    Ok(())
}
