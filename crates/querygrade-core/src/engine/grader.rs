use crate::catalog::Catalog;
use crate::config::ServiceConfig;
use crate::equivalence::judge;
use crate::errors::GradeError;
use crate::hints::extract_verbs;
use crate::limit::wrap;
use crate::model::{Exercise, ExerciseView, RowSequence, Verdict, ROW_CAP, SAMPLE_SIZE};
use crate::redaction::IdentifierRedaction;
use crate::sanitize::sanitize;
use crate::storage::{ConnectionPool, Executor, PoolStatus, SqliteExecutor};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradeSettings {
    pub row_cap: usize,
    pub sample_size: usize,
    pub timeout: Duration,
}

impl Default for GradeSettings {
    fn default() -> Self {
        Self {
            row_cap: ROW_CAP,
            sample_size: SAMPLE_SIZE,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Outcome of running one stored reference solution during a catalog check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceCheck {
    pub id: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub entries: Vec<ReferenceCheck>,
}

impl CatalogReport {
    pub fn is_ok(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub exercises: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolStatus>,
}

/// Composes sanitizing, bounding, execution, redaction and comparison into
/// the learner-facing operations.
///
/// Holds no mutable state: the catalog is a shared snapshot and the executor
/// owns the only contended resource.
#[derive(Clone)]
pub struct Grader {
    catalog: Arc<Catalog>,
    executor: Arc<dyn Executor>,
    pool: Option<ConnectionPool>,
    redaction: IdentifierRedaction,
    settings: GradeSettings,
}

impl Grader {
    pub fn new(catalog: Arc<Catalog>, executor: Arc<dyn Executor>, settings: GradeSettings) -> Self {
        Self {
            catalog,
            executor,
            pool: None,
            redaction: IdentifierRedaction::default(),
            settings,
        }
    }

    /// Opens the pool and loads the catalog named by `cfg`.
    pub fn from_config(cfg: &ServiceConfig) -> anyhow::Result<Self> {
        let catalog = Catalog::load(&cfg.catalog_path())?;
        let pool = ConnectionPool::open(&cfg.database_path(), cfg.pool)?;
        let settings = GradeSettings {
            row_cap: cfg.row_cap,
            sample_size: cfg.sample_size,
            timeout: cfg.query_timeout(),
        };
        let executor = Arc::new(SqliteExecutor::new(pool.clone()));
        Ok(Self::new(Arc::new(catalog), executor, settings).with_pool(pool))
    }

    /// Attaches a pool for status reporting in [`Grader::health`].
    pub fn with_pool(mut self, pool: ConnectionPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn with_redaction(mut self, redaction: IdentifierRedaction) -> Self {
        self.redaction = redaction;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn settings(&self) -> GradeSettings {
        self.settings
    }

    async fn pipeline(&self, sql: &str) -> Result<RowSequence, GradeError> {
        let clean = sanitize(sql)?;
        let bounded = wrap(clean, self.settings.row_cap);
        tracing::debug!(event = "query_bounded", sql = %bounded);
        let rows = self.executor.execute(&bounded, self.settings.timeout).await?;
        Ok(self.redaction.redact_rows(rows))
    }

    pub async fn run_query(&self, sql: &str) -> Result<RowSequence, GradeError> {
        let started = Instant::now();
        let res = self.pipeline(sql).await;
        match &res {
            Ok(rows) => tracing::debug!(
                event = "query_ok",
                rows = rows.len(),
                duration_ms = started.elapsed().as_millis() as u64
            ),
            Err(e) => tracing::warn!(event = "query_rejected", code = e.code(), error = %e),
        }
        res
    }

    /// Grades `sql` against the reference solution of `problem_id`.
    ///
    /// The id is resolved before anything runs. A submission that cannot run
    /// is an error, not an incorrect verdict; a reference solution that
    /// cannot run is reported as [`GradeError::ReferenceFailed`].
    pub async fn grade_submission(&self, problem_id: &str, sql: &str) -> Result<Verdict, GradeError> {
        let exercise = self.lookup(problem_id)?;

        let actual = self.pipeline(sql).await.inspect_err(|e| {
            tracing::warn!(
                event = "submission_failed",
                problem_id,
                code = e.code(),
                error = %e
            );
        })?;

        let expected = self
            .pipeline(&exercise.solution_sql)
            .await
            .map_err(|e| self.reference_failed(&exercise.id, e))?;

        let verdict = judge(&expected, &actual, self.settings.sample_size);
        tracing::info!(
            event = "graded",
            problem_id,
            correct = verdict.correct,
            expected_count = verdict.expected_count,
            actual_count = verdict.actual_count
        );
        Ok(verdict)
    }

    pub fn extract_hints(&self, exercise_id: &str) -> Result<Vec<&'static str>, GradeError> {
        let exercise = self.lookup(exercise_id)?;
        Ok(extract_verbs(&exercise.solution_sql))
    }

    pub fn next_exercise(&self, id: &str) -> Result<Option<String>, GradeError> {
        self.lookup(id)?;
        Ok(self.catalog.next_id(id).map(str::to_string))
    }

    pub fn list_exercises(&self) -> Vec<ExerciseView> {
        self.catalog.list().iter().map(ExerciseView::from).collect()
    }

    pub fn exercise(&self, id: &str) -> Result<ExerciseView, GradeError> {
        self.lookup(id).map(ExerciseView::from)
    }

    pub fn solution(&self, id: &str) -> Result<String, GradeError> {
        self.lookup(id).map(|e| e.solution_sql.clone())
    }

    /// Runs every stored reference solution through the full pipeline.
    pub async fn check_catalog(&self) -> CatalogReport {
        let mut entries = Vec::with_capacity(self.catalog.len());
        for ex in self.catalog.list() {
            let started = Instant::now();
            let res = self.pipeline(&ex.solution_sql).await;
            let duration_ms = started.elapsed().as_millis() as u64;
            entries.push(match res {
                Ok(rows) => ReferenceCheck {
                    id: ex.id.clone(),
                    ok: true,
                    rows: Some(rows.len()),
                    error: None,
                    duration_ms,
                },
                Err(e) => {
                    self.log_reference_failure(&ex.id, &e);
                    ReferenceCheck {
                        id: ex.id.clone(),
                        ok: false,
                        rows: None,
                        error: Some(e.to_string()),
                        duration_ms,
                    }
                }
            });
        }
        let passed = entries.iter().filter(|e| e.ok).count();
        CatalogReport {
            total: entries.len(),
            passed,
            failed: entries.len() - passed,
            entries,
        }
    }

    pub fn health(&self) -> Health {
        let pool = self.pool.as_ref().map(ConnectionPool::status);
        let saturated = pool.is_some_and(|p| p.in_use >= p.max_size);
        Health {
            status: if saturated { "saturated" } else { "ok" },
            exercises: self.catalog.len(),
            pool,
        }
    }

    fn lookup(&self, id: &str) -> Result<&Exercise, GradeError> {
        self.catalog.get(id).ok_or_else(|| GradeError::not_found(id))
    }

    fn reference_failed(&self, exercise_id: &str, e: GradeError) -> GradeError {
        // capacity problems are not the reference solution's fault
        if let GradeError::PoolExhausted { .. } = e {
            return e;
        }
        self.log_reference_failure(exercise_id, &e);
        GradeError::ReferenceFailed {
            exercise_id: exercise_id.to_string(),
            message: e.to_string(),
        }
    }

    fn log_reference_failure(&self, exercise_id: &str, e: &GradeError) {
        tracing::error!(
            event = "reference_failed",
            exercise_id,
            code = e.code(),
            error = %e
        );
    }
}
