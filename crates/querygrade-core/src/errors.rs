use std::time::Duration;

/// Stable machine-readable codes attached to every surfaced failure.
pub mod codes {
    pub const E_VALIDATION: &str = "E_VALIDATION";
    pub const E_NOT_FOUND: &str = "E_NOT_FOUND";
    pub const E_EXECUTION: &str = "E_EXECUTION";
    pub const E_POOL_EXHAUSTED: &str = "E_POOL_EXHAUSTED";
    pub const E_REFERENCE_FAILED: &str = "E_REFERENCE_FAILED";
    pub const E_INTERNAL: &str = "E_INTERNAL";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(pub String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "config error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Why the sanitizer refused a piece of SQL text.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("query is empty")]
    Empty,
    #[error("Only SELECT queries are allowed")]
    NotSelect,
    #[error("query contains blocked token `{token}`")]
    BlockedKeyword { token: String },
}

/// Failure of a single bounded execution against the datastore.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Diagnostic reported by the datastore, passed through verbatim.
    #[error("{message}")]
    Execution { message: String },
    #[error("no database connection available after {waited:?}")]
    PoolExhausted { waited: Duration },
    #[error("internal executor failure: {0}")]
    Internal(String),
}

/// Everything the grading operations can surface to a caller.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GradeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Problem not found: {id}")]
    NotFound { id: String },
    #[error("{message}")]
    Execution { message: String },
    #[error("no database connection available after {waited:?}")]
    PoolExhausted { waited: Duration },
    /// The stored reference solution of an exercise could not be run.
    #[error("reference solution for `{exercise_id}` failed: {message}")]
    ReferenceFailed { exercise_id: String, message: String },
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<QueryError> for GradeError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::Execution { message } => GradeError::Execution { message },
            QueryError::PoolExhausted { waited } => GradeError::PoolExhausted { waited },
            QueryError::Internal(msg) => GradeError::Internal(msg),
        }
    }
}

impl GradeError {
    pub fn not_found(id: &str) -> Self {
        GradeError::NotFound { id: id.to_string() }
    }

    pub fn code(&self) -> &'static str {
        match self {
            GradeError::Validation(_) => codes::E_VALIDATION,
            GradeError::NotFound { .. } => codes::E_NOT_FOUND,
            GradeError::Execution { .. } => codes::E_EXECUTION,
            GradeError::PoolExhausted { .. } => codes::E_POOL_EXHAUSTED,
            GradeError::ReferenceFailed { .. } => codes::E_REFERENCE_FAILED,
            GradeError::Internal(_) => codes::E_INTERNAL,
        }
    }

    /// Caused by what the learner sent rather than by service state.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            GradeError::Validation(_) | GradeError::NotFound { .. } | GradeError::Execution { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_errors_map_one_to_one() {
        let e: GradeError = QueryError::Execution {
            message: "no such column: foo".into(),
        }
        .into();
        assert_eq!(e.code(), codes::E_EXECUTION);
        assert_eq!(e.to_string(), "no such column: foo");

        let e: GradeError = QueryError::PoolExhausted {
            waited: Duration::from_millis(5),
        }
        .into();
        assert_eq!(e.code(), codes::E_POOL_EXHAUSTED);
        assert!(!e.is_client_error());
    }

    #[test]
    fn validation_is_client_error() {
        let e: GradeError = ValidationError::NotSelect.into();
        assert!(e.is_client_error());
        assert_eq!(e.to_string(), "Only SELECT queries are allowed");
    }
}
