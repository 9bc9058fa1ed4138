pub mod catalog;
pub mod config;
pub mod engine;
pub mod equivalence;
pub mod errors;
pub mod hints;
pub mod limit;
pub mod model;
pub mod redaction;
pub mod sanitize;
pub mod storage;

pub use catalog::Catalog;
pub use engine::Grader;
pub use errors::{ConfigError, GradeError};
