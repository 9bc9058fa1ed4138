pub mod grader;

pub use grader::{CatalogReport, GradeSettings, Grader, Health, ReferenceCheck};
