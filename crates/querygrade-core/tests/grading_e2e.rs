use querygrade_core::catalog::Catalog;
use querygrade_core::engine::{GradeSettings, Grader};
use querygrade_core::errors::{GradeError, ValidationError};
use querygrade_core::model::Value;
use querygrade_core::storage::{ConnectionPool, PoolSettings, SqliteExecutor};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

const CATALOG: &str = r#"
version: 1
exercises:
  - id: movies-1999
    title: Movies of 1999
    description: List the titles that started in 1999.
    difficulty: easy
    tables: [basics]
    solutionSql: select tconst from basics where startyear = 1999
  - id: broken
    title: Broken reference
    description: The reference points at a table that does not exist.
    difficulty: hard
    solutionSql: select tconst from missing_table
"#;

fn seed(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("imdb.sqlite");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE basics(tconst TEXT PRIMARY KEY, primarytitle TEXT, startyear INTEGER);",
    )
    .unwrap();
    for i in 0..15 {
        conn.execute(
            "INSERT INTO basics VALUES (?1, ?2, 1999)",
            (format!("tt{:07}", 100 + i), format!("Film {i}")),
        )
        .unwrap();
    }
    conn.execute(
        "INSERT INTO basics VALUES ('tt0999999', 'Later', 2004)",
        [],
    )
    .unwrap();
    path
}

fn grader(dir: &Path) -> Grader {
    let pool = ConnectionPool::open(&seed(dir), PoolSettings::default()).unwrap();
    let catalog = Arc::new(Catalog::from_str(CATALOG).unwrap());
    let executor = Arc::new(SqliteExecutor::new(pool.clone()));
    Grader::new(catalog, executor, GradeSettings::default()).with_pool(pool)
}

#[tokio::test]
async fn reordered_and_respaced_submission_is_correct() {
    let dir = tempdir().unwrap();
    let g = grader(dir.path());

    let v = g
        .grade_submission(
            "movies-1999",
            "select tconst from basics where startyear=1999 order by tconst",
        )
        .await
        .unwrap();

    assert!(v.correct);
    assert_eq!(v.expected_count, 10);
    assert_eq!(v.actual_count, v.expected_count);
    assert_eq!(v.sample_expected.len(), 5);
    assert_eq!(v.sample_actual.len(), 5);
    assert_eq!(
        v.sample_actual[0].get("tconst"),
        Some(&Value::from("0000100"))
    );
    assert_eq!(g.health().pool.unwrap().in_use, 0);
}

#[tokio::test]
async fn wrong_rows_are_incorrect() {
    let dir = tempdir().unwrap();
    let g = grader(dir.path());
    let v = g
        .grade_submission("movies-1999", "select tconst from basics where startyear = 2004")
        .await
        .unwrap();
    assert!(!v.correct);
    assert_eq!(v.actual_count, 1);
}

#[tokio::test]
async fn rows_beyond_the_cap_are_invisible_to_grading() {
    let dir = tempdir().unwrap();
    let g = grader(dir.path());
    // the extra 2004 title sits past row 10 of both sides
    let v = g
        .grade_submission("movies-1999", "select tconst from basics")
        .await
        .unwrap();
    assert!(v.correct);
    assert_eq!(v.expected_count, 10);
    assert_eq!(v.actual_count, 10);
}

#[tokio::test]
async fn inner_order_by_decides_which_rows_are_compared() {
    let dir = tempdir().unwrap();
    let g = grader(dir.path());
    let v = g
        .grade_submission(
            "movies-1999",
            "select tconst from basics where startyear = 1999 order by tconst desc",
        )
        .await
        .unwrap();
    assert!(!v.correct);
    assert_eq!(v.expected_count, 10);
    assert_eq!(v.actual_count, 10);
}

#[tokio::test]
async fn inner_limit_cannot_exceed_the_cap() {
    let dir = tempdir().unwrap();
    let g = grader(dir.path());
    let rows = g
        .run_query("select * from basics limit 1000000")
        .await
        .unwrap();
    assert_eq!(rows.len(), 10);
    assert_eq!(
        rows[0].columns().collect::<Vec<_>>(),
        vec!["tconst", "primarytitle", "startyear"]
    );
}

#[tokio::test]
async fn redaction_only_touches_identifier_columns() {
    let dir = tempdir().unwrap();
    let g = grader(dir.path());
    let rows = g
        .run_query("select tconst, tconst as copy_of_id from basics where startyear = 2004")
        .await
        .unwrap();
    assert_eq!(rows[0].get("tconst"), Some(&Value::from("0999999")));
    assert_eq!(rows[0].get("copy_of_id"), Some(&Value::from("tt0999999")));
}

#[tokio::test]
async fn failures_map_to_the_taxonomy() {
    let dir = tempdir().unwrap();
    let g = grader(dir.path());

    assert_eq!(
        g.run_query("DROP TABLE basics").await.unwrap_err(),
        GradeError::Validation(ValidationError::BlockedKeyword {
            token: "drop".into()
        })
    );

    match g.run_query("select nope from basics").await.unwrap_err() {
        GradeError::Execution { message } => assert!(message.contains("no such column: nope")),
        other => panic!("unexpected {other:?}"),
    }

    assert!(matches!(
        g.grade_submission("unknown", "select 1").await,
        Err(GradeError::NotFound { .. })
    ));

    assert!(matches!(
        g.grade_submission("broken", "select 1").await,
        Err(GradeError::ReferenceFailed { .. })
    ));
}

#[tokio::test]
async fn catalog_check_flags_the_broken_reference() {
    let dir = tempdir().unwrap();
    let g = grader(dir.path());
    let report = g.check_catalog().await;
    assert_eq!(report.total, 2);
    assert_eq!(report.passed, 1);
    let broken = report.entries.iter().find(|e| e.id == "broken").unwrap();
    assert!(broken
        .error
        .as_deref()
        .unwrap()
        .contains("no such table: missing_table"));
}
