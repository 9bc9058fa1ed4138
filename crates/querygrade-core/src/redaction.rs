use crate::model::{Row, Value};
use regex::Regex;
use std::sync::LazyLock;

/// Identifier columns whose values carry the dataset's `tt` title prefix.
pub const DEFAULT_ID_COLUMNS: &[&str] = &["tconst", "parenttconst", "titleid"];

pub const DEFAULT_PREFIX: &str = "tt";

static TITLE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^tt\d").expect("static title id pattern is valid")
});

/// Hides the type prefix of native dataset identifiers before rows leave the
/// core. Presentation only: it runs on learner and reference rows alike, so
/// grading is unaffected.
#[derive(Debug, Clone)]
pub struct IdentifierRedaction {
    columns: Vec<String>,
}

impl Default for IdentifierRedaction {
    fn default() -> Self {
        Self::new(DEFAULT_ID_COLUMNS.iter().copied())
    }
}

impl IdentifierRedaction {
    pub fn new<'a>(columns: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            columns: columns.into_iter().map(str::to_lowercase).collect(),
        }
    }

    fn applies_to(&self, label: &str) -> bool {
        self.columns.iter().any(|c| c.eq_ignore_ascii_case(label))
    }

    pub fn redact_value(&self, label: &str, value: Value) -> Value {
        match value {
            Value::Text(s) if self.applies_to(label) && TITLE_ID.is_match(&s) => {
                Value::Text(s[DEFAULT_PREFIX.len()..].to_string())
            }
            other => other,
        }
    }

    pub fn redact_row(&self, row: Row) -> Row {
        row.into_iter()
            .map(|(label, value)| {
                let value = self.redact_value(&label, value);
                (label, value)
            })
            .collect()
    }

    pub fn redact_rows(&self, rows: Vec<Row>) -> Vec<Row> {
        rows.into_iter().map(|r| self.redact_row(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(label: &str, value: &str) -> Row {
        [(label, Value::from(value))].into_iter().collect()
    }

    #[test]
    fn strips_prefix_on_whitelisted_column() {
        let policy = IdentifierRedaction::default();
        let row = policy.redact_row(one("tconst", "tt0133093"));
        assert_eq!(row.get("tconst"), Some(&Value::from("0133093")));
    }

    #[test]
    fn column_match_is_case_insensitive() {
        let policy = IdentifierRedaction::default();
        let row = policy.redact_row(one("parentTconst", "tt0944947"));
        assert_eq!(row.get("parentTconst"), Some(&Value::from("0944947")));
        let row = policy.redact_row(one("TitleId", "tt0000001-x"));
        assert_eq!(row.get("TitleId"), Some(&Value::from("0000001-x")));
    }

    #[test]
    fn other_columns_pass_through() {
        let policy = IdentifierRedaction::default();
        let row = policy.redact_row(one("title", "tt0133093"));
        assert_eq!(row.get("title"), Some(&Value::from("tt0133093")));
    }

    #[test]
    fn non_matching_values_pass_through() {
        let policy = IdentifierRedaction::default();
        for v in ["nm0000206", "tt", "ttabc", "TT0133093", "0133093"] {
            let row = policy.redact_row(one("tconst", v));
            assert_eq!(row.get("tconst"), Some(&Value::from(v)), "{v}");
        }
        let row: Row = [("tconst", Value::Integer(7))].into_iter().collect();
        assert_eq!(policy.redact_row(row.clone()), row);
    }

    #[test]
    fn prefix_is_stripped_once() {
        let policy = IdentifierRedaction::default();
        let row = policy.redact_row(one("tconst", "tt1tt2"));
        assert_eq!(row.get("tconst"), Some(&Value::from("1tt2")));
    }
}
