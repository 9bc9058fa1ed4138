//! Result-set comparison for grading.
//!
//! Two results are the same answer when they contain the same set of distinct
//! rows. Row order and duplicate rows do not matter; column order inside a row
//! does, because it is part of each row's canonical key.

use crate::model::{Row, Value, Verdict};
use serde::ser::{Error as _, SerializeTuple, Serializer};
use serde::Serialize;
use std::collections::BTreeSet;

/// Tagged, lossless cell encoding used only for keys. Unlike the display
/// encoding it refuses values JSON cannot carry exactly.
#[derive(Serialize)]
enum Cell<'a> {
    Null,
    Bool(bool),
    Integer(i64),
    Real(FiniteReal),
    Text(&'a str),
    Blob(String),
}

struct FiniteReal(f64);

impl Serialize for FiniteReal {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        if self.0.is_finite() {
            s.serialize_f64(self.0)
        } else {
            Err(S::Error::custom(format!("non-finite real {}", self.0)))
        }
    }
}

impl<'a> From<&'a Value> for Cell<'a> {
    fn from(v: &'a Value) -> Self {
        match v {
            Value::Null => Cell::Null,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Integer(i) => Cell::Integer(*i),
            Value::Real(f) => Cell::Real(FiniteReal(*f)),
            Value::Text(t) => Cell::Text(t),
            Value::Blob(b) => Cell::Blob(hex::encode(b)),
        }
    }
}

struct Keyed<'a>(&'a Row);

impl Serialize for Keyed<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut tup = s.serialize_tuple(self.0.len())?;
        for (label, value) in self.0.iter() {
            tup.serialize_element(&(label, Cell::from(value)))?;
        }
        tup.end()
    }
}

/// Canonical string key of one row, in the row's own column order.
pub fn row_key(row: &Row) -> serde_json::Result<String> {
    serde_json::to_string(&Keyed(row))
}

/// The equivalence set of a row sequence: distinct canonical keys.
pub fn key_set(rows: &[Row]) -> serde_json::Result<BTreeSet<String>> {
    rows.iter().map(row_key).collect()
}

/// Set equality of distinct rows. An encoding fault on either side counts as
/// "not equivalent" and never escapes as an error.
pub fn equivalent(a: &[Row], b: &[Row]) -> bool {
    match (key_set(a), key_set(b)) {
        (Ok(ka), Ok(kb)) => ka == kb,
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(event = "canonical_encoding_failed", error = %e);
            false
        }
    }
}

/// Builds the verdict for one submission. Counts are the capped sequence
/// lengths before deduplication.
pub fn judge(expected: &[Row], actual: &[Row], sample_size: usize) -> Verdict {
    Verdict {
        correct: equivalent(expected, actual),
        expected_count: expected.len(),
        actual_count: actual.len(),
        sample_expected: expected.iter().take(sample_size).cloned().collect(),
        sample_actual: actual.iter().take(sample_size).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a(v: i64) -> Row {
        [("a", Value::Integer(v))].into_iter().collect()
    }

    #[test]
    fn order_and_duplicates_are_ignored() {
        assert!(equivalent(&[a(1), a(2)], &[a(2), a(1), a(1)]));
    }

    #[test]
    fn extra_rows_make_it_wrong() {
        assert!(!equivalent(&[a(1)], &[a(1), a(2)]));
    }

    #[test]
    fn empty_results_are_equivalent() {
        assert!(equivalent(&[], &[]));
        assert!(!equivalent(&[], &[a(1)]));
    }

    #[test]
    fn null_differs_from_absent_and_from_text() {
        let with_null: Row = [("a", Value::Integer(1)), ("b", Value::Null)]
            .into_iter()
            .collect();
        let without: Row = [("a", Value::Integer(1))].into_iter().collect();
        let text_null: Row = [("a", Value::Integer(1)), ("b", Value::from("null"))]
            .into_iter()
            .collect();
        assert!(!equivalent(&[with_null.clone()], &[without]));
        assert!(!equivalent(&[with_null], &[text_null]));
    }

    #[test]
    fn labels_and_column_order_are_part_of_the_key() {
        let ab: Row = [("a", Value::Integer(1)), ("b", Value::Integer(2))]
            .into_iter()
            .collect();
        let ba: Row = [("b", Value::Integer(2)), ("a", Value::Integer(1))]
            .into_iter()
            .collect();
        let renamed: Row = [("x", Value::Integer(1)), ("b", Value::Integer(2))]
            .into_iter()
            .collect();
        assert!(!equivalent(&[ab.clone()], &[ba]));
        assert!(!equivalent(&[ab], &[renamed]));
    }

    #[test]
    fn integer_and_real_are_distinct() {
        let real: Row = [("a", Value::Real(1.0))].into_iter().collect();
        assert!(!equivalent(&[a(1)], &[real]));
    }

    #[test]
    fn blob_and_text_do_not_collide() {
        let blob: Row = [("a", Value::Blob(vec![0xab]))].into_iter().collect();
        let text: Row = [("a", Value::from("ab"))].into_iter().collect();
        assert!(!equivalent(&[blob], &[text]));
    }

    #[test]
    fn unencodable_value_degrades_to_false() {
        let inf: Row = [("a", Value::Real(f64::INFINITY))].into_iter().collect();
        assert!(row_key(&inf).is_err());
        assert!(!equivalent(&[inf.clone()], &[inf]));
    }

    #[test]
    fn verdict_reports_pre_dedup_counts_and_samples() {
        let expected: Vec<Row> = (1..=3).map(a).collect();
        let actual: Vec<Row> = [3, 2, 1, 1, 2, 3, 1].into_iter().map(a).collect();
        let v = judge(&expected, &actual, 5);
        assert!(v.correct);
        assert_eq!(v.expected_count, 3);
        assert_eq!(v.actual_count, 7);
        assert_eq!(v.sample_expected.len(), 3);
        assert_eq!(v.sample_actual.len(), 5);
        assert_eq!(v.sample_actual[0], a(3));
    }
}
