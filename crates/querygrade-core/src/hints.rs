//! Construct hints derived from a reference solution.
//!
//! A plain lexical scan of the lower-cased text. String literals and comments
//! are not understood, so a literal containing " join " yields a JOIN hint.
//! Hints are shown to learners only and never feed into grading.

use regex::Regex;
use std::sync::LazyLock;

enum Probe {
    Contains(&'static str),
    Pattern(&'static LazyLock<Regex>),
}

static SUBQUERY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\s*select\s").expect("static subquery pattern is valid")
});

/// Probe table, in reporting order.
static PROBES: &[(Probe, &str)] = &[
    (Probe::Contains("select"), "SELECT"),
    (Probe::Contains("distinct"), "DISTINCT"),
    (Probe::Contains(" from "), "FROM"),
    (Probe::Contains(" join "), "JOIN"),
    (Probe::Contains(" where "), "WHERE"),
    (Probe::Contains(" group by "), "GROUP BY"),
    (Probe::Contains(" having "), "HAVING"),
    (Probe::Contains(" order by "), "ORDER BY"),
    (Probe::Contains(" limit "), "LIMIT"),
    (Probe::Contains("count("), "COUNT"),
    (Probe::Contains("sum("), "SUM"),
    (Probe::Contains("avg("), "AVG"),
    (Probe::Contains("min("), "MIN"),
    (Probe::Contains("max("), "MAX"),
    (Probe::Pattern(&SUBQUERY), "SUBQUERY"),
    (Probe::Contains(" over ("), "WINDOW"),
];

impl Probe {
    fn hit(&self, lowered: &str) -> bool {
        match self {
            Probe::Contains(needle) => lowered.contains(needle),
            Probe::Pattern(re) => re.is_match(lowered),
        }
    }
}

/// Construct names used by `sql`, deduplicated, in table order.
pub fn extract_verbs(sql: &str) -> Vec<&'static str> {
    let lowered = sql.to_lowercase();
    let mut out: Vec<&'static str> = Vec::new();
    for (probe, tag) in PROBES {
        if probe.hit(&lowered) && !out.contains(tag) {
            out.push(*tag);
        }
    }
    out
}
