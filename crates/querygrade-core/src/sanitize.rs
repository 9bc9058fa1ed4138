//! Allow-list-lite policy for learner SQL.
//!
//! This is a lexical heuristic, not a SQL parser. Known gaps that the policy
//! accepts rather than closes:
//!
//! - A keyword is only caught when a space follows it, so one at the very end
//!   of the text or directly followed by punctuation (`delete(`) slips through.
//! - The keyword test ignores what precedes it, so ordinary words ending in a
//!   keyword (`recall `) or keywords inside string literals are refused.
//!
//! The datastore session is read-only as well, so a query that evades this
//! layer still cannot write.

use crate::errors::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRule {
    /// Keyword followed by a space, anywhere in the lower-cased text.
    Keyword(&'static str),
    /// Raw substring, anywhere in the lower-cased text.
    Substring(&'static str),
}

impl BlockRule {
    pub fn token(&self) -> &'static str {
        match self {
            BlockRule::Keyword(t) | BlockRule::Substring(t) => t,
        }
    }

    fn matches(&self, lowered: &str) -> bool {
        match self {
            BlockRule::Keyword(kw) => lowered
                .match_indices(kw)
                .any(|(i, _)| lowered[i + kw.len()..].starts_with(' ')),
            BlockRule::Substring(s) => lowered.contains(s),
        }
    }
}

pub const BLOCKED: &[BlockRule] = &[
    BlockRule::Substring(";"),
    BlockRule::Substring("--"),
    BlockRule::Substring("/*"),
    BlockRule::Keyword("insert"),
    BlockRule::Keyword("update"),
    BlockRule::Keyword("delete"),
    BlockRule::Keyword("create"),
    BlockRule::Keyword("drop"),
    BlockRule::Keyword("alter"),
    BlockRule::Keyword("truncate"),
    BlockRule::Keyword("copy"),
    BlockRule::Keyword("grant"),
    BlockRule::Keyword("revoke"),
    BlockRule::Keyword("call"),
];

/// Trims surrounding whitespace and every trailing run of semicolons and
/// whitespace. The SQL itself is never rewritten.
pub fn trim_statement(raw: &str) -> &str {
    raw.trim()
        .trim_end_matches(|c: char| c == ';' || c.is_whitespace())
}

/// Returns the trimmed statement if it passes the policy.
///
/// Blocked tokens are checked before the `select` prefix so that a
/// destructive statement is reported as such rather than as "not a select".
pub fn sanitize(raw: &str) -> Result<&str, ValidationError> {
    let sql = trim_statement(raw);
    if sql.is_empty() {
        return Err(ValidationError::Empty);
    }

    let lowered = sql.to_lowercase();
    if let Some(rule) = BLOCKED.iter().find(|r| r.matches(&lowered)) {
        return Err(ValidationError::BlockedKeyword {
            token: rule.token().to_string(),
        });
    }

    if !lowered.starts_with("select") {
        return Err(ValidationError::NotSelect);
    }

    Ok(sql)
}
