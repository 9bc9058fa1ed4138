/// Alias given to the wrapped learner query.
pub const SUBQUERY_ALIAS: &str = "_q";

/// Rewrites a sanitized SELECT so the datastore can never return more than
/// `cap` rows, whatever LIMIT/OFFSET the inner query carries. An ORDER BY in
/// the inner query still decides which rows survive the cut.
pub fn wrap(sql: &str, cap: usize) -> String {
    format!(
        "select * from ({}) as {} limit {}",
        sql.trim(),
        SUBQUERY_ALIAS,
        cap
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_as_subquery_with_outer_limit() {
        assert_eq!(
            wrap("select tconst from basics order by tconst limit 1000000", 10),
            "select * from (select tconst from basics order by tconst limit 1000000) as _q limit 10"
        );
    }

    #[test]
    fn wrapping_is_deterministic() {
        assert_eq!(wrap(" select 1 ", 3), wrap("select 1", 3));
    }
}
