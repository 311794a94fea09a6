//! Parallel batch queries
//!
//! Uses Rayon to run several independent `select_all` queries against one
//! context.

use rayon::prelude::*;

use super::{Context, ElementContext, XmlContext};
use crate::error::QueryError;

/// Evaluate `(key, xpath)` pairs in parallel, keeping input order
///
/// The first failing query, in input order, is returned as the error.
pub fn xmap<C, K>(context: &C, queries: &[(K, &str)]) -> Result<Vec<(K, Vec<Context>)>, QueryError>
where
    C: XmlContext + Sync + ?Sized,
    K: Clone + Send + Sync,
{
    let results: Vec<_> = queries
        .par_iter()
        .map(|(key, xpath)| context.select_all(xpath).map(|results| (key.clone(), results)))
        .collect();
    results.into_iter().collect()
}

impl ElementContext {
    /// Parallel `select_all` over several queries; see [`xmap`]
    pub fn xmap<K: Clone + Send + Sync>(
        &self,
        queries: &[(K, &str)],
    ) -> Result<Vec<(K, Vec<Context>)>, QueryError> {
        xmap(self, queries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xmap_keeps_input_order() {
        let ctx = crate::parse_str("<root><a/><b/><b/><c>t</c></root>").unwrap();
        let queries = [("bs", "b"), ("as", "a"), ("text", "c/text()"), ("none", "d")];

        let results = ctx.xmap(&queries).unwrap();
        let summary: Vec<(&str, usize)> = results.iter().map(|(k, v)| (*k, v.len())).collect();
        assert_eq!(summary, vec![("bs", 2), ("as", 1), ("text", 1), ("none", 0)]);
    }

    #[test]
    fn test_xmap_fails_on_bad_query() {
        let ctx = crate::parse_str("<root/>").unwrap();
        let err = ctx.xmap(&[(1, "a"), (2, "a["), (3, "$v")]).unwrap_err();
        assert!(matches!(err, QueryError::InvalidSyntax { .. }));
    }
}
