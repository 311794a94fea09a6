//! Query cursor adapter
//!
//! Compiles an expression against a context's namespace snapshot,
//! evaluates it from the context's position and classifies every result:
//! elements become new cursors, attributes and character data become
//! values. Scalar expressions fall back to a single string value.

use crate::error::QueryError;
use crate::index::{Cursor, NodeId};
use crate::xpath::{
    evaluate as eval_xpath, CompileCache, EvalContext, ExprKind, XPathError,
    XPathValue,
};

use super::namespace::NamespaceRegistry;

/// One classified result of a query
#[derive(Debug, Clone)]
pub enum ResultPosition {
    Element(Cursor),
    Value(String),
}

/// Results of one evaluation, classified as they are consumed
#[derive(Debug)]
pub struct ResultPositions {
    inner: Results,
}

#[derive(Debug)]
enum Results {
    Nodes {
        base: Cursor,
        nodes: std::vec::IntoIter<NodeId>,
    },
    Scalar(Option<String>),
}

impl Iterator for ResultPositions {
    type Item = ResultPosition;

    fn next(&mut self) -> Option<ResultPosition> {
        match &mut self.inner {
            Results::Nodes { base, nodes } => nodes.next().map(|node| classify(base, node)),
            Results::Scalar(value) => value.take().map(ResultPosition::Value),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.inner {
            Results::Nodes { nodes, .. } => nodes.size_hint(),
            Results::Scalar(value) => {
                let n = usize::from(value.is_some());
                (n, Some(n))
            }
        }
    }
}

impl ExactSizeIterator for ResultPositions {}

fn classify(base: &Cursor, node: NodeId) -> ResultPosition {
    let element = match node {
        NodeId::Element(index) => Some(index),
        NodeId::Document => Some(base.document().root()),
        _ => None,
    };
    match element {
        Some(index) => {
            let mut cursor = base.clone();
            cursor.recover_node(index);
            ResultPosition::Element(cursor)
        }
        None => ResultPosition::Value(base.normalized_string_at(node).into_owned()),
    }
}

/// Evaluate `xpath` from the cursor's position
pub fn evaluate(
    cursor: &Cursor,
    namespaces: &NamespaceRegistry,
    cache: &CompileCache,
    xpath: &str,
) -> Result<ResultPositions, QueryError> {
    let compiled = cache
        .compile(&namespaces.snapshot(), xpath)
        .map_err(|err| query_error(xpath, err))?;

    if compiled.kind == ExprKind::Binary {
        return Err(QueryError::UnsupportedExpression {
            xpath: xpath.to_string(),
            message: "binary expressions do not select nodes".to_string(),
        });
    }

    let doc = cursor.document();
    let ctx = EvalContext::new(doc, cursor.current_node());
    let value = eval_xpath(&compiled, &ctx).map_err(|err| query_error(xpath, err))?;

    let inner = match value {
        XPathValue::NodeSet(nodes) => {
            tracing::trace!(xpath, results = nodes.len(), "evaluated xpath");
            Results::Nodes {
                base: cursor.clone(),
                nodes: nodes.into_iter(),
            }
        }
        scalar => Results::Scalar(Some(scalar.to_string_value(doc))),
    };
    Ok(ResultPositions { inner })
}

fn query_error(xpath: &str, err: XPathError) -> QueryError {
    let xpath = xpath.to_string();
    let message = err.to_string();
    match err {
        _ if err.is_compile_error() => QueryError::InvalidSyntax { xpath, message },
        XPathError::Unsupported(_) => QueryError::UnsupportedExpression { xpath, message },
        _ => QueryError::EvaluationFailed { xpath, message },
    }
}
