//! XPath Expression Compiler
//!
//! Turns a parsed expression into a flat op list for the stack machine.
//! Namespace prefixes in name tests are resolved here against the
//! declarations the caller supplies, so evaluation compares URIs only.

use super::functions;
use super::parser::{self, Axis, BinaryOp, Expr, NodeTest, Step};
use super::{XPathError, XPathResult};

/// What a top-level expression produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprKind {
    /// Location paths, unions and filters
    NodeSet,
    /// Function calls, literals and negation
    Scalar,
    /// A top-level binary operator
    Binary,
}

/// Compiled XPath expression
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    pub ops: Vec<Op>,
    pub kind: ExprKind,
}

/// Compiled operation
#[derive(Debug, Clone)]
pub enum Op {
    /// Push the document node
    Root,
    /// Push the context node
    Context,
    /// Replace the node-set on top of the stack by applying a step to each node
    Step(CompiledStep),
    /// Filter the node-set on top of the stack, in document order
    Filter(Box<CompiledExpr>),
    /// Union two node sets
    Union,
    Number(f64),
    String(String),
    /// Call function: name, arg count
    Call(String, usize),
    Binary(BinaryOp),
    Negate,
}

#[derive(Debug, Clone)]
pub struct CompiledStep {
    pub axis: Axis,
    pub test: CompiledNodeTest,
    pub predicates: Vec<CompiledExpr>,
}

/// Node test with prefixes resolved to namespace URIs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompiledNodeTest {
    /// `*`: any node of the axis' principal kind
    Principal,
    /// Expanded name; `uri` is `None` for names without a prefix
    Name { uri: Option<String>, local: String },
    /// `prefix:*` resolved to its URI
    NamespaceWildcard(String),
    Node,
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
}

/// Prefix declarations visible to one compilation
pub trait NamespaceResolver {
    fn resolve_prefix(&self, prefix: &str) -> Option<&str>;
}

impl NamespaceResolver for [(String, String)] {
    fn resolve_prefix(&self, prefix: &str) -> Option<&str> {
        self.iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }
}

impl NamespaceResolver for std::collections::BTreeMap<String, String> {
    fn resolve_prefix(&self, prefix: &str) -> Option<&str> {
        self.get(prefix).map(String::as_str)
    }
}

struct Compiler<'n, N: NamespaceResolver + ?Sized> {
    namespaces: &'n N,
}

impl<N: NamespaceResolver + ?Sized> Compiler<'_, N> {
    fn compile(&self, expr: &Expr) -> XPathResult<CompiledExpr> {
        let mut ops = Vec::new();
        self.compile_expr(expr, &mut ops)?;
        Ok(CompiledExpr {
            ops,
            kind: classify(expr),
        })
    }

    fn compile_expr(&self, expr: &Expr, ops: &mut Vec<Op>) -> XPathResult<()> {
        match expr {
            Expr::Root => ops.push(Op::Root),
            Expr::Number(n) => ops.push(Op::Number(*n)),
            Expr::String(s) => ops.push(Op::String(s.clone())),
            Expr::Variable(name) => {
                return Err(XPathError::Unsupported(format!(
                    "variable references are not supported (${})",
                    name
                )));
            }
            Expr::Negate(inner) => {
                self.compile_expr(inner, ops)?;
                ops.push(Op::Negate);
            }
            Expr::Binary(left, op, right) => {
                self.compile_expr(left, ops)?;
                self.compile_expr(right, ops)?;
                ops.push(Op::Binary(*op));
            }
            Expr::Union(left, right) => {
                self.compile_expr(left, ops)?;
                self.compile_expr(right, ops)?;
                ops.push(Op::Union);
            }
            Expr::Path(base, step) => {
                self.compile_expr(base, ops)?;
                ops.push(Op::Step(self.compile_step(step)?));
            }
            Expr::Filter(base, pred) => {
                self.compile_expr(base, ops)?;
                ops.push(Op::Filter(Box::new(self.compile(pred)?)));
            }
            Expr::Step(step) => {
                ops.push(Op::Context);
                ops.push(Op::Step(self.compile_step(step)?));
            }
            Expr::Function(name, args) => {
                functions::check_call(name, args.len())?;
                for arg in args {
                    self.compile_expr(arg, ops)?;
                }
                ops.push(Op::Call(name.clone(), args.len()));
            }
        }
        Ok(())
    }

    fn compile_step(&self, step: &Step) -> XPathResult<CompiledStep> {
        let test = match &step.node_test {
            NodeTest::Any => CompiledNodeTest::Principal,
            NodeTest::Name(local) => CompiledNodeTest::Name {
                uri: None,
                local: local.clone(),
            },
            NodeTest::QName(prefix, local) => CompiledNodeTest::Name {
                uri: Some(self.resolve(prefix)?.to_string()),
                local: local.clone(),
            },
            NodeTest::NamespaceWildcard(prefix) => {
                CompiledNodeTest::NamespaceWildcard(self.resolve(prefix)?.to_string())
            }
            NodeTest::Node => CompiledNodeTest::Node,
            NodeTest::Text => CompiledNodeTest::Text,
            NodeTest::Comment => CompiledNodeTest::Comment,
            NodeTest::ProcessingInstruction(target) => {
                CompiledNodeTest::ProcessingInstruction(target.clone())
            }
        };

        let predicates = step
            .predicates
            .iter()
            .map(|pred| self.compile(pred))
            .collect::<XPathResult<Vec<_>>>()?;

        Ok(CompiledStep {
            axis: step.axis,
            test,
            predicates,
        })
    }

    fn resolve(&self, prefix: &str) -> XPathResult<&str> {
        if prefix == "xml" {
            return Ok(crate::index::namespace::ns::XML);
        }
        self.namespaces
            .resolve_prefix(prefix)
            .ok_or_else(|| XPathError::UndeclaredPrefix(prefix.to_string()))
    }
}

fn classify(expr: &Expr) -> ExprKind {
    match expr {
        Expr::Root | Expr::Union(..) | Expr::Path(..) | Expr::Filter(..) | Expr::Step(_) => {
            ExprKind::NodeSet
        }
        Expr::Binary(..) => ExprKind::Binary,
        Expr::Function(..)
        | Expr::Negate(_)
        | Expr::Number(_)
        | Expr::String(_)
        | Expr::Variable(_) => ExprKind::Scalar,
    }
}

/// Parse and compile an expression against a set of prefix declarations
pub fn compile<N>(namespaces: &N, xpath: &str) -> XPathResult<CompiledExpr>
where
    N: NamespaceResolver + ?Sized,
{
    let expr = parser::parse(xpath)?;
    Compiler { namespaces }.compile(&expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_namespaces() -> Vec<(String, String)> {
        Vec::new()
    }

    #[test]
    fn test_compile_simple() {
        let compiled = compile(no_namespaces().as_slice(), "/root").unwrap();
        assert!(matches!(compiled.ops[0], Op::Root));
        assert!(matches!(compiled.ops[1], Op::Step(_)));
        assert_eq!(compiled.kind, ExprKind::NodeSet);
    }

    #[test]
    fn test_classification() {
        let ns = no_namespaces();
        assert_eq!(compile(ns.as_slice(), "count(//a)").unwrap().kind, ExprKind::Scalar);
        assert_eq!(compile(ns.as_slice(), "'lit'").unwrap().kind, ExprKind::Scalar);
        assert_eq!(compile(ns.as_slice(), "@id='RR1'").unwrap().kind, ExprKind::Binary);
        assert_eq!(compile(ns.as_slice(), "//a | //b").unwrap().kind, ExprKind::NodeSet);
        assert_eq!(compile(ns.as_slice(), "(//a)[2]").unwrap().kind, ExprKind::NodeSet);
    }

    #[test]
    fn test_prefix_resolution() {
        let ns = vec![("p".to_string(), "urn:p".to_string())];
        let compiled = compile(ns.as_slice(), "p:item").unwrap();
        let Op::Step(step) = &compiled.ops[1] else {
            panic!("expected a step");
        };
        assert_eq!(
            step.test,
            CompiledNodeTest::Name {
                uri: Some("urn:p".into()),
                local: "item".into()
            }
        );

        assert_eq!(
            compile(ns.as_slice(), "q:item").unwrap_err(),
            XPathError::UndeclaredPrefix("q".into())
        );
        assert!(compile(ns.as_slice(), "@xml:lang").is_ok());
    }

    #[test]
    fn test_rejections() {
        let ns = no_namespaces();
        assert_eq!(
            compile(ns.as_slice(), "frobnicate(1)").unwrap_err(),
            XPathError::UnknownFunction("frobnicate".into())
        );
        assert!(matches!(
            compile(ns.as_slice(), "$v"),
            Err(XPathError::Unsupported(_))
        ));
        assert!(matches!(
            compile(ns.as_slice(), "count()"),
            Err(XPathError::Arity { found: 0, .. })
        ));
    }
}
