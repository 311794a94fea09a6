//! XPath Evaluation Engine
//!
//! Evaluates compiled XPath expressions against an indexed document with
//! a value stack. Node-sets on the stack are kept in document order
//! without duplicates.

use super::axes::{matches_node_test, navigate};
use super::compiler::{CompiledExpr, CompiledStep, Op};
use super::functions;
use super::parser::BinaryOp;
use super::value::XPathValue;
use super::{XPathError, XPathResult};
use crate::index::{Document, NodeId};

/// Evaluation context
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub doc: &'a Document,
    pub node: NodeId,
    pub position: usize,
    pub size: usize,
}

impl<'a> EvalContext<'a> {
    /// Context for a top-level evaluation at `node`
    pub fn new(doc: &'a Document, node: NodeId) -> Self {
        Self {
            doc,
            node,
            position: 1,
            size: 1,
        }
    }

    fn at(&self, node: NodeId, position: usize, size: usize) -> Self {
        Self {
            doc: self.doc,
            node,
            position,
            size,
        }
    }
}

/// Evaluate a compiled expression
pub fn evaluate(expr: &CompiledExpr, ctx: &EvalContext<'_>) -> XPathResult<XPathValue> {
    let mut stack: Vec<XPathValue> = Vec::with_capacity(4);

    for op in &expr.ops {
        let value = match op {
            Op::Root => XPathValue::single_node(NodeId::Document),
            Op::Context => XPathValue::single_node(ctx.node),
            Op::Step(step) => {
                let input = pop_nodeset(&mut stack, "a location step")?;
                XPathValue::NodeSet(apply_step(ctx, &input, step)?)
            }
            Op::Filter(pred) => {
                let input = pop_nodeset(&mut stack, "a predicate")?;
                XPathValue::NodeSet(apply_predicate(ctx, input, pred)?)
            }
            Op::Union => {
                let right = pop_nodeset(&mut stack, "`|`")?;
                let mut left = pop_nodeset(&mut stack, "`|`")?;
                left.extend(right);
                ctx.doc.sort_document_order(&mut left);
                XPathValue::NodeSet(left)
            }
            Op::Number(n) => XPathValue::Number(*n),
            Op::String(s) => XPathValue::String(s.clone()),
            Op::Negate => {
                let value = pop(&mut stack)?;
                XPathValue::Number(-value.to_number(ctx.doc))
            }
            Op::Binary(op) => {
                let right = pop(&mut stack)?;
                let left = pop(&mut stack)?;
                binary(ctx.doc, *op, &left, &right)
            }
            Op::Call(name, arg_count) => {
                let split = stack
                    .len()
                    .checked_sub(*arg_count)
                    .ok_or_else(|| XPathError::eval("evaluation stack underflow"))?;
                let args = stack.split_off(split);
                functions::call(name, args, ctx.doc, ctx.node, ctx.position, ctx.size)?
            }
        };
        stack.push(value);
    }

    pop(&mut stack)
}

fn pop(stack: &mut Vec<XPathValue>) -> XPathResult<XPathValue> {
    stack
        .pop()
        .ok_or_else(|| XPathError::eval("evaluation stack underflow"))
}

fn pop_nodeset(stack: &mut Vec<XPathValue>, user: &str) -> XPathResult<Vec<NodeId>> {
    match pop(stack)? {
        XPathValue::NodeSet(nodes) => Ok(nodes),
        other => Err(XPathError::eval(format!(
            "{} needs a node-set, got a {}",
            user,
            other.type_name()
        ))),
    }
}

/// Apply a step to every input node. Predicates see each node's axis
/// candidates in axis order; the merged result is in document order.
fn apply_step(ctx: &EvalContext<'_>, input: &[NodeId], step: &CompiledStep) -> XPathResult<Vec<NodeId>> {
    let mut result = Vec::with_capacity(input.len());
    for &node in input {
        let mut candidates: Vec<NodeId> = navigate(ctx.doc, node, step.axis)
            .into_iter()
            .filter(|&candidate| matches_node_test(ctx.doc, candidate, &step.test, step.axis))
            .collect();
        for pred in &step.predicates {
            candidates = apply_predicate(ctx, candidates, pred)?;
        }
        result.extend(candidates);
    }
    ctx.doc.sort_document_order(&mut result);
    Ok(result)
}

/// Keep the nodes for which `pred` holds, numbering them in the given order
fn apply_predicate(
    ctx: &EvalContext<'_>,
    nodes: Vec<NodeId>,
    pred: &CompiledExpr,
) -> XPathResult<Vec<NodeId>> {
    let size = nodes.len();
    let mut kept = Vec::with_capacity(size);
    for (i, node) in nodes.into_iter().enumerate() {
        let position = i + 1;
        let include = match evaluate(pred, &ctx.at(node, position, size))? {
            XPathValue::Number(n) => n == position as f64,
            other => other.to_boolean(),
        };
        if include {
            kept.push(node);
        }
    }
    Ok(kept)
}

fn binary(doc: &Document, op: BinaryOp, left: &XPathValue, right: &XPathValue) -> XPathValue {
    match op {
        BinaryOp::Or => XPathValue::Boolean(left.to_boolean() || right.to_boolean()),
        BinaryOp::And => XPathValue::Boolean(left.to_boolean() && right.to_boolean()),
        BinaryOp::Eq
        | BinaryOp::NotEq
        | BinaryOp::Lt
        | BinaryOp::LtEq
        | BinaryOp::Gt
        | BinaryOp::GtEq => XPathValue::Boolean(compare(doc, op, left, right)),
        BinaryOp::Add => XPathValue::Number(left.to_number(doc) + right.to_number(doc)),
        BinaryOp::Sub => XPathValue::Number(left.to_number(doc) - right.to_number(doc)),
        BinaryOp::Mul => XPathValue::Number(left.to_number(doc) * right.to_number(doc)),
        BinaryOp::Div => XPathValue::Number(left.to_number(doc) / right.to_number(doc)),
        BinaryOp::Mod => XPathValue::Number(left.to_number(doc) % right.to_number(doc)),
    }
}

/// XPath 1.0 comparison: a node-set compares true if any of its nodes'
/// string-values does, except against a boolean, where the node-set is
/// converted as a whole.
fn compare(doc: &Document, op: BinaryOp, left: &XPathValue, right: &XPathValue) -> bool {
    let node_values = |nodes: &[NodeId]| -> Vec<XPathValue> {
        nodes
            .iter()
            .map(|&n| XPathValue::String(doc.string_value(n).into_owned()))
            .collect()
    };

    match (left, right) {
        (XPathValue::NodeSet(l), XPathValue::NodeSet(r)) => {
            let r = node_values(r);
            node_values(l)
                .iter()
                .any(|a| r.iter().any(|b| compare_scalars(doc, op, a, b)))
        }
        (XPathValue::NodeSet(nodes), XPathValue::Boolean(_)) => {
            compare_scalars(doc, op, &XPathValue::Boolean(!nodes.is_empty()), right)
        }
        (XPathValue::Boolean(_), XPathValue::NodeSet(nodes)) => {
            compare_scalars(doc, op, left, &XPathValue::Boolean(!nodes.is_empty()))
        }
        (XPathValue::NodeSet(nodes), other) => node_values(nodes)
            .iter()
            .any(|value| compare_scalars(doc, op, value, other)),
        (other, XPathValue::NodeSet(nodes)) => node_values(nodes)
            .iter()
            .any(|value| compare_scalars(doc, op, other, value)),
        _ => compare_scalars(doc, op, left, right),
    }
}

fn compare_scalars(doc: &Document, op: BinaryOp, left: &XPathValue, right: &XPathValue) -> bool {
    use XPathValue::{Boolean, Number};

    match op {
        BinaryOp::Eq | BinaryOp::NotEq => {
            let equal = match (left, right) {
                (Boolean(_), _) | (_, Boolean(_)) => left.to_boolean() == right.to_boolean(),
                (Number(_), _) | (_, Number(_)) => left.to_number(doc) == right.to_number(doc),
                _ => left.to_string_value(doc) == right.to_string_value(doc),
            };
            equal == (op == BinaryOp::Eq)
        }
        _ => {
            let (l, r) = (left.to_number(doc), right.to_number(doc));
            match op {
                BinaryOp::Lt => l < r,
                BinaryOp::LtEq => l <= r,
                BinaryOp::Gt => l > r,
                _ => l >= r,
            }
        }
    }
}
