//! XPath 1.0 Functions
//!
//! The core function library:
//!
//! Node Set Functions:
//! - position(), last(), count(), local-name(), namespace-uri(), name()
//!
//! String Functions:
//! - string(), concat(), starts-with(), contains(), substring(),
//!   substring-before(), substring-after(), string-length(),
//!   normalize-space(), translate()
//!
//! Boolean Functions:
//! - boolean(), not(), true(), false(), lang()
//!
//! Number Functions:
//! - number(), sum(), floor(), ceiling(), round()
//!
//! Names and arities are checked when an expression is compiled, so the
//! implementations can index their arguments directly.

use super::value::{parse_number, XPathValue};
use super::{XPathError, XPathResult};
use crate::index::namespace::ns;
use crate::index::{Document, NodeId};

/// Minimum and maximum argument counts; `None` means unbounded
fn arity(name: &str) -> Option<(usize, Option<usize>, &'static str)> {
    let fixed = |n: usize, text: &'static str| Some((n, Some(n), text));
    match name {
        "last" | "position" | "true" | "false" => fixed(0, "0"),
        "count" | "boolean" | "not" | "lang" | "sum" | "floor" | "ceiling" | "round" => {
            fixed(1, "1")
        }
        "starts-with" | "contains" | "substring-before" | "substring-after" => fixed(2, "2"),
        "translate" => fixed(3, "3"),
        "local-name" | "namespace-uri" | "name" | "string" | "string-length"
        | "normalize-space" | "number" => Some((0, Some(1), "0 or 1")),
        "substring" => Some((2, Some(3), "2 or 3")),
        "concat" => Some((2, None, "at least 2")),
        _ => None,
    }
}

/// Whether `name` is a function this engine implements
pub fn is_known(name: &str) -> bool {
    arity(name).is_some()
}

/// Validate a call at compile time
pub fn check_call(name: &str, argc: usize) -> XPathResult<()> {
    let (min, max, expected) =
        arity(name).ok_or_else(|| XPathError::UnknownFunction(name.to_string()))?;
    if argc < min || max.is_some_and(|max| argc > max) {
        return Err(XPathError::Arity {
            function: name.to_string(),
            expected,
            found: argc,
        });
    }
    Ok(())
}

/// Evaluate a function call
pub fn call(
    name: &str,
    args: Vec<XPathValue>,
    doc: &Document,
    context: NodeId,
    position: usize,
    size: usize,
) -> XPathResult<XPathValue> {
    check_call(name, args.len())?;
    let string_arg = |i: usize| args[i].to_string_value(doc);
    let context_string = || doc.string_value(context).into_owned();

    let value = match name {
        // Node Set Functions
        "position" => XPathValue::Number(position as f64),
        "last" => XPathValue::Number(size as f64),
        "count" => XPathValue::Number(nodeset_arg(name, &args[0])?.len() as f64),
        "local-name" => {
            let node = optional_node(name, &args, context)?;
            XPathValue::from(node.map_or("", |n| doc.local_name(n)))
        }
        "namespace-uri" => {
            let node = optional_node(name, &args, context)?;
            XPathValue::from(node.and_then(|n| doc.namespace_uri(n)).unwrap_or(""))
        }
        "name" => {
            let node = optional_node(name, &args, context)?;
            XPathValue::from(node.map_or("", |n| doc.name(n)))
        }

        // String Functions
        "string" => XPathValue::String(if args.is_empty() {
            context_string()
        } else {
            string_arg(0)
        }),
        "concat" => XPathValue::String((0..args.len()).map(string_arg).collect()),
        "starts-with" => XPathValue::Boolean(string_arg(0).starts_with(&string_arg(1))),
        "contains" => XPathValue::Boolean(string_arg(0).contains(&string_arg(1))),
        "substring-before" => {
            let s = string_arg(0);
            let pattern = string_arg(1);
            XPathValue::String(s.find(&pattern).map_or_else(String::new, |pos| s[..pos].to_string()))
        }
        "substring-after" => {
            let s = string_arg(0);
            let pattern = string_arg(1);
            XPathValue::String(
                s.find(&pattern)
                    .map_or_else(String::new, |pos| s[pos + pattern.len()..].to_string()),
            )
        }
        "substring" => {
            let length = args.get(2).map(|len| len.to_number(doc));
            XPathValue::String(substring(&string_arg(0), args[1].to_number(doc), length))
        }
        "string-length" => {
            let s = if args.is_empty() {
                context_string()
            } else {
                string_arg(0)
            };
            XPathValue::Number(s.chars().count() as f64)
        }
        "normalize-space" => {
            let s = if args.is_empty() {
                context_string()
            } else {
                string_arg(0)
            };
            XPathValue::String(s.split_ascii_whitespace().collect::<Vec<_>>().join(" "))
        }
        "translate" => XPathValue::String(translate(&string_arg(0), &string_arg(1), &string_arg(2))),

        // Boolean Functions
        "boolean" => XPathValue::Boolean(args[0].to_boolean()),
        "not" => XPathValue::Boolean(!args[0].to_boolean()),
        "true" => XPathValue::Boolean(true),
        "false" => XPathValue::Boolean(false),
        "lang" => XPathValue::Boolean(lang_matches(doc, context, &string_arg(0))),

        // Number Functions
        "number" => XPathValue::Number(if args.is_empty() {
            parse_number(&context_string())
        } else {
            args[0].to_number(doc)
        }),
        "sum" => XPathValue::Number(
            nodeset_arg(name, &args[0])?
                .iter()
                .map(|&n| parse_number(&doc.string_value(n)))
                .sum(),
        ),
        "floor" => XPathValue::Number(args[0].to_number(doc).floor()),
        "ceiling" => XPathValue::Number(args[0].to_number(doc).ceil()),
        "round" => XPathValue::Number(round(args[0].to_number(doc))),

        _ => return Err(XPathError::UnknownFunction(name.to_string())),
    };
    Ok(value)
}

fn nodeset_arg<'v>(function: &str, value: &'v XPathValue) -> XPathResult<&'v [NodeId]> {
    value.as_nodeset().ok_or_else(|| {
        XPathError::eval(format!(
            "{}() expects a node-set, got a {}",
            function,
            value.type_name()
        ))
    })
}

/// The first node of an optional node-set argument, or the context node
fn optional_node(function: &str, args: &[XPathValue], context: NodeId) -> XPathResult<Option<NodeId>> {
    match args.first() {
        None => Ok(Some(context)),
        Some(value) => Ok(nodeset_arg(function, value)?.first().copied()),
    }
}

/// Characters at 1-based positions p with round(start) <= p < round(start) + round(length)
fn substring(s: &str, start: f64, length: Option<f64>) -> String {
    let first = round(start);
    let end = length.map_or(f64::INFINITY, |len| first + round(len));
    s.chars()
        .enumerate()
        .filter(|&(i, _)| {
            let p = (i + 1) as f64;
            p >= first && p < end
        })
        .map(|(_, c)| c)
        .collect()
}

fn translate(s: &str, from: &str, to: &str) -> String {
    let from: Vec<char> = from.chars().collect();
    let to: Vec<char> = to.chars().collect();
    s.chars()
        .filter_map(|c| match from.iter().position(|&fc| fc == c) {
            Some(pos) => to.get(pos).copied(),
            None => Some(c),
        })
        .collect()
}

/// Rounds halves towards positive infinity
fn round(n: f64) -> f64 {
    if !n.is_finite() || n == n.trunc() {
        n
    } else {
        (n + 0.5).floor()
    }
}

/// Whether the nearest `xml:lang` on the context or its ancestors matches
/// `target`, ignoring case and allowing a `-subtag` suffix
fn lang_matches(doc: &Document, context: NodeId, target: &str) -> bool {
    let declared = std::iter::successors(Some(context), |&n| doc.parent(n)).find_map(|n| {
        doc.attributes(n).find(|&a| {
            doc.local_name(a) == "lang" && doc.namespace_uri(a) == Some(ns::XML)
        })
    });
    let Some(attr) = declared else {
        return false;
    };
    let lang = doc.string_value(attr).to_lowercase();
    let target = target.to_lowercase();
    lang == target
        || (lang.starts_with(&target) && lang.as_bytes().get(target.len()) == Some(&b'-'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::parse_str("<root xml:lang=\"en-US\"><child>7</child><child>x</child></root>").unwrap()
    }

    fn call_str(name: &str, args: Vec<XPathValue>) -> String {
        let doc = doc();
        call(name, args, &doc, NodeId::Element(0), 1, 1)
            .unwrap()
            .to_string_value(&doc)
    }

    #[test]
    fn test_concat() {
        let args = vec!["hello".into(), " ".into(), "world".into()];
        assert_eq!(call_str("concat", args), "hello world");
    }

    #[test]
    fn test_substring() {
        assert_eq!(call_str("substring", vec!["hello".into(), 2.0.into(), 3.0.into()]), "ell");
        assert_eq!(call_str("substring", vec!["12345".into(), 1.5.into(), 2.6.into()]), "234");
        assert_eq!(call_str("substring", vec!["12345".into(), 0.0.into(), 3.0.into()]), "12");
        assert_eq!(call_str("substring", vec!["12345".into(), f64::NAN.into()]), "");
        assert_eq!(call_str("substring", vec!["12345".into(), (-42.0).into(), f64::INFINITY.into()]), "12345");
    }

    #[test]
    fn test_string_helpers() {
        assert_eq!(call_str("normalize-space", vec!["  hello   world  ".into()]), "hello world");
        assert_eq!(call_str("translate", vec!["bar".into(), "abc".into(), "ABC".into()]), "BAr");
        assert_eq!(call_str("translate", vec!["--aaa--".into(), "abc-".into(), "ABC".into()]), "AAA");
        assert_eq!(call_str("substring-before", vec!["1999/04/01".into(), "/".into()]), "1999");
        assert_eq!(call_str("substring-after", vec!["1999/04/01".into(), "/".into()]), "04/01");
    }

    #[test]
    fn test_numbers() {
        assert_eq!(call_str("round", vec![2.5.into()]), "3");
        assert_eq!(call_str("round", vec![(-2.5).into()]), "-2");
        assert_eq!(call_str("floor", vec![2.7.into()]), "2");
        assert_eq!(call_str("ceiling", vec![2.1.into()]), "3");
        let children = XPathValue::NodeSet(vec![NodeId::Element(1)]);
        assert_eq!(call_str("sum", vec![children]), "7");
        let mixed = XPathValue::NodeSet(vec![NodeId::Element(1), NodeId::Element(2)]);
        assert_eq!(call_str("sum", vec![mixed]), "NaN");
    }

    #[test]
    fn test_node_functions() {
        let doc = doc();
        let child = XPathValue::NodeSet(vec![NodeId::Element(2)]);
        let count = call("count", vec![child.clone()], &doc, NodeId::Element(0), 1, 1).unwrap();
        assert_eq!(count, XPathValue::Number(1.0));
        assert_eq!(call_str("name", vec![child]), "child");
        assert_eq!(call_str("name", vec![XPathValue::empty_nodeset()]), "");
        assert_eq!(call_str("local-name", vec![]), "root");
        assert!(call("count", vec!["x".into()], &doc, NodeId::Element(0), 1, 1).is_err());
    }

    #[test]
    fn test_lang() {
        let doc = doc();
        let child = NodeId::Element(1);
        for (lang, expected) in [("en", true), ("EN-us", true), ("e", false), ("de", false)] {
            let result = call("lang", vec![lang.into()], &doc, child, 1, 1).unwrap();
            assert_eq!(result.to_boolean(), expected, "lang({lang:?})");
        }
    }

    #[test]
    fn test_check_call() {
        assert!(is_known("normalize-space"));
        assert!(!is_known("id"));
        assert!(check_call("concat", 5).is_ok());
        assert!(matches!(check_call("concat", 1), Err(XPathError::Arity { .. })));
        assert!(matches!(check_call("nope", 0), Err(XPathError::UnknownFunction(_))));
    }
}
