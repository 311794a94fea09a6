//! XPath 1.0 Engine
//!
//! - Lexer with operator/name disambiguation
//! - Recursive-descent parser producing an AST
//! - Compiler resolving namespace prefixes into a flat op list
//! - Stack-machine evaluator over an indexed [`Document`](crate::index::Document)
//! - All axes but `namespace`, and the core function library
//! - Compiled expressions cached per namespace snapshot

pub mod axes;
pub mod cache;
pub mod compiler;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod value;

use thiserror::Error;

pub use cache::CompileCache;
pub use compiler::{compile, CompiledExpr, ExprKind};
pub use eval::{evaluate, EvalContext};
pub use value::XPathValue;

/// Failure inside the XPath engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XPathError {
    #[error("{message} at position {position}")]
    Syntax { position: usize, message: String },

    #[error("undeclared namespace prefix `{0}`")]
    UndeclaredPrefix(String),

    #[error("unknown function `{0}()`")]
    UnknownFunction(String),

    #[error("{function}() takes {expected} argument(s), got {found}")]
    Arity {
        function: String,
        expected: &'static str,
        found: usize,
    },

    #[error("{0}")]
    Unsupported(String),

    #[error("{0}")]
    Eval(String),
}

impl XPathError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn eval(message: impl Into<String>) -> Self {
        Self::Eval(message.into())
    }

    /// Whether the error comes from compiling rather than evaluating
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            Self::Syntax { .. }
                | Self::UndeclaredPrefix(_)
                | Self::UnknownFunction(_)
                | Self::Arity { .. }
        )
    }
}

pub type XPathResult<T> = Result<T, XPathError>;
