//! XPath Parser
//!
//! Recursive descent parser for XPath 1.0 expressions. Abbreviations are
//! expanded while parsing: `.` is `self::node()`, `..` is
//! `parent::node()`, `@x` is `attribute::x` and `//` is
//! `/descendant-or-self::node()/`.

use super::lexer::{Lexer, Spanned, Token};
use super::{XPathError, XPathResult};

/// Deepest nesting of parenthesised, predicate, argument or negated
/// sub-expressions accepted before parsing gives up
pub const MAX_NESTING: usize = 64;

/// XPath expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// The document node (a leading `/`)
    Root,
    /// Union of two expressions (|)
    Union(Box<Expr>, Box<Expr>),
    /// A step applied to every node of a node-set expression
    Path(Box<Expr>, Box<Step>),
    /// Filter expression with predicate
    Filter(Box<Expr>, Box<Expr>),
    Function(String, Vec<Expr>),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    /// Unary negation
    Negate(Box<Expr>),
    Number(f64),
    String(String),
    Variable(String),
    /// A step relative to the context node
    Step(Box<Step>),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Location step in a path
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub node_test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    fn bare(axis: Axis, node_test: NodeTest) -> Self {
        Step {
            axis,
            node_test,
            predicates: Vec::new(),
        }
    }
}

/// XPath axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
    Self_,
    Attribute,
    Namespace,
}

impl Axis {
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "child" => Some(Axis::Child),
            "descendant" => Some(Axis::Descendant),
            "descendant-or-self" => Some(Axis::DescendantOrSelf),
            "parent" => Some(Axis::Parent),
            "ancestor" => Some(Axis::Ancestor),
            "ancestor-or-self" => Some(Axis::AncestorOrSelf),
            "following-sibling" => Some(Axis::FollowingSibling),
            "preceding-sibling" => Some(Axis::PrecedingSibling),
            "following" => Some(Axis::Following),
            "preceding" => Some(Axis::Preceding),
            "self" => Some(Axis::Self_),
            "attribute" => Some(Axis::Attribute),
            "namespace" => Some(Axis::Namespace),
            _ => None,
        }
    }
}

/// Node test in a location step
#[derive(Debug, Clone, PartialEq)]
pub enum NodeTest {
    /// `*`: any node of the axis' principal kind
    Any,
    /// Unprefixed name
    Name(String),
    /// prefix:local
    QName(String, String),
    /// prefix:*
    NamespaceWildcard(String),
    Node,
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
}

/// XPath parser
pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    pub fn new(input: &str) -> XPathResult<Self> {
        let tokens = Lexer::new(input).tokenize()?;
        Ok(Parser {
            tokens,
            pos: 0,
            depth: 0,
        })
    }

    /// Parse a complete expression; trailing tokens are an error
    pub fn parse(&mut self) -> XPathResult<Expr> {
        let expr = self.parse_expr()?;
        if *self.current() != Token::Eof {
            return Err(self.unexpected());
        }
        Ok(expr)
    }

    fn current(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .map_or(&Token::Eof, |spanned| &spanned.token)
    }

    fn position(&self) -> usize {
        self.tokens.get(self.pos).map_or(0, |spanned| spanned.position)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn unexpected(&self) -> XPathError {
        match self.current() {
            Token::Eof => XPathError::syntax(self.position(), "unexpected end of expression"),
            token => XPathError::syntax(self.position(), format!("unexpected token {:?}", token)),
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> XPathResult<()> {
        if *self.current() == token {
            self.advance();
            Ok(())
        } else {
            Err(XPathError::syntax(self.position(), format!("expected {}", what)))
        }
    }

    /// Run `parse` one nesting level deeper, failing past [`MAX_NESTING`]
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> XPathResult<T>) -> XPathResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(XPathError::syntax(
                self.position(),
                format!("expression nested deeper than {}", MAX_NESTING),
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn parse_expr(&mut self) -> XPathResult<Expr> {
        self.nested(Self::parse_or_expr)
    }

    fn parse_or_expr(&mut self) -> XPathResult<Expr> {
        let mut left = self.parse_and_expr()?;
        while *self.current() == Token::Or {
            self.advance();
            let right = self.parse_and_expr()?;
            left = Expr::Binary(Box::new(left), BinaryOp::Or, Box::new(right));
        }
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> XPathResult<Expr> {
        let mut left = self.parse_equality_expr()?;
        while *self.current() == Token::And {
            self.advance();
            let right = self.parse_equality_expr()?;
            left = Expr::Binary(Box::new(left), BinaryOp::And, Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality_expr(&mut self) -> XPathResult<Expr> {
        let mut left = self.parse_relational_expr()?;
        loop {
            let op = match self.current() {
                Token::Eq => BinaryOp::Eq,
                Token::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_relational_expr(&mut self) -> XPathResult<Expr> {
        let mut left = self.parse_additive_expr()?;
        loop {
            let op = match self.current() {
                Token::Lt => BinaryOp::Lt,
                Token::LtEq => BinaryOp::LtEq,
                Token::Gt => BinaryOp::Gt,
                Token::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_additive_expr(&mut self) -> XPathResult<Expr> {
        let mut left = self.parse_multiplicative_expr()?;
        loop {
            let op = match self.current() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_multiplicative_expr(&mut self) -> XPathResult<Expr> {
        let mut left = self.parse_unary_expr()?;
        loop {
            let op = match self.current() {
                Token::Multiply => BinaryOp::Mul,
                Token::Div => BinaryOp::Div,
                Token::Mod => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> XPathResult<Expr> {
        if *self.current() == Token::Minus {
            self.advance();
            let expr = self.nested(Self::parse_unary_expr)?;
            Ok(Expr::Negate(Box::new(expr)))
        } else {
            self.parse_union_expr()
        }
    }

    fn parse_union_expr(&mut self) -> XPathResult<Expr> {
        let mut left = self.parse_path_expr()?;
        while *self.current() == Token::Pipe {
            self.advance();
            let right = self.parse_path_expr()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn starts_filter_expr(&self) -> bool {
        matches!(
            self.current(),
            Token::Dollar
                | Token::LeftParen
                | Token::String(_)
                | Token::Number(_)
                | Token::FunctionName(_)
        )
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.current(),
            Token::Name(_)
                | Token::NameTest(_)
                | Token::Star
                | Token::NodeType(_)
                | Token::Axis(_)
                | Token::At
                | Token::Dot
                | Token::DoubleDot
        )
    }

    fn parse_path_expr(&mut self) -> XPathResult<Expr> {
        if self.starts_filter_expr() {
            let mut expr = self.parse_primary_expr()?;
            while *self.current() == Token::LeftBracket {
                let pred = self.parse_predicate()?;
                expr = Expr::Filter(Box::new(expr), Box::new(pred));
            }
            return self.parse_relative_continuation(expr);
        }

        match self.current() {
            Token::Slash => {
                self.advance();
                if !self.starts_step() {
                    return Ok(Expr::Root);
                }
                let step = self.parse_step()?;
                let expr = Expr::Path(Box::new(Expr::Root), Box::new(step));
                self.parse_relative_continuation(expr)
            }
            Token::DoubleSlash => {
                self.advance();
                let expr = Expr::Path(Box::new(Expr::Root), Box::new(descendant_or_self()));
                let step = self.parse_step()?;
                let expr = Expr::Path(Box::new(expr), Box::new(step));
                self.parse_relative_continuation(expr)
            }
            _ if self.starts_step() => {
                let step = self.parse_step()?;
                self.parse_relative_continuation(Expr::Step(Box::new(step)))
            }
            _ => Err(self.unexpected()),
        }
    }

    /// `/step` and `//step` continuations of a path
    fn parse_relative_continuation(&mut self, mut expr: Expr) -> XPathResult<Expr> {
        loop {
            match self.current() {
                Token::Slash => {
                    self.advance();
                    let step = self.parse_step()?;
                    expr = Expr::Path(Box::new(expr), Box::new(step));
                }
                Token::DoubleSlash => {
                    self.advance();
                    expr = Expr::Path(Box::new(expr), Box::new(descendant_or_self()));
                    let step = self.parse_step()?;
                    expr = Expr::Path(Box::new(expr), Box::new(step));
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_predicate(&mut self) -> XPathResult<Expr> {
        self.expect(Token::LeftBracket, "`[`")?;
        let pred = self.parse_expr()?;
        self.expect(Token::RightBracket, "`]`")?;
        Ok(pred)
    }

    fn parse_primary_expr(&mut self) -> XPathResult<Expr> {
        match self.current().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            Token::String(s) => {
                self.advance();
                Ok(Expr::String(s))
            }
            Token::Dollar => {
                self.advance();
                match self.current().clone() {
                    Token::Name(name) => {
                        self.advance();
                        Ok(Expr::Variable(name))
                    }
                    _ => Err(XPathError::syntax(self.position(), "expected variable name")),
                }
            }
            Token::LeftParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(Token::RightParen, "`)`")?;
                Ok(expr)
            }
            Token::FunctionName(name) => {
                self.advance();
                self.expect(Token::LeftParen, "`(`")?;
                let args = self.parse_function_args()?;
                Ok(Expr::Function(name, args))
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_step(&mut self) -> XPathResult<Step> {
        match self.current() {
            Token::Dot => {
                self.advance();
                return Ok(Step::bare(Axis::Self_, NodeTest::Node));
            }
            Token::DoubleDot => {
                self.advance();
                return Ok(Step::bare(Axis::Parent, NodeTest::Node));
            }
            _ => {}
        }

        let axis = match self.current().clone() {
            Token::At => {
                self.advance();
                Axis::Attribute
            }
            Token::Axis(name) => {
                let position = self.position();
                let axis = Axis::from_name(&name)
                    .ok_or_else(|| XPathError::syntax(position, format!("unknown axis `{}`", name)))?;
                self.advance();
                self.expect(Token::DoubleColon, "`::`")?;
                axis
            }
            _ => Axis::Child,
        };

        let node_test = self.parse_node_test()?;

        let mut predicates = Vec::new();
        while *self.current() == Token::LeftBracket {
            predicates.push(self.parse_predicate()?);
        }

        Ok(Step {
            axis,
            node_test,
            predicates,
        })
    }

    fn parse_node_test(&mut self) -> XPathResult<NodeTest> {
        let test = match self.current().clone() {
            Token::Star => NodeTest::Any,
            Token::Name(qname) => match qname.split_once(':') {
                Some((prefix, local)) => NodeTest::QName(prefix.to_string(), local.to_string()),
                None => NodeTest::Name(qname),
            },
            Token::NameTest(prefix) => NodeTest::NamespaceWildcard(prefix),
            Token::NodeType(name) => {
                self.advance();
                self.expect(Token::LeftParen, "`(`")?;
                let target = match self.current().clone() {
                    Token::String(s) if name == "processing-instruction" => {
                        self.advance();
                        Some(s)
                    }
                    _ => None,
                };
                self.expect(Token::RightParen, "`)`")?;
                return Ok(match name.as_str() {
                    "node" => NodeTest::Node,
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    _ => NodeTest::ProcessingInstruction(target),
                });
            }
            _ => {
                return Err(XPathError::syntax(self.position(), "expected a node test"));
            }
        };
        self.advance();
        Ok(test)
    }

    fn parse_function_args(&mut self) -> XPathResult<Vec<Expr>> {
        let mut args = Vec::new();
        if *self.current() != Token::RightParen {
            args.push(self.parse_expr()?);
            while *self.current() == Token::Comma {
                self.advance();
                args.push(self.parse_expr()?);
            }
        }
        self.expect(Token::RightParen, "`)`")?;
        Ok(args)
    }
}

fn descendant_or_self() -> Step {
    Step::bare(Axis::DescendantOrSelf, NodeTest::Node)
}

/// Parse an XPath expression string
pub fn parse(input: &str) -> XPathResult<Expr> {
    Parser::new(input)?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(axis: Axis, node_test: NodeTest) -> Step {
        Step::bare(axis, node_test)
    }

    #[test]
    fn test_simple_path() {
        let expr = parse("/root/child").unwrap();
        let root = Expr::Path(
            Box::new(Expr::Root),
            Box::new(step(Axis::Child, NodeTest::Name("root".into()))),
        );
        assert_eq!(
            expr,
            Expr::Path(
                Box::new(root),
                Box::new(step(Axis::Child, NodeTest::Name("child".into())))
            )
        );
    }

    #[test]
    fn test_step_predicate() {
        let Expr::Step(step) = parse("item[@id='test']").unwrap() else {
            panic!("expected a step");
        };
        assert_eq!(step.predicates.len(), 1);
        assert!(matches!(step.predicates[0], Expr::Binary(_, BinaryOp::Eq, _)));
    }

    #[test]
    fn test_abbreviations() {
        assert_eq!(
            parse("..").unwrap(),
            Expr::Step(Box::new(step(Axis::Parent, NodeTest::Node)))
        );
        let Expr::Path(base, last) = parse("//item").unwrap() else {
            panic!("expected a path");
        };
        assert_eq!(last.node_test, NodeTest::Name("item".into()));
        assert!(matches!(*base, Expr::Path(_, ref s) if s.axis == Axis::DescendantOrSelf));
    }

    #[test]
    fn test_function_and_filter() {
        assert!(matches!(parse("count(//item)").unwrap(), Expr::Function(name, _) if name == "count"));
        assert!(matches!(parse("(//a)[1]").unwrap(), Expr::Filter(..)));
        assert!(matches!(parse("(//a)[1]/b").unwrap(), Expr::Path(..)));
    }

    #[test]
    fn test_lone_root() {
        assert_eq!(parse("/").unwrap(), Expr::Root);
        assert!(matches!(parse("/ | //a").unwrap(), Expr::Union(..)));
    }

    #[test]
    fn test_node_tests() {
        let Expr::Step(s) = parse("p:*").unwrap() else {
            panic!("expected a step");
        };
        assert_eq!(s.node_test, NodeTest::NamespaceWildcard("p".into()));
        let Expr::Step(s) = parse("processing-instruction('x')").unwrap() else {
            panic!("expected a step");
        };
        assert_eq!(s.node_test, NodeTest::ProcessingInstruction(Some("x".into())));
        let Expr::Step(s) = parse("attribute::p:id").unwrap() else {
            panic!("expected a step");
        };
        assert_eq!(s.axis, Axis::Attribute);
        assert_eq!(s.node_test, NodeTest::QName("p".into(), "id".into()));
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |depth: usize| format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(parse(&nested(MAX_NESTING - 1)).unwrap(), Expr::Number(1.0));
        for bad in [nested(MAX_NESTING), nested(10_000), format!("{}1", "-".repeat(10_000))] {
            assert!(matches!(parse(&bad), Err(XPathError::Syntax { .. })));
        }
        let predicates = format!("{}a{}", "a[".repeat(10_000), "]".repeat(10_000));
        assert!(matches!(parse(&predicates), Err(XPathError::Syntax { .. })));
    }

    #[test]
    fn test_syntax_errors() {
        for bad in ["", "/a/", "a[", "a]", "foo::a", "count(", "a/@", "(1", "1 +"] {
            assert!(
                matches!(parse(bad), Err(XPathError::Syntax { .. })),
                "{bad:?} should fail"
            );
        }
    }
}
