//! XPath Lexer
//!
//! Tokenizes XPath expressions. Whether `*` and the names `and`, `or`,
//! `mod`, `div` are operators depends on the preceding token (XPath 1.0
//! §3.7), so the lexer tracks the last token it produced.

use super::{XPathError, XPathResult};

/// XPath token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Operators
    Slash,       // /
    DoubleSlash, // //
    Dot,         // .
    DoubleDot,   // ..
    At,          // @
    Pipe,        // |
    Plus,        // +
    Minus,       // -
    Star,        // * as a name test
    Multiply,    // * as an operator
    Eq,          // =
    NotEq,       // !=
    Lt,          // <
    LtEq,        // <=
    Gt,          // >
    GtEq,        // >=
    And,         // and
    Or,          // or
    Mod,         // mod
    Div,         // div

    // Brackets
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]

    // Literals
    Number(f64),
    String(String),

    // Names
    Name(String),         // NCName or prefix:local
    NameTest(String),     // prefix:*, holding the prefix
    NodeType(String),     // node, text, comment, processing-instruction
    FunctionName(String), // a name followed by (
    Axis(String),         // a name followed by ::

    // Special
    DoubleColon, // ::
    Comma,       // ,
    Dollar,      // $

    Eof,
}

impl Token {
    fn is_operator(&self) -> bool {
        matches!(
            self,
            Token::And
                | Token::Or
                | Token::Mod
                | Token::Div
                | Token::Multiply
                | Token::Slash
                | Token::DoubleSlash
                | Token::Pipe
                | Token::Plus
                | Token::Minus
                | Token::Eq
                | Token::NotEq
                | Token::Lt
                | Token::LtEq
                | Token::Gt
                | Token::GtEq
        )
    }
}

/// A token and the byte position where it starts
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

/// XPath lexer
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    /// Whether the next `*` or keyword-like name is an operator
    operator_expected: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            operator_expected: false,
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.remaining().chars().nth(offset)
    }

    /// Advance by n bytes
    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if matches!(c, ' ' | '\t' | '\n' | '\r') {
                self.advance(1);
            } else {
                break;
            }
        }
    }

    /// Next non-whitespace character, without consuming anything
    fn lookahead(&self) -> Option<char> {
        self.remaining()
            .chars()
            .find(|c| !matches!(c, ' ' | '\t' | '\n' | '\r'))
    }

    fn lookahead_str(&self) -> &'a str {
        self.remaining().trim_start_matches([' ', '\t', '\n', '\r'])
    }

    /// Get the next token
    pub fn next_token(&mut self) -> XPathResult<Spanned> {
        self.skip_whitespace();
        let position = self.pos;
        let token = self.scan_token()?;
        self.operator_expected = !matches!(
            token,
            Token::At
                | Token::DoubleColon
                | Token::LeftParen
                | Token::LeftBracket
                | Token::Comma
                | Token::Dollar
                | Token::Eof
        ) && !token.is_operator();
        Ok(Spanned { token, position })
    }

    fn single(&mut self, token: Token) -> XPathResult<Token> {
        self.advance(1);
        Ok(token)
    }

    fn single_or_double(&mut self, second: char, double: Token, single: Token) -> XPathResult<Token> {
        self.advance(1);
        if self.peek() == Some(second) {
            self.advance(1);
            Ok(double)
        } else {
            Ok(single)
        }
    }

    fn scan_token(&mut self) -> XPathResult<Token> {
        let Some(c) = self.peek() else {
            return Ok(Token::Eof);
        };

        match c {
            '/' => self.single_or_double('/', Token::DoubleSlash, Token::Slash),
            '.' => {
                if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                    self.read_number()
                } else {
                    self.single_or_double('.', Token::DoubleDot, Token::Dot)
                }
            }
            '@' => self.single(Token::At),
            '|' => self.single(Token::Pipe),
            '+' => self.single(Token::Plus),
            '-' => self.single(Token::Minus),
            '*' => {
                if self.operator_expected {
                    self.single(Token::Multiply)
                } else {
                    self.single(Token::Star)
                }
            }
            '=' => self.single(Token::Eq),
            '!' => {
                if self.peek_at(1) == Some('=') {
                    self.advance(2);
                    Ok(Token::NotEq)
                } else {
                    Err(XPathError::syntax(self.pos, "expected `=` after `!`"))
                }
            }
            '<' => self.single_or_double('=', Token::LtEq, Token::Lt),
            '>' => self.single_or_double('=', Token::GtEq, Token::Gt),
            '(' => self.single(Token::LeftParen),
            ')' => self.single(Token::RightParen),
            '[' => self.single(Token::LeftBracket),
            ']' => self.single(Token::RightBracket),
            ',' => self.single(Token::Comma),
            '$' => self.single(Token::Dollar),
            ':' => {
                if self.peek_at(1) == Some(':') {
                    self.advance(2);
                    Ok(Token::DoubleColon)
                } else {
                    Err(XPathError::syntax(self.pos, "unexpected `:`"))
                }
            }
            '"' | '\'' => self.read_string(c),
            '0'..='9' => self.read_number(),
            _ if is_name_start_char(c) => self.read_name_or_keyword(),
            _ => Err(XPathError::syntax(
                self.pos,
                format!("unexpected character `{}`", c),
            )),
        }
    }

    fn read_number(&mut self) -> XPathResult<Token> {
        let start = self.pos;
        let bytes = self.input.as_bytes();
        let mut end = start;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        if end < bytes.len() && bytes[end] == b'.' {
            end += 1;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
        }
        self.pos = end;
        let text = &self.input[start..end];
        text.parse()
            .map(Token::Number)
            .map_err(|_| XPathError::syntax(start, format!("invalid number `{}`", text)))
    }

    fn read_string(&mut self, quote: char) -> XPathResult<Token> {
        let start = self.pos;
        self.advance(1);
        let body = self.remaining();
        match body.find(quote) {
            Some(len) => {
                let value = body[..len].to_string();
                self.advance(len + 1);
                Ok(Token::String(value))
            }
            None => Err(XPathError::syntax(start, "unterminated string literal")),
        }
    }

    fn read_ncname(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_name_char(c) {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }

    fn read_name_or_keyword(&mut self) -> XPathResult<Token> {
        let start = self.pos;
        let name = self.read_ncname();

        if self.operator_expected {
            return match name {
                "and" => Ok(Token::And),
                "or" => Ok(Token::Or),
                "mod" => Ok(Token::Mod),
                "div" => Ok(Token::Div),
                _ => Err(XPathError::syntax(
                    start,
                    format!("expected an operator, found `{}`", name),
                )),
            };
        }

        if self.lookahead_str().starts_with("::") {
            return Ok(Token::Axis(name.to_string()));
        }

        // prefix:local or prefix:*
        if self.peek() == Some(':') && self.peek_at(1) != Some(':') {
            self.advance(1);
            return match self.peek() {
                Some('*') => {
                    self.advance(1);
                    Ok(Token::NameTest(name.to_string()))
                }
                Some(c) if is_name_start_char(c) => {
                    let local = self.read_ncname();
                    let qname = format!("{}:{}", name, local);
                    if self.lookahead() == Some('(') {
                        Ok(Token::FunctionName(qname))
                    } else {
                        Ok(Token::Name(qname))
                    }
                }
                _ => Err(XPathError::syntax(
                    self.pos,
                    format!("expected a local name after `{}:`", name),
                )),
            };
        }

        if self.lookahead() == Some('(') {
            return Ok(match name {
                "node" | "text" | "comment" | "processing-instruction" => {
                    Token::NodeType(name.to_string())
                }
                _ => Token::FunctionName(name.to_string()),
            });
        }

        Ok(Token::Name(name.to_string()))
    }

    /// Tokenize entire input; the result always ends with `Eof`
    pub fn tokenize(mut self) -> XPathResult<Vec<Spanned>> {
        let mut tokens = Vec::new();
        loop {
            let spanned = self.next_token()?;
            let done = spanned.token == Token::Eof;
            tokens.push(spanned);
            if done {
                return Ok(tokens);
            }
        }
    }
}

fn is_name_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '\u{B7}')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_simple_path() {
        assert_eq!(
            tokens("/root/child"),
            vec![
                Token::Slash,
                Token::Name("root".into()),
                Token::Slash,
                Token::Name("child".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_predicate() {
        assert_eq!(
            tokens("item[@id='test']"),
            vec![
                Token::Name("item".into()),
                Token::LeftBracket,
                Token::At,
                Token::Name("id".into()),
                Token::Eq,
                Token::String("test".into()),
                Token::RightBracket,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_axis_and_node_type() {
        assert_eq!(
            tokens("child :: text()"),
            vec![
                Token::Axis("child".into()),
                Token::DoubleColon,
                Token::NodeType("text".into()),
                Token::LeftParen,
                Token::RightParen,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_star_and_keywords_by_position() {
        assert_eq!(
            tokens("* * 2"),
            vec![Token::Star, Token::Multiply, Token::Number(2.0), Token::Eof]
        );
        assert_eq!(
            tokens("and and or"),
            vec![
                Token::Name("and".into()),
                Token::And,
                Token::Name("or".into()),
                Token::Eof
            ]
        );
        assert_eq!(
            tokens("6 div 2"),
            vec![Token::Number(6.0), Token::Div, Token::Number(2.0), Token::Eof]
        );
    }

    #[test]
    fn test_qualified_names() {
        assert_eq!(
            tokens("p:item/p:*"),
            vec![
                Token::Name("p:item".into()),
                Token::Slash,
                Token::NameTest("p".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens(".5 + 1."),
            vec![
                Token::Number(0.5),
                Token::Plus,
                Token::Number(1.0),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_errors() {
        assert!(Lexer::new("'open").tokenize().is_err());
        assert!(Lexer::new("a ! b").tokenize().is_err());
        assert!(Lexer::new("#").tokenize().is_err());
        assert!(Lexer::new("a b").tokenize().is_err());
    }
}
