//! Strict Scanner with ScanHandler Trait
//!
//! Tokenizes the input and reports each token to a [`ScanHandler`] as spans
//! (byte offsets) rather than string copies. Unlike a recovering scanner,
//! any malformed markup stops the scan with a [`ParseError`] that carries
//! the byte offset where the problem was found.

use super::entities::check_reference;
use super::scanner::{is_name_start_char, Scanner};
use crate::error::ParseError;
use crate::index::Span;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Receives tokens from [`UnifiedScanner`]
///
/// Every callback may reject the token; the first error ends the scan.
pub trait ScanHandler {
    /// `attrs` holds `(name, value)` pairs, the value span excluding quotes
    fn start_element(
        &mut self,
        name: Span,
        attrs: &[(Span, Span)],
        is_empty: bool,
    ) -> Result<(), ParseError>;

    fn end_element(&mut self, name: Span) -> Result<(), ParseError>;

    /// `needs_entity_decode` is set when the text contains a reference
    fn text(&mut self, span: Span, needs_entity_decode: bool) -> Result<(), ParseError>;

    /// Content between `<![CDATA[` and `]]>`
    fn cdata(&mut self, span: Span) -> Result<(), ParseError>;

    /// Content between `<!--` and `-->`
    fn comment(&mut self, span: Span) -> Result<(), ParseError>;

    /// `content` covers the target and data, `target` just the target name
    fn processing_instruction(&mut self, target: Span, content: Span) -> Result<(), ParseError>;
}

pub struct UnifiedScanner<'a> {
    input: &'a [u8],
    scanner: Scanner<'a>,
    /// Reusable attribute buffer to avoid per-element allocations
    attrs_buf: Vec<(Span, Span)>,
}

impl<'a> UnifiedScanner<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        let mut scanner = Scanner::new(input);
        if input.starts_with(UTF8_BOM) {
            scanner.advance(UTF8_BOM.len());
        }
        Self {
            input,
            scanner,
            attrs_buf: Vec::with_capacity(8),
        }
    }

    /// Scan the entire document
    pub fn scan<H: ScanHandler>(&mut self, handler: &mut H) -> Result<(), ParseError> {
        while let Some(b) = self.scanner.peek() {
            if b == b'<' {
                self.scan_markup(handler)?;
            } else {
                self.scan_text(handler)?;
            }
        }
        Ok(())
    }

    fn error(&self, offset: usize, message: &str) -> ParseError {
        ParseError::malformed(offset, message)
    }

    fn scan_markup<H: ScanHandler>(&mut self, handler: &mut H) -> Result<(), ParseError> {
        let start = self.scanner.position();
        self.scanner.advance(1);

        match self.scanner.peek() {
            Some(b'/') => {
                self.scanner.advance(1);
                self.scan_end_tag(handler)
            }
            Some(b'!') => {
                if self.scanner.starts_with(b"!--") {
                    self.scanner.advance(3);
                    self.scan_comment(handler, start)
                } else if self.scanner.starts_with(b"![CDATA[") {
                    self.scanner.advance(8);
                    self.scan_cdata(handler, start)
                } else if self.scanner.starts_with(b"!DOCTYPE") {
                    self.scanner.advance(8);
                    self.skip_doctype(start)
                } else {
                    Err(self.error(start, "unsupported markup declaration"))
                }
            }
            Some(b'?') => {
                self.scanner.advance(1);
                self.scan_pi(handler, start)
            }
            Some(c) if is_name_start_char(c) => self.scan_start_tag(handler, start),
            Some(_) => Err(self.error(start + 1, "invalid character after '<'")),
            None => Err(self.error(start, "unexpected end of input after '<'")),
        }
    }

    fn scan_start_tag<H: ScanHandler>(
        &mut self,
        handler: &mut H,
        start: usize,
    ) -> Result<(), ParseError> {
        let (name_start, name_end) = self
            .scanner
            .read_name()
            .ok_or_else(|| self.error(start + 1, "expected element name"))?;
        let name_span = Span::between(name_start, name_end);

        self.attrs_buf.clear();
        loop {
            let skipped = self.scanner.skip_whitespace();
            match self.scanner.peek() {
                Some(b'>') => {
                    self.scanner.advance(1);
                    return handler.start_element(name_span, &self.attrs_buf, false);
                }
                Some(b'/') => {
                    if self.scanner.peek_at(1) != Some(b'>') {
                        return Err(self.error(self.scanner.position(), "expected '/>'"));
                    }
                    self.scanner.advance(2);
                    return handler.start_element(name_span, &self.attrs_buf, true);
                }
                Some(c) if is_name_start_char(c) => {
                    if skipped == 0 {
                        return Err(self.error(
                            self.scanner.position(),
                            "missing whitespace before attribute",
                        ));
                    }
                    let attr = self.scan_attribute()?;
                    self.attrs_buf.push(attr);
                }
                Some(_) => {
                    return Err(self.error(self.scanner.position(), "unexpected character in tag"))
                }
                None => return Err(self.error(start, "unterminated start tag")),
            }
        }
    }

    /// Scan `name = "value"`, returning (name_span, value_span)
    fn scan_attribute(&mut self) -> Result<(Span, Span), ParseError> {
        let attr_start = self.scanner.position();
        let (name_start, name_end) = self
            .scanner
            .read_name()
            .ok_or_else(|| self.error(attr_start, "expected attribute name"))?;

        self.scanner.skip_whitespace();
        if self.scanner.peek() != Some(b'=') {
            return Err(self.error(self.scanner.position(), "expected '=' after attribute name"));
        }
        self.scanner.advance(1);
        self.scanner.skip_whitespace();

        let quote = match self.scanner.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(self.error(self.scanner.position(), "expected quoted attribute value")),
        };
        self.scanner.advance(1);

        let value_start = self.scanner.position();
        let value_end = self
            .scanner
            .find_byte(quote)
            .ok_or_else(|| self.error(value_start, "unterminated attribute value"))?;
        let value = &self.input[value_start..value_end];
        if let Some(lt) = memchr::memchr(b'<', value) {
            return Err(self.error(value_start + lt, "'<' in attribute value"));
        }
        self.check_references(value, value_start)?;
        self.scanner.set_position(value_end + 1);

        Ok((
            Span::between(name_start, name_end),
            Span::between(value_start, value_end),
        ))
    }

    fn scan_end_tag<H: ScanHandler>(&mut self, handler: &mut H) -> Result<(), ParseError> {
        let name_pos = self.scanner.position();
        let (name_start, name_end) = self
            .scanner
            .read_name()
            .ok_or_else(|| self.error(name_pos, "expected element name in end tag"))?;
        self.scanner.skip_whitespace();
        if self.scanner.peek() != Some(b'>') {
            return Err(self.error(self.scanner.position(), "expected '>' to close end tag"));
        }
        self.scanner.advance(1);
        handler.end_element(Span::between(name_start, name_end))
    }

    fn scan_text<H: ScanHandler>(&mut self, handler: &mut H) -> Result<(), ParseError> {
        let start = self.scanner.position();
        let mut needs_decode = false;

        loop {
            match self.scanner.find_text_boundary() {
                Some(pos) if self.input[pos] == b'&' => {
                    let len = check_reference(&self.input[pos..])
                        .map_err(|message| self.error(pos, message))?;
                    needs_decode = true;
                    self.scanner.set_position(pos + len);
                }
                Some(pos) => {
                    self.scanner.set_position(pos);
                    break;
                }
                None => {
                    self.scanner.set_position(self.input.len());
                    break;
                }
            }
        }

        let end = self.scanner.position();
        if end > start {
            handler.text(Span::between(start, end), needs_decode)?;
        }
        Ok(())
    }

    fn scan_comment<H: ScanHandler>(
        &mut self,
        handler: &mut H,
        start: usize,
    ) -> Result<(), ParseError> {
        let content_start = self.scanner.position();
        let content_end = self
            .scanner
            .find_sequence(b"-->")
            .ok_or_else(|| self.error(start, "unterminated comment"))?;
        self.scanner.set_position(content_end + 3);
        handler.comment(Span::between(content_start, content_end))
    }

    fn scan_cdata<H: ScanHandler>(
        &mut self,
        handler: &mut H,
        start: usize,
    ) -> Result<(), ParseError> {
        let content_start = self.scanner.position();
        let content_end = self
            .scanner
            .find_sequence(b"]]>")
            .ok_or_else(|| self.error(start, "unterminated CDATA section"))?;
        self.scanner.set_position(content_end + 3);
        handler.cdata(Span::between(content_start, content_end))
    }

    /// Processing instruction; the XML declaration is consumed silently
    fn scan_pi<H: ScanHandler>(&mut self, handler: &mut H, start: usize) -> Result<(), ParseError> {
        let target_pos = self.scanner.position();
        let (target_start, target_end) = self
            .scanner
            .read_name()
            .ok_or_else(|| self.error(target_pos, "expected processing instruction target"))?;
        let end = self
            .scanner
            .find_sequence(b"?>")
            .ok_or_else(|| self.error(start, "unterminated processing instruction"))?;
        self.scanner.set_position(end + 2);

        if self.input[target_start..target_end].eq_ignore_ascii_case(b"xml") {
            if start != 0 && start != UTF8_BOM.len() {
                return Err(self.error(start, "XML declaration is only allowed at the start"));
            }
            return Ok(());
        }
        handler.processing_instruction(
            Span::between(target_start, target_end),
            Span::between(target_start, end),
        )
    }

    /// Skip a DOCTYPE, including any internal subset
    fn skip_doctype(&mut self, start: usize) -> Result<(), ParseError> {
        let mut depth = 0usize;
        let mut quote = None;
        while let Some(c) = self.scanner.peek() {
            self.scanner.advance(1);
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, b'"' | b'\'') => quote = Some(c),
                (None, b'[') => depth += 1,
                (None, b']') => depth = depth.saturating_sub(1),
                (None, b'>') if depth == 0 => return Ok(()),
                _ => {}
            }
        }
        Err(self.error(start, "unterminated DOCTYPE"))
    }

    fn check_references(&self, value: &[u8], base: usize) -> Result<(), ParseError> {
        let mut pos = 0;
        while let Some(amp) = memchr::memchr(b'&', &value[pos..]) {
            let at = pos + amp;
            let len = check_reference(&value[at..]).map_err(|message| self.error(base + at, message))?;
            pos = at + len;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Collects events as strings so assertions read like the input
    struct Recorder<'a> {
        input: &'a [u8],
        events: Vec<String>,
    }

    impl<'a> Recorder<'a> {
        fn new(input: &'a [u8]) -> Self {
            Self {
                input,
                events: Vec::new(),
            }
        }

        fn s(&self, span: Span) -> String {
            String::from_utf8_lossy(span.slice(self.input)).into_owned()
        }
    }

    impl ScanHandler for Recorder<'_> {
        fn start_element(
            &mut self,
            name: Span,
            attrs: &[(Span, Span)],
            is_empty: bool,
        ) -> Result<(), ParseError> {
            let mut event = format!("start {}", self.s(name));
            for (n, v) in attrs {
                event.push_str(&format!(" {}={}", self.s(*n), self.s(*v)));
            }
            if is_empty {
                event.push_str(" /");
            }
            self.events.push(event);
            Ok(())
        }

        fn end_element(&mut self, name: Span) -> Result<(), ParseError> {
            self.events.push(format!("end {}", self.s(name)));
            Ok(())
        }

        fn text(&mut self, span: Span, needs_decode: bool) -> Result<(), ParseError> {
            self.events
                .push(format!("text {} {}", self.s(span), needs_decode));
            Ok(())
        }

        fn cdata(&mut self, span: Span) -> Result<(), ParseError> {
            self.events.push(format!("cdata {}", self.s(span)));
            Ok(())
        }

        fn comment(&mut self, span: Span) -> Result<(), ParseError> {
            self.events.push(format!("comment {}", self.s(span)));
            Ok(())
        }

        fn processing_instruction(&mut self, target: Span, content: Span) -> Result<(), ParseError> {
            self.events
                .push(format!("pi {} [{}]", self.s(target), self.s(content)));
            Ok(())
        }
    }

    fn scan(input: &[u8]) -> Result<Vec<String>, ParseError> {
        let mut recorder = Recorder::new(input);
        UnifiedScanner::new(input).scan(&mut recorder)?;
        Ok(recorder.events)
    }

    #[test]
    fn test_elements_and_attributes() {
        let events = scan(b"<a x=\"1\" y='2'><b/></a>").unwrap();
        assert_eq!(events, vec!["start a x=1 y=2", "start b /", "end a"]);
    }

    #[test]
    fn test_text_and_entities() {
        let events = scan(b"<a>fish &amp; chips</a>").unwrap();
        assert_eq!(events[1], "text fish &amp; chips true");
    }

    #[test]
    fn test_comment_cdata_pi() {
        let events =
            scan(b"<?xml version=\"1.0\"?><!-- c --><a><![CDATA[<raw>]]><?app do it?></a>").unwrap();
        assert_eq!(
            events,
            vec!["comment  c ", "start a", "cdata <raw>", "pi app [app do it]", "end a"]
        );
    }

    #[test]
    fn test_doctype_skipped() {
        let events = scan(b"<!DOCTYPE a [<!ELEMENT a (#PCDATA)>]><a/>").unwrap();
        assert_eq!(events, vec!["start a /"]);
    }

    #[test]
    fn test_bom_skipped() {
        let events = scan(b"\xEF\xBB\xBF<?xml version=\"1.0\"?><a/>").unwrap();
        assert_eq!(events, vec!["start a /"]);
    }

    #[test]
    fn test_rejects_bad_markup() {
        for input in [
            &b"<1a/>"[..],
            b"<a",
            b"<a x=1/>",
            b"<a x=\"1\"y=\"2\"/>",
            b"<a x=\"<\"/>",
            b"<a><!-- open</a>",
            b"<a>&nbsp;</a>",
            b"<a></a >x</ a>",
        ] {
            let err = scan(input).unwrap_err();
            assert!(
                matches!(err, ParseError::Malformed { .. }),
                "{:?} gave {err}",
                String::from_utf8_lossy(input)
            );
        }
    }

    #[test]
    fn test_error_offset() {
        match scan(b"<a>x &bogus; y</a>").unwrap_err() {
            ParseError::Malformed { offset, .. } => assert_eq!(offset, 5),
            other => panic!("unexpected {other}"),
        }
    }
}
