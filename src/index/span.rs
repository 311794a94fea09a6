//! Span - offset and length into original input
//!
//! Zero-copy reference to a portion of the input document.
//! Used for element names, attribute names/values, and text content.

/// A span referencing a portion of the input document.
///
/// Documents are limited to `u32::MAX` bytes, so both fields fit in 4 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Byte offset into the original input
    pub offset: u32,
    /// Length in bytes
    pub len: u32,
}

impl Span {
    #[inline]
    pub const fn new(offset: u32, len: u32) -> Self {
        Self { offset, len }
    }

    /// Span covering `start..end`; callers guarantee the input fits in `u32`
    #[inline]
    pub const fn between(start: usize, end: usize) -> Self {
        Self {
            offset: start as u32,
            len: (end - start) as u32,
        }
    }

    /// Used for "no value"
    #[inline]
    pub const fn empty() -> Self {
        Self { offset: 0, len: 0 }
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Exclusive end offset
    #[inline]
    pub const fn end(&self) -> u32 {
        self.offset.saturating_add(self.len)
    }

    #[inline]
    pub fn slice<'a>(&self, input: &'a [u8]) -> &'a [u8] {
        input
            .get(self.offset as usize..self.end() as usize)
            .unwrap_or_default()
    }

    /// The spanned text. Spans produced by the scanner always fall on
    /// character boundaries, so this only yields "" for a foreign span.
    #[inline]
    pub fn as_str<'a>(&self, input: &'a str) -> &'a str {
        input
            .get(self.offset as usize..self.end() as usize)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_basic() {
        let span = Span::new(5, 10);
        assert_eq!(span.end(), 15);
        assert!(!span.is_empty());
        assert!(Span::empty().is_empty());
    }

    #[test]
    fn test_span_between() {
        assert_eq!(Span::between(3, 8), Span::new(3, 5));
    }

    #[test]
    fn test_span_slice_and_str() {
        let input = "hello world";
        let span = Span::new(6, 5);
        assert_eq!(span.slice(input.as_bytes()), b"world");
        assert_eq!(span.as_str(input), "world");
    }

    #[test]
    fn test_span_out_of_range() {
        let span = Span::new(8, 10);
        assert_eq!(span.as_str("short"), "");
        assert!(span.slice(b"short").is_empty());
    }
}
