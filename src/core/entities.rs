//! XML Entity Handling
//!
//! - Predefined entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//!
//! The scanner validates every reference up front with [`check_reference`],
//! so decoding here never fails. Uses Cow for zero-copy when no references
//! are present.

use memchr::memchr;
use std::borrow::Cow;

/// Decode entity and character references in text content.
#[inline]
pub fn decode_text(input: &str) -> Cow<'_, str> {
    if memchr(b'&', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }
    Cow::Owned(decode_references(input))
}

/// Attribute-value normalization followed by reference decoding.
///
/// Literal tab, CR and LF become spaces; a character reference such as
/// `&#10;` survives as the character it names.
pub fn normalize_attribute(input: &str) -> Cow<'_, str> {
    let bytes = input.as_bytes();
    let has_ws = bytes.iter().any(|b| matches!(b, b'\t' | b'\n' | b'\r'));
    if !has_ws {
        return decode_text(input);
    }
    let replaced: String = input
        .chars()
        .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
        .collect();
    Cow::Owned(decode_text(&replaced).into_owned())
}

fn decode_references(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = memchr(b'&', rest.as_bytes()) {
        result.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match memchr(b';', rest.as_bytes()).and_then(|semi| Some((semi, resolve(&rest[1..semi])?))) {
            Some((semi, decoded)) => {
                result.push(decoded);
                rest = &rest[semi + 1..];
            }
            None => {
                result.push('&');
                rest = &rest[1..];
            }
        }
    }
    result.push_str(rest);
    result
}

/// Resolve the body of a reference (between `&` and `;`)
fn resolve(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let digits = entity.strip_prefix('#')?;
            let codepoint = match digits.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse::<u32>().ok()?,
            };
            if !is_valid_xml_char(codepoint) {
                return None;
            }
            char::from_u32(codepoint)
        }
    }
}

/// Validate the reference starting at `input[0] == b'&'`.
///
/// Returns the length of the reference including `&` and `;`.
pub fn check_reference(input: &[u8]) -> Result<usize, &'static str> {
    let semi = memchr(b';', input).ok_or("unterminated entity reference")?;
    let body = std::str::from_utf8(&input[1..semi]).map_err(|_| "invalid entity reference")?;
    if body.is_empty() {
        return Err("empty entity reference");
    }
    if resolve(body).is_some() {
        return Ok(semi + 1);
    }
    if body.starts_with('#') {
        Err("invalid character reference")
    } else {
        Err("undeclared entity")
    }
}

/// Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
#[inline]
pub fn is_valid_xml_char(codepoint: u32) -> bool {
    matches!(codepoint,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_entities() {
        let result = decode_text("Hello, World!");
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result, "Hello, World!");
    }

    #[test]
    fn test_basic_entities() {
        let result = decode_text("&lt;hello&gt; &amp; &quot;world&quot;");
        assert_eq!(result, "<hello> & \"world\"");
    }

    #[test]
    fn test_numeric_references() {
        assert_eq!(decode_text("&#65;&#x42;&#67;"), "ABC");
        assert_eq!(decode_text("&#x1F600;"), "😀");
    }

    #[test]
    fn test_unknown_entity_kept() {
        assert_eq!(decode_text("&unknown; & more"), "&unknown; & more");
    }

    #[test]
    fn test_normalize_attribute() {
        assert_eq!(normalize_attribute("a\tb\nc"), "a b c");
        assert_eq!(normalize_attribute("line&#10;break"), "line\nbreak");
        assert!(matches!(normalize_attribute("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_check_reference() {
        assert_eq!(check_reference(b"&amp; tail"), Ok(5));
        assert_eq!(check_reference(b"&#x41;"), Ok(6));
        assert_eq!(check_reference(b"&nbsp;"), Err("undeclared entity"));
        assert_eq!(check_reference(b"&#0;"), Err("invalid character reference"));
        assert_eq!(check_reference(b"& loose"), Err("unterminated entity reference"));
    }
}
