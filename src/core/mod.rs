//! Core XML parsing primitives
//!
//! - Scanner: SIMD-accelerated delimiter detection using memchr
//! - Entities: reference validation and decoding with Cow (zero-copy when possible)
//! - UnifiedScanner: strict ScanHandler-based tokenizer feeding the index builder

pub mod entities;
pub mod scanner;
pub mod unified_scanner;
