//! Output encoding: turn table sets into documents.
//!
//! This module handles the final stage of the pipeline - encoding a
//! [`TableSet`] into bytes for one wire format. It provides:
//!
//! - **Encoder**: The capability every format implements (`encode(TableSet) -> bytes`)
//! - **FormatRegistry**: Maps requested format ids or content types to encoders
//! - **Encoders**: csv, txt, json, xlsx, xls, png, svg
//!
//! Encoders are deterministic and all-or-nothing: they return a complete
//! document or an error, never a partial one. Empty tables always encode.
//!
//! ## Example
//!
//! ```rust
//! use datacastlib::data::{build, Record, TableSet};
//! use datacastlib::output::FormatRegistry;
//!
//! let table = build(&[Record::new().with("a", 1)], None).unwrap();
//! let registry = FormatRegistry::with_defaults();
//! let encoded = registry
//!     .resolve(&["json"])
//!     .unwrap()
//!     .encode(&TableSet::single(table))
//!     .unwrap();
//! assert_eq!(encoded.content_type, "application/json");
//! ```

pub mod chart;
pub mod delimited;
pub mod json;
pub mod registry;
pub mod text;
pub mod xls;
pub mod xlsx;

pub use chart::{ChartEncoder, ChartKind, ChartOptions};
pub use delimited::{parse_delimited, CsvEncoder};
pub use json::{JsonEncoder, JsonOptions};
pub use registry::{accept_tokens, FormatRegistry, Registration};
pub use text::TextEncoder;
pub use xls::XlsEncoder;
pub use xlsx::XlsxEncoder;

use std::fmt;

use crate::data::TableSet;
use crate::Result;

pub const CSV: &str = "text/csv";
pub const TXT: &str = "text/plain";
pub const JSON: &str = "application/json";
pub const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const XLS: &str = "application/vnd.ms-excel";
pub const PNG: &str = "image/png";
pub const SVG: &str = "image/svg+xml";

/// An encoded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    /// Content type of `bytes`
    pub content_type: String,
    /// The document
    pub bytes: Vec<u8>,
}

impl Encoded {
    pub(crate) fn new(content_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            content_type: content_type.to_string(),
            bytes,
        }
    }
}

/// Encodes table sets into one output format.
///
/// Implementations are shared across requests, so they hold only
/// configuration and must be `Send + Sync`.
pub trait Encoder: fmt::Debug + Send + Sync {
    /// Short format identifier (`csv`, `json`, ...)
    fn format_id(&self) -> &str;

    /// Content type of the produced documents
    fn content_type(&self) -> &str;

    /// Encode every table of `tables` into one document.
    fn encode(&self, tables: &TableSet) -> Result<Encoded>;
}

/// Escape text for XML attribute and element content.
///
/// Characters XML 1.0 cannot carry at all (most C0 controls, U+FFFE and
/// U+FFFF) become U+FFFD.
pub(crate) fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(ch),
            '\u{0}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}' => out.push(char::REPLACEMENT_CHARACTER),
            _ => out.push(ch),
        }
    }
    out
}
