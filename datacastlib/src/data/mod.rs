//! Data model and table construction.
//!
//! This module handles the first stage of the pipeline - turning flat
//! records into the canonical table representation. It provides:
//!
//! - **Values**: Scalar cells with a missing-marker and kind inference
//! - **Records**: Immutable ordered field mappings (the input unit)
//! - **Tables**: Typed columns with multi-level header paths and an optional row index
//! - **Building**: `TableBuilder` with declared/permissive schemas and table splitting
//!
//! ## Example
//!
//! ```rust
//! use datacastlib::data::{build, Record, Value};
//!
//! let records = vec![
//!     Record::new().with("site", "A").with("temp", 10),
//!     Record::new().with("site", "B").with("temp", Value::Missing),
//! ];
//! let table = build(&records, None).unwrap();
//! assert_eq!(table.row_count(), 2);
//! ```

pub mod builder;
pub mod record;
pub mod table;
pub mod value;

pub use builder::{build, BuildOptions, TableBuilder};
pub use record::Record;
pub use table::{Column, HeaderPath, RowIndex, Table, TableEntry, TableSet};
pub use value::{infer_kind, parse_timestamp, ColumnKind, Value};
