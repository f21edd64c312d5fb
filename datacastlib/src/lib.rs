//! # datacastlib
//!
//! Turn record collections into typed tables and encode them as csv, text,
//! json, spreadsheets or charts.
//!
//! ## Overview
//!
//! A request flows through three stages:
//!
//! - **Data** ([`data`]): flat records become a [`Table`] with typed columns,
//!   multi-level header paths and an optional row index
//! - **Transform** ([`transform`]): pivot, merge, sort, set-index and select
//!   produce new tables; inputs are never mutated
//! - **Output** ([`output`]): a [`FormatRegistry`] picks an [`Encoder`] for
//!   the requested format and turns the tables into bytes
//!
//! When a request yields several tables (split by a grouping field), the
//! [`envelope`] renders them as one document: stacked blocks for text,
//! one sheet per table for spreadsheets, one series per column for charts.
//!
//! ## Features
//!
//! - **Lossless headers**: hierarchical headers become stacked csv header
//!   rows that [`parse_delimited`] reads back
//! - **Explicit ambiguity**: undeclared fields, duplicate pivot cells and
//!   misaligned merges are errors unless a policy is chosen
//! - **Pure data types**: no I/O inside the library; callers fetch records
//!   and write bytes
//!
//! ## Example
//!
//! ```rust
//! use datacastlib::{Envelope, FormatRegistry, Pivot, Record, Transform};
//!
//! let records = vec![
//!     Record::new().with("date", "2020-01-01").with("site", "A").with("temp", 10),
//!     Record::new().with("date", "2020-01-01").with("site", "B").with("temp", 12),
//! ];
//!
//! let registry = FormatRegistry::with_defaults();
//! let encoded = Envelope::new(&registry)
//!     .transforms(vec![Transform::Pivot(Pivot::new("site", "temp").index("date"))])
//!     .render(&records, &["text/csv"])
//!     .unwrap();
//!
//! assert_eq!(encoded.content_type, "text/csv");
//! assert_eq!(encoded.bytes, b",A,B\n2020-01-01,10,12\n");
//! ```

pub mod config;
pub mod data;
pub mod envelope;
pub mod error;
pub mod output;
pub mod transform;

pub use config::{Config, FormatsConfig};
pub use data::{
    build, BuildOptions, Column, ColumnKind, HeaderPath, Record, RowIndex, Table, TableBuilder,
    TableEntry, TableSet, Value,
};
pub use envelope::Envelope;
pub use error::DatacastError;
pub use output::{
    parse_delimited, ChartOptions, Encoded, Encoder, FormatRegistry, JsonOptions, Registration,
};
pub use transform::{AggregationTable, JoinPolicy, Pivot, Transform, Transformer};

/// Result type for datacastlib operations.
pub type Result<T> = std::result::Result<T, DatacastError>;
