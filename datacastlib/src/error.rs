//! Error types for datacastlib

use thiserror::Error;

/// Errors that can occur while building, reshaping or encoding tables.
///
/// Every variant carries enough context (column, field, row) to render a
/// diagnostic. Nothing is retried: the pipeline is deterministic.
#[derive(Error, Debug)]
pub enum DatacastError {
    /// A record holds a field outside the declared column set
    #[error("schema error: record {record} has undeclared field '{field}'")]
    Schema { field: String, record: usize },

    /// A record could not be read
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// A table invariant does not hold
    #[error("invalid table: {0}")]
    InvalidTable(String),

    /// Two columns share a header path
    #[error("duplicate column {0}")]
    DuplicateColumn(String),

    /// A referenced column does not exist
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// Pivot met the same (row, column) twice with no aggregation
    #[error("ambiguous pivot: row {row} has more than one value for column {column}; supply an aggregation")]
    AmbiguousPivot { row: String, column: String },

    /// An aggregation name is not registered
    #[error("unknown aggregation '{0}'")]
    UnknownAggregation(String),

    /// Merged tables have different row indices and no join policy
    #[error("alignment error: table '{table}' {message}")]
    Alignment { table: String, message: String },

    /// A chart encoder got a table it cannot plot
    #[error("unsupported table shape for {format}: {message}")]
    UnsupportedShape { format: String, message: String },

    /// No registered format matches and no default is configured
    #[error("unknown format: {0}")]
    UnknownFormat(String),

    /// A transform directive is malformed
    #[error("invalid transform directive: {0}")]
    InvalidDirective(String),

    /// The configuration could not be read
    #[error("invalid configuration: {0}")]
    Config(String),

    /// An underlying writer failed while encoding
    #[error("failed to encode {format}: {message}")]
    Encode { format: String, message: String },
}

impl DatacastError {
    /// Wrap a writer failure for `format`.
    pub(crate) fn encode(format: &str, err: impl std::fmt::Display) -> Self {
        DatacastError::Encode {
            format: format.to_string(),
            message: err.to_string(),
        }
    }
}
