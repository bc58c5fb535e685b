//! Error types for detox-annotator.

use thiserror::Error;

/// Result type for annotation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for annotation operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A required raw-data column is absent from the source table.
    ///
    /// Fatal at load time: without the original or candidate text columns
    /// there is nothing to annotate.
    #[error("Schema error: {0}")]
    Schema(String),

    /// The source table has zero rows.
    #[error("Table has no rows")]
    EmptyTable,

    /// Row index outside the table bounds.
    ///
    /// Caller bug: the presentation layer is expected to stay within
    /// `0..len`.
    #[error("Index {index} out of range for table of {len} rows")]
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Number of rows in the table.
        len: usize,
    },

    /// The backing store could not be written (or replaced on disk).
    ///
    /// Recoverable: the in-memory state is left unchanged, so the caller
    /// may retry the operation.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Invalid input provided (unknown rating symbol, bad slot index).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The backing table could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a schema error.
    pub fn schema(msg: impl Into<String>) -> Self {
        Error::Schema(msg.into())
    }

    /// Create a persistence error.
    pub fn persistence(msg: impl Into<String>) -> Self {
        Error::Persistence(msg.into())
    }

    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }
}
