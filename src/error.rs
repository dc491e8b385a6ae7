use std::fmt;

use thiserror::Error;

/// Convenience result type for load operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Boxed error returned by a [`crate::destination::Destination`] implementation.
pub type DestinationError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Stage of the transactional load in which a destination call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    /// Opening the transaction.
    Begin,
    /// Dropping/creating the destination table.
    Provision,
    /// Reading the destination catalog for column names.
    ResolveColumns,
    /// Opening the bulk-copy channel.
    Prepare,
    /// Sending a row through the bulk-copy channel.
    Stream,
    /// Closing the bulk-copy channel.
    Finalize,
    /// Committing the transaction.
    Commit,
    /// Rolling back after an earlier failure.
    Rollback,
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoadStage::Begin => "start transaction",
            LoadStage::Provision => "create table",
            LoadStage::ResolveColumns => "get column names from database",
            LoadStage::Prepare => "prepare statement",
            LoadStage::Stream => "execute statement",
            LoadStage::Finalize => "finalize bulk copy",
            LoadStage::Commit => "commit",
            LoadStage::Rollback => "rollback",
        };
        f.write_str(s)
    }
}

/// Error type returned by load functions.
///
/// This is a single error enum shared by the source pipeline (decoding, parsing, coercion) and
/// the destination side (provisioning, bulk copy, commit).
#[derive(Debug, Error)]
pub enum LoadError {
    /// Underlying I/O error (e.g. file not found, permission denied, truncated input).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// The zip archive or its entry could not be opened.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Invalid run configuration (unknown charset or type code, bad table name, length mismatch).
    #[error("configuration error: {message}")]
    Config { message: String },

    /// The file and the destination disagree about the column layout.
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A column's type code has no schema type the table can be created with.
    #[error("unsupported column type '{code}' for column '{column}' (cannot create table)")]
    UnsupportedColumnType { column: String, code: char },

    /// A data record could not be read (e.g. wrong number of fields).
    #[error("read record at row {row}: {message}")]
    ReadRecord { row: u64, message: String },

    /// A value could not be coerced into the column's type.
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    ParseError {
        row: u64,
        column: String,
        raw: String,
        message: String,
    },

    /// The destination engine rejected an operation.
    #[error("{stage}: {source}")]
    Destination {
        stage: LoadStage,
        #[source]
        source: DestinationError,
    },
}

impl LoadError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        LoadError::Config {
            message: message.into(),
        }
    }

    pub(crate) fn destination<E>(stage: LoadStage) -> impl FnOnce(E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        move |e| LoadError::Destination {
            stage,
            source: Box::new(e),
        }
    }
}
