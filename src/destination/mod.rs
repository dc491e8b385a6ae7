//! Destination engines.
//!
//! The loader only talks to the database through [`Destination`]: a transaction, plain
//! statements for provisioning, a catalog lookup for column names, and a bulk-copy channel that
//! is bound once to a column list, accepts rows in order and reports the affected-row count
//! when finished.
//!
//! [`SqliteDestination`] is the bundled implementation.

pub mod dialect;
pub mod sqlite;

pub use dialect::SqlDialect;
pub use sqlite::SqliteDestination;

use crate::types::{TableName, Value};

/// Options for opening a bulk-copy channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkOptions {
    /// Hold a table-level lock for the duration of the load.
    pub table_lock: bool,
}

impl Default for BulkOptions {
    fn default() -> Self {
        Self { table_lock: true }
    }
}

/// A relational engine that can take a bulk load inside one transaction.
///
/// Calls arrive in this order for a successful load: `begin`, zero or more `execute`,
/// optionally `table_columns`, `open_bulk`, `send_row` per row, `finish_bulk`, `commit`. After
/// any failure past `begin` the loader calls `rollback` instead of continuing.
pub trait Destination {
    type Error: std::error::Error + Send + Sync + 'static;

    /// SQL dialect used to render provisioning statements.
    fn dialect(&self) -> SqlDialect;

    fn begin(&mut self) -> Result<(), Self::Error>;

    /// Execute a statement that returns no rows (DDL).
    fn execute(&mut self, sql: &str) -> Result<(), Self::Error>;

    /// Column names of `table` ordered by ordinal position; empty if the table does not exist.
    fn table_columns(&mut self, table: &TableName) -> Result<Vec<String>, Self::Error>;

    /// Bind a bulk-copy channel to `columns` of `table`.
    fn open_bulk(
        &mut self,
        table: &TableName,
        columns: &[String],
        options: BulkOptions,
    ) -> Result<(), Self::Error>;

    /// Send one row; values follow the column order given to [`Self::open_bulk`].
    fn send_row(&mut self, row: &[Value]) -> Result<(), Self::Error>;

    /// Close the channel and return the number of rows it wrote.
    fn finish_bulk(&mut self) -> Result<u64, Self::Error>;

    fn commit(&mut self) -> Result<(), Self::Error>;

    fn rollback(&mut self) -> Result<(), Self::Error>;
}
