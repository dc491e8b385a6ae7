//! SQLite destination backed by `rusqlite`.
//!
//! The transaction is opened with `BEGIN IMMEDIATE`, which takes the database write lock up
//! front; that lock covers the table-lock request of a bulk load. The bulk-copy channel is a
//! cached prepared `INSERT` bound to the resolved column list.

use std::path::Path;

use rusqlite::types::{ToSqlOutput, Value as SqlValue};
use rusqlite::{params_from_iter, Connection, ToSql};
use thiserror::Error;
use tracing::debug;

use super::{BulkOptions, Destination, SqlDialect};
use crate::types::{TableName, Value};

/// Errors raised by [`SqliteDestination`].
#[derive(Debug, Error)]
pub enum SqliteDestinationError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("no bulk-copy channel is open")]
    NoBulkChannel,

    #[error("row has {got} values but the bulk-copy channel is bound to {expected} columns")]
    RowWidth { expected: usize, got: usize },
}

struct BulkChannel {
    sql: String,
    width: usize,
    rows: u64,
}

/// A SQLite database used as a load destination.
///
/// Tables are addressed as `schema.name`, where `schema` is a SQLite database name such as
/// `main`, `temp` or an attached database.
pub struct SqliteDestination {
    conn: Connection,
    bulk: Option<BulkChannel>,
}

impl SqliteDestination {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> rusqlite::Result<Self> {
        Ok(Self::from_connection(Connection::open(path)?))
    }

    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn, bulk: None }
    }

    /// The underlying connection, for queries outside a load.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Destination for SqliteDestination {
    type Error = SqliteDestinationError;

    fn dialect(&self) -> SqlDialect {
        SqlDialect::Sqlite
    }

    fn begin(&mut self) -> Result<(), Self::Error> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn execute(&mut self, sql: &str) -> Result<(), Self::Error> {
        debug!(sql, "execute");
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn table_columns(&mut self, table: &TableName) -> Result<Vec<String>, Self::Error> {
        let dialect = self.dialect();
        let sql = format!(
            "PRAGMA {}.table_info({})",
            dialect.quote_ident(&table.schema),
            dialect.quote_ident(&table.name)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut columns = stmt
            .query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        columns.sort_by_key(|(cid, _)| *cid);
        Ok(columns.into_iter().map(|(_, name)| name).collect())
    }

    fn open_bulk(
        &mut self,
        table: &TableName,
        columns: &[String],
        options: BulkOptions,
    ) -> Result<(), Self::Error> {
        let dialect = self.dialect();
        let names = columns
            .iter()
            .map(|c| dialect.quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({names}) VALUES ({placeholders})",
            dialect.qualified(table)
        );

        // Prepare now so a bad table or column list fails before the first row.
        self.conn.prepare_cached(&sql)?;
        debug!(%sql, table_lock = options.table_lock, "bulk channel open");

        self.bulk = Some(BulkChannel {
            sql,
            width: columns.len(),
            rows: 0,
        });
        Ok(())
    }

    fn send_row(&mut self, row: &[Value]) -> Result<(), Self::Error> {
        let channel = self
            .bulk
            .as_mut()
            .ok_or(SqliteDestinationError::NoBulkChannel)?;
        if row.len() != channel.width {
            return Err(SqliteDestinationError::RowWidth {
                expected: channel.width,
                got: row.len(),
            });
        }
        let mut stmt = self.conn.prepare_cached(&channel.sql)?;
        channel.rows += stmt.execute(params_from_iter(row.iter()))? as u64;
        Ok(())
    }

    fn finish_bulk(&mut self) -> Result<u64, Self::Error> {
        let channel = self
            .bulk
            .take()
            .ok_or(SqliteDestinationError::NoBulkChannel)?;
        Ok(channel.rows)
    }

    fn commit(&mut self) -> Result<(), Self::Error> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), Self::Error> {
        self.bulk = None;
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Int64(v) => ToSqlOutput::from(*v),
            Value::Float64(v) => ToSqlOutput::from(*v),
            Value::Utf8(s) => ToSqlOutput::from(s.as_str()),
            Value::Date(d) => ToSqlOutput::from(d.format("%Y-%m-%d").to_string()),
            Value::Timestamp(ts) => {
                ToSqlOutput::from(ts.format("%Y-%m-%d %H:%M:%S%.f").to_string())
            }
        })
    }
}
