//! SQL rendering for provisioning statements.

use std::fmt;
use std::str::FromStr;

use crate::error::LoadError;
use crate::ingestion::provision::TableDefinition;
use crate::types::TableName;

/// SQL flavour of a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlDialect {
    /// Microsoft SQL Server (T-SQL).
    SqlServer,
    /// SQLite.
    #[default]
    Sqlite,
}

impl SqlDialect {
    /// Quote a single identifier.
    pub fn quote_ident(self, ident: &str) -> String {
        match self {
            SqlDialect::SqlServer => format!("[{}]", ident.replace(']', "]]")),
            SqlDialect::Sqlite => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }

    /// Quoted `schema.name`.
    pub fn qualified(self, table: &TableName) -> String {
        format!(
            "{}.{}",
            self.quote_ident(&table.schema),
            self.quote_ident(&table.name)
        )
    }

    /// Statement dropping `table` if it exists.
    pub fn drop_table_if_exists(self, table: &TableName) -> String {
        match self {
            SqlDialect::SqlServer => format!(
                "IF OBJECT_ID(N'{}', N'U') IS NOT NULL DROP TABLE {}",
                self.qualified(table).replace('\'', "''"),
                self.qualified(table)
            ),
            SqlDialect::Sqlite => format!("DROP TABLE IF EXISTS {}", self.qualified(table)),
        }
    }

    /// `CREATE TABLE` for `definition`.
    ///
    /// SQLite has no page compression, so the compression hint is only rendered for SQL Server.
    pub fn create_table(self, definition: &TableDefinition) -> String {
        let columns = definition
            .columns
            .iter()
            .map(|c| format!("{} {}", self.quote_ident(&c.name), c.sql_type))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!(
            "CREATE TABLE {} ({columns})",
            self.qualified(&definition.table)
        );
        if definition.page_compression && self == SqlDialect::SqlServer {
            sql.push_str(" WITH (DATA_COMPRESSION = PAGE)");
        }
        sql
    }
}

impl FromStr for SqlDialect {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlserver" | "mssql" | "tsql" => Ok(SqlDialect::SqlServer),
            "sqlite" => Ok(SqlDialect::Sqlite),
            _ => Err(LoadError::config(format!("unknown SQL dialect: {s}"))),
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlDialect::SqlServer => f.write_str("sqlserver"),
            SqlDialect::Sqlite => f.write_str("sqlite"),
        }
    }
}
