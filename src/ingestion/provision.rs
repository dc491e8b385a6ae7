//! Destination table creation.
//!
//! The table is built from the non-skip header columns, typed by their type codes. Provisioning
//! runs inside the load transaction, so a failed load also discards a freshly created table.

use tracing::info;

use crate::destination::{Destination, SqlDialect};
use crate::error::{LoadError, LoadResult, LoadStage};
use crate::types::{ColumnSpec, FieldType, TableName};

/// One column of a table to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub sql_type: &'static str,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, sql_type: &'static str) -> Self {
        Self {
            name: name.into(),
            sql_type,
        }
    }
}

/// A table to create from the header and type specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    pub table: TableName,
    pub columns: Vec<ColumnDefinition>,
    /// Request page-level storage compression where the dialect supports it.
    pub page_compression: bool,
}

impl TableDefinition {
    /// Build the definition for `columns`, skipping `skip` codes.
    ///
    /// Fails before any statement is produced if a column uses a type code without a schema
    /// type (money).
    pub fn from_columns(table: &TableName, columns: &[ColumnSpec]) -> LoadResult<Self> {
        let columns = columns
            .iter()
            .filter(|c| !c.field_type.is_skip())
            .map(|c| {
                c.field_type
                    .sql_type()
                    .map(|t| ColumnDefinition::new(c.name.clone(), t))
                    .ok_or_else(|| LoadError::UnsupportedColumnType {
                        column: c.name.clone(),
                        code: c.field_type.code(),
                    })
            })
            .collect::<LoadResult<Vec<_>>>()?;

        if columns.is_empty() {
            return Err(LoadError::SchemaMismatch {
                message: "no columns to create (every field type is skip)".to_string(),
            });
        }

        Ok(Self {
            table: table.clone(),
            columns,
            page_compression: true,
        })
    }
}

/// Statements that provision `definition`, in execution order.
pub fn provisioning_statements(
    dialect: SqlDialect,
    definition: &TableDefinition,
    overwrite: bool,
) -> Vec<String> {
    let mut statements = Vec::with_capacity(2);
    if overwrite {
        statements.push(dialect.drop_table_if_exists(&definition.table));
    }
    statements.push(dialect.create_table(definition));
    statements
}

/// Drop (when `overwrite` is set) and create the destination table.
///
/// Must run inside an open transaction on `destination`.
pub fn provision_table<D: Destination>(
    destination: &mut D,
    definition: &TableDefinition,
    overwrite: bool,
) -> LoadResult<()> {
    for sql in provisioning_statements(destination.dialect(), definition, overwrite) {
        destination
            .execute(&sql)
            .map_err(LoadError::destination(LoadStage::Provision))?;
    }
    info!(
        table = %definition.table,
        columns = definition.columns.len(),
        overwrite,
        "table provisioned"
    );
    Ok(())
}

/// True if any loaded column uses the money code.
pub(crate) fn has_money_column(columns: &[ColumnSpec]) -> bool {
    columns.iter().any(|c| c.field_type == FieldType::Money)
}
