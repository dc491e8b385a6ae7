//! Column specs and destination column resolution.

use tracing::info;

use crate::destination::Destination;
use crate::error::{LoadError, LoadResult, LoadStage};
use crate::types::{ColumnSpec, TableName, TypeSpec};

/// Pair every header column with its type code.
///
/// The type specification must have exactly one code per header column.
pub fn column_specs(header: &[String], spec: &TypeSpec) -> LoadResult<Vec<ColumnSpec>> {
    if header.len() != spec.len() {
        return Err(LoadError::config(format!(
            "type specification has {} codes but header has {} columns",
            spec.len(),
            header.len()
        )));
    }
    Ok(header
        .iter()
        .zip(spec.fields())
        .enumerate()
        .map(|(position, (name, ft))| ColumnSpec::new(position, *ft, name.clone()))
        .collect())
}

/// The columns that take part in the destination row, in header order.
pub fn loaded_columns(specs: &[ColumnSpec]) -> Vec<ColumnSpec> {
    specs
        .iter()
        .filter(|c| !c.field_type.is_skip())
        .cloned()
        .collect()
}

/// Destination column names taken from the header (non-skip columns, header order).
pub fn header_column_names(specs: &[ColumnSpec]) -> Vec<String> {
    specs
        .iter()
        .filter(|c| !c.field_type.is_skip())
        .map(|c| c.name.clone())
        .collect()
}

/// Decide the column list the bulk-copy channel binds to.
///
/// With `from_table` unset the list is [`header_column_names`]. With it set the header names are
/// ignored and the destination catalog's columns are used in ordinal order; their count must
/// match the number of loaded columns. An empty list is an error either way.
pub fn resolve_destination_columns<D: Destination>(
    destination: &mut D,
    table: &TableName,
    specs: &[ColumnSpec],
    from_table: bool,
) -> LoadResult<Vec<String>> {
    let columns = if from_table {
        let columns = destination
            .table_columns(table)
            .map_err(LoadError::destination(LoadStage::ResolveColumns))?;
        let loaded = specs.iter().filter(|c| !c.field_type.is_skip()).count();
        if !columns.is_empty() && columns.len() != loaded {
            return Err(LoadError::SchemaMismatch {
                message: format!(
                    "table {table} has {} columns but the type specification loads {loaded}",
                    columns.len()
                ),
            });
        }
        columns
    } else {
        header_column_names(specs)
    };

    if columns.is_empty() {
        return Err(LoadError::SchemaMismatch {
            message: "no columns to process (check table name or field types)".to_string(),
        });
    }

    info!(table = %table, columns = ?columns, from_table, "destination columns resolved");
    Ok(columns)
}
