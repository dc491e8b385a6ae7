//! Transactional bulk load.
//!
//! A load moves through `begin → provision (optional) → prepare → stream → finalize → commit`.
//! Any failure after `begin` rolls the transaction back and ends the run with that error. A
//! failed commit is reported as is; the engine has already decided the outcome, so no rollback
//! is attempted after it.

use std::io::Read;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::destination::{Destination, SqlDialect};
use crate::error::{LoadError, LoadResult, LoadStage};
use crate::types::ColumnSpec;

use super::csv::{coerce_record, RowStream};
use super::observability::{LoadContext, LoadStats};
use super::provision::{has_money_column, provision_table, provisioning_statements, TableDefinition};
use super::schema::{column_specs, header_column_names, loaded_columns, resolve_destination_columns};
use super::unified::LoadOptions;

/// Stream the records of `rows` into `destination` inside one transaction.
///
/// Returns the affected-row count reported by the destination when the bulk channel closes.
pub fn run_load<R, D>(
    rows: RowStream<R>,
    destination: &mut D,
    options: &LoadOptions,
    ctx: &LoadContext,
) -> LoadResult<LoadStats>
where
    R: Read,
    D: Destination,
{
    let specs = column_specs(rows.header(), &options.type_spec)?;
    let loaded = loaded_columns(&specs);
    let definition = if options.create_table {
        Some(TableDefinition::from_columns(&options.table, &specs)?)
    } else {
        if options.overwrite {
            warn!("overwrite has no effect unless table creation is requested");
        }
        None
    };
    if has_money_column(&loaded) {
        warn!("money columns cannot be coerced; any non-empty value will fail the load");
    }

    let started = Instant::now();
    destination
        .begin()
        .map_err(LoadError::destination(LoadStage::Begin))?;
    debug!("transaction started");

    let outcome = load_in_transaction(
        rows,
        destination,
        options,
        ctx,
        &specs,
        &loaded,
        definition.as_ref(),
    );

    let affected = match outcome {
        Ok(affected) => affected,
        Err(e) => {
            warn!(error = %e, "load failed, rolling back");
            if let Err(rb) = destination.rollback() {
                warn!(error = %rb, "rollback failed");
            }
            return Err(e);
        }
    };

    destination
        .commit()
        .map_err(LoadError::destination(LoadStage::Commit))?;

    let stats = LoadStats {
        rows: affected,
        elapsed: started.elapsed(),
    };
    info!(
        rows = stats.rows,
        elapsed_ms = stats.elapsed.as_millis() as u64,
        rows_per_sec = stats.rows_per_second() as u64,
        "load committed"
    );
    Ok(stats)
}

fn load_in_transaction<R, D>(
    rows: RowStream<R>,
    destination: &mut D,
    options: &LoadOptions,
    ctx: &LoadContext,
    specs: &[ColumnSpec],
    loaded: &[ColumnSpec],
    definition: Option<&TableDefinition>,
) -> LoadResult<u64>
where
    R: Read,
    D: Destination,
{
    if let Some(definition) = definition {
        provision_table(destination, definition, options.overwrite)?;
    }

    let columns = resolve_destination_columns(
        destination,
        &options.table,
        specs,
        options.resolve_columns_from_table,
    )?;
    destination
        .open_bulk(&options.table, &columns, options.bulk)
        .map_err(LoadError::destination(LoadStage::Prepare))?;

    let mut sent: u64 = 0;
    for record in rows {
        let record = record?;
        let row = coerce_record(&record, loaded, &options.formats)?;
        destination
            .send_row(&row)
            .map_err(LoadError::destination(LoadStage::Stream))?;
        sent += 1;

        if options.progress_every > 0 && sent % options.progress_every == 0 {
            debug!(rows = sent, "progress");
            if let Some(observer) = options.observer.as_ref() {
                observer.on_progress(ctx, sent);
            }
        }
    }

    let affected = destination
        .finish_bulk()
        .map_err(LoadError::destination(LoadStage::Finalize))?;
    if affected != sent {
        warn!(sent, affected, "destination reported a different row count than was sent");
    }
    Ok(affected)
}

/// What a load would do, computed from the header alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadPlan {
    /// Header columns paired with their type codes.
    pub columns: Vec<ColumnSpec>,
    /// Column list the bulk channel would bind to (header-derived).
    pub destination_columns: Vec<String>,
    /// Provisioning statements, empty when table creation is not requested.
    pub statements: Vec<String>,
}

/// Build the [`LoadPlan`] for the header of `rows`.
pub fn plan<R: Read>(
    rows: &RowStream<R>,
    options: &LoadOptions,
    dialect: SqlDialect,
) -> LoadResult<LoadPlan> {
    let columns = column_specs(rows.header(), &options.type_spec)?;
    let statements = if options.create_table {
        let definition = TableDefinition::from_columns(&options.table, &columns)?;
        provisioning_statements(dialect, &definition, options.overwrite)
    } else {
        Vec::new()
    };
    let destination_columns = header_column_names(&columns);
    Ok(LoadPlan {
        columns,
        destination_columns,
        statements,
    })
}
