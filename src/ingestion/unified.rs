//! Unified load entrypoint.
//!
//! Most callers should use [`load_from_path`], which loads a delimited file (or a zip archive
//! holding exactly one such file) into a destination table.
//!
//! - If [`LoadOptions::format`] is `None`, the source format is inferred from the file
//!   extension.
//! - If a [`super::observability::LoadObserver`] is configured, progress, success,
//!   failure and alerts are reported to it.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info_span;

use crate::destination::{BulkOptions, Destination, SqlDialect};
use crate::error::{LoadError, LoadResult};
use crate::types::{TableName, TemporalFormats, TypeSpec};

use super::archive;
use super::csv::{CsvOptions, RowStream};
use super::loader::{plan, run_load, LoadPlan};
use super::observability::{LoadContext, LoadObserver, LoadSeverity, LoadStats};

/// Default progress cadence, in rows.
pub const DEFAULT_PROGRESS_EVERY: u64 = 100_000;

/// Supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Delimited text.
    Csv,
    /// Zip archive containing exactly one delimited text file.
    Zip,
}

impl SourceFormat {
    /// Parse a source format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" | "tsv" | "txt" => Some(Self::Csv),
            "zip" => Some(Self::Zip),
            _ => None,
        }
    }
}

/// Options controlling a load.
///
/// Built with [`LoadOptions::new`]; the remaining fields start at their defaults and can be set
/// with struct update syntax.
#[derive(Clone)]
pub struct LoadOptions {
    /// Destination table (`schema.name`).
    pub table: TableName,
    /// One type code per header column.
    pub type_spec: TypeSpec,
    /// Delimiter, charset, skip rows and trimming.
    pub csv: CsvOptions,
    /// Create the destination table from the header before loading.
    pub create_table: bool,
    /// Drop an existing table before creating it (only with `create_table`).
    pub overwrite: bool,
    /// Take destination column names from the table catalog instead of the header.
    pub resolve_columns_from_table: bool,
    /// Date and timestamp formats.
    pub formats: TemporalFormats,
    /// If `None`, auto-detect format from file extension.
    pub format: Option<SourceFormat>,
    /// Report progress every this many rows; `0` disables progress reports.
    pub progress_every: u64,
    /// Bulk-copy channel options.
    pub bulk: BulkOptions,
    /// Optional observer for progress/logging/alerts.
    pub observer: Option<Arc<dyn LoadObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: LoadSeverity,
}

impl LoadOptions {
    pub fn new(table: TableName, type_spec: TypeSpec) -> Self {
        Self {
            table,
            type_spec,
            csv: CsvOptions::default(),
            create_table: false,
            overwrite: false,
            resolve_columns_from_table: false,
            formats: TemporalFormats::default(),
            format: None,
            progress_every: DEFAULT_PROGRESS_EVERY,
            bulk: BulkOptions::default(),
            observer: None,
            alert_at_or_above: LoadSeverity::Critical,
        }
    }
}

impl fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadOptions")
            .field("table", &self.table)
            .field("type_spec", &self.type_spec.to_string())
            .field("csv", &self.csv)
            .field("create_table", &self.create_table)
            .field("overwrite", &self.overwrite)
            .field("resolve_columns_from_table", &self.resolve_columns_from_table)
            .field("formats", &self.formats)
            .field("format", &self.format)
            .field("progress_every", &self.progress_every)
            .field("bulk", &self.bulk)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

/// Load the file at `path` into `destination`.
///
/// - If `options.format` is `None`, format is inferred from the file extension.
/// - Zip archives must contain exactly one entry; otherwise nothing is read.
///
/// When an observer is configured, this function reports:
///
/// - `on_progress` every `options.progress_every` rows
/// - `on_success` after commit, with row count and elapsed time
/// - `on_failure` on failure, with a computed severity
/// - `on_alert` on failure when the computed severity is >= `options.alert_at_or_above`
///
/// # Examples
///
/// ```no_run
/// use csv_bulk_loader::destination::SqliteDestination;
/// use csv_bulk_loader::ingestion::{load_from_path, LoadOptions};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut db = SqliteDestination::open("warehouse.db")?;
/// let options = LoadOptions {
///     create_table: true,
///     overwrite: true,
///     ..LoadOptions::new("main.people".parse()?, "isf".parse()?)
/// };
/// let stats = load_from_path("people.csv", &mut db, &options)?;
/// println!("rows={}", stats.rows);
/// # Ok(())
/// # }
/// ```
pub fn load_from_path<D: Destination>(
    path: impl AsRef<Path>,
    destination: &mut D,
    options: &LoadOptions,
) -> LoadResult<LoadStats> {
    let path = path.as_ref();
    let mut ctx = LoadContext {
        source: path.display().to_string(),
        format: options.format.unwrap_or(SourceFormat::Csv),
        table: options.table.clone(),
    };

    let result = resolve_format(path, options).and_then(|format| {
        ctx.format = format;
        open_and_load(path, destination, options, &ctx)
    });

    report(options, &ctx, &result);
    result
}

fn open_and_load<D: Destination>(
    path: &Path,
    destination: &mut D,
    options: &LoadOptions,
    ctx: &LoadContext,
) -> LoadResult<LoadStats> {
    match ctx.format {
        SourceFormat::Csv => load_stream(File::open(path)?, destination, options, ctx),
        SourceFormat::Zip => archive::with_single_entry(path, |entry| {
            load_stream(entry, destination, options, ctx)
        }),
    }
}

/// Load already-opened delimited text (not an archive) into `destination`.
///
/// `source` only labels observer events.
pub fn load_from_reader<R: Read, D: Destination>(
    reader: R,
    source: &str,
    destination: &mut D,
    options: &LoadOptions,
) -> LoadResult<LoadStats> {
    let ctx = LoadContext {
        source: source.to_string(),
        format: SourceFormat::Csv,
        table: options.table.clone(),
    };
    let result = load_stream(reader, destination, options, &ctx);
    report(options, &ctx, &result);
    result
}

/// Read the header of the file at `path` and describe the load without touching a database.
pub fn plan_from_path(
    path: impl AsRef<Path>,
    options: &LoadOptions,
    dialect: SqlDialect,
) -> LoadResult<LoadPlan> {
    let path = path.as_ref();
    match resolve_format(path, options)? {
        SourceFormat::Csv => plan_from_reader(File::open(path)?, options, dialect),
        SourceFormat::Zip => {
            archive::with_single_entry(path, |entry| plan_from_reader(entry, options, dialect))
        }
    }
}

/// Like [`plan_from_path`], for an already-opened delimited text stream.
pub fn plan_from_reader<R: Read>(
    reader: R,
    options: &LoadOptions,
    dialect: SqlDialect,
) -> LoadResult<LoadPlan> {
    let rows = RowStream::open(reader, options.type_spec.len(), &options.csv)?;
    plan(&rows, options, dialect)
}

fn load_stream<R: Read, D: Destination>(
    reader: R,
    destination: &mut D,
    options: &LoadOptions,
    ctx: &LoadContext,
) -> LoadResult<LoadStats> {
    let span = info_span!("load", source = %ctx.source, table = %ctx.table);
    let _enter = span.enter();

    let rows = RowStream::open(reader, options.type_spec.len(), &options.csv)?;
    run_load(rows, destination, options, ctx)
}

fn report(options: &LoadOptions, ctx: &LoadContext, result: &LoadResult<LoadStats>) {
    if let Some(obs) = options.observer.as_ref() {
        match result {
            Ok(stats) => obs.on_success(ctx, *stats),
            Err(e) => {
                let sev = severity_for_error(e);
                obs.on_failure(ctx, sev, e);
                if sev >= options.alert_at_or_above {
                    obs.on_alert(ctx, sev, e);
                }
            }
        }
    }
}

/// Severity used when reporting `e` to observers.
pub fn severity_for_error(e: &LoadError) -> LoadSeverity {
    match e {
        LoadError::Io(_) | LoadError::Archive(_) | LoadError::Destination { .. } => {
            LoadSeverity::Critical
        }
        LoadError::Csv(err) => match err.kind() {
            ::csv::ErrorKind::Io(_) => LoadSeverity::Critical,
            _ => LoadSeverity::Error,
        },
        LoadError::Config { .. }
        | LoadError::SchemaMismatch { .. }
        | LoadError::UnsupportedColumnType { .. }
        | LoadError::ReadRecord { .. }
        | LoadError::ParseError { .. } => LoadSeverity::Error,
    }
}

fn resolve_format(path: &Path, options: &LoadOptions) -> LoadResult<SourceFormat> {
    if let Some(format) = options.format {
        return Ok(format);
    }
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| {
            LoadError::config(format!(
                "cannot infer format: path has no extension ({})",
                path.display()
            ))
        })?;

    SourceFormat::from_extension(ext).ok_or_else(|| {
        LoadError::config(format!(
            "cannot infer format from extension '{ext}' for path ({})",
            path.display()
        ))
    })
}

/// Convenience helper for callers that want an owned request object.
#[derive(Clone)]
pub struct LoadRequest {
    /// Path to the input file.
    pub path: PathBuf,
    /// Options controlling the load.
    pub options: LoadOptions,
}

impl fmt::Debug for LoadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadRequest")
            .field("path", &self.path)
            .field("table", &self.options.table)
            .field("options", &self.options)
            .finish()
    }
}

impl LoadRequest {
    /// Execute the request by calling [`load_from_path`].
    pub fn run<D: Destination>(&self, destination: &mut D) -> LoadResult<LoadStats> {
        load_from_path(&self.path, destination, &self.options)
    }
}
