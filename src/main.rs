use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use csv_bulk_loader::destination::{SqlDialect, SqliteDestination};
use csv_bulk_loader::ingestion::{
    load_from_path, plan_from_path, Charset, CompositeObserver, CsvOptions, Delimiter,
    FileObserver, LoadOptions, SourceFormat, StdErrObserver,
    DEFAULT_PROGRESS_EVERY,
};
use csv_bulk_loader::types::{TableName, TemporalFormats, TypeSpec};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Zip,
}

impl From<FormatArg> for SourceFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Csv => SourceFormat::Csv,
            FormatArg::Zip => SourceFormat::Zip,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "csv-bulk-loader", version)]
#[command(about = "Bulk CSV file uploader into a relational table")]
struct Args {
    /// CSV file path (or a zip archive holding exactly one CSV file)
    #[arg(long)]
    filepath: PathBuf,

    /// SQLite database file (created if missing)
    #[arg(long, required_unless_present = "dry_run")]
    database: Option<PathBuf>,

    /// Table name in schema.name format (e.g. main.people)
    #[arg(long)]
    table: TableName,

    /// List of field types in [ isfmdtw]+ format, one per header column
    #[arg(long)]
    fields: TypeSpec,

    /// CSV file comma character (use 't' for tabs)
    #[arg(long, default_value = ",")]
    comma: Delimiter,

    /// Create table
    #[arg(long)]
    create: bool,

    /// Overwrite existing table (with --create)
    #[arg(long)]
    overwrite: bool,

    /// CSV file charset ("utf8", "win1251")
    #[arg(long, default_value = "utf8")]
    encoding: Charset,

    /// Number of rows to skip before reading the CSV header
    #[arg(long, default_value_t = 0)]
    skiprows: usize,

    /// Date format (chrono strftime)
    #[arg(long, default_value = "%d.%m.%Y")]
    dateformat: String,

    /// Timestamp format (chrono strftime)
    #[arg(long, default_value = "%d.%m.%Y %H:%M:%S")]
    timestampformat: String,

    /// Timestamp-without-seconds format (chrono strftime)
    #[arg(long = "timestampformat-short", default_value = "%d.%m.%Y %H:%M")]
    timestampformat_short: String,

    /// Insert into a table with unknown column names (use the table's column order)
    #[arg(long)]
    unknowncolumnnames: bool,

    /// Strip leading whitespace from every field
    #[arg(long)]
    trim_leading_space: bool,

    /// Force the input format instead of inferring it from the extension
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Report progress every N rows (0 disables)
    #[arg(long, default_value_t = DEFAULT_PROGRESS_EVERY)]
    progress_every: u64,

    /// Append load events to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print the column list and table DDL without loading
    #[arg(long)]
    dry_run: bool,

    /// SQL dialect used for --dry-run output ("sqlite", "sqlserver")
    #[arg(long, default_value = "sqlite")]
    dialect: SqlDialect,
}

impl Args {
    fn load_options(&self) -> LoadOptions {
        let mut observer = CompositeObserver::default().with(Arc::new(StdErrObserver));
        if let Some(path) = &self.log_file {
            observer = observer.with(Arc::new(FileObserver::new(path)));
        }

        LoadOptions {
            csv: CsvOptions {
                delimiter: self.comma,
                charset: self.encoding,
                skip_rows: self.skiprows,
                trim_leading_space: self.trim_leading_space,
            },
            create_table: self.create,
            overwrite: self.overwrite,
            resolve_columns_from_table: self.unknowncolumnnames,
            formats: TemporalFormats {
                date: self.dateformat.clone(),
                timestamp: self.timestampformat.clone(),
                timestamp_without_seconds: self.timestampformat_short.clone(),
            },
            format: self.format.map(SourceFormat::from),
            progress_every: self.progress_every,
            observer: Some(Arc::new(observer)),
            ..LoadOptions::new(self.table.clone(), self.fields.clone())
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let options = args.load_options();

    if args.dry_run {
        let plan = plan_from_path(&args.filepath, &options, args.dialect)?;
        println!("-- columns: {}", plan.destination_columns.join(", "));
        for sql in &plan.statements {
            println!("{sql};");
        }
        return Ok(());
    }

    let database = args
        .database
        .as_ref()
        .context("--database is required unless --dry-run is set")?;
    let mut db = SqliteDestination::open(database)
        .with_context(|| format!("open database {}", database.display()))?;

    info!(file = %args.filepath.display(), table = %args.table, "loading");
    let stats = load_from_path(&args.filepath, &mut db, &options)?;
    info!(rows = stats.rows, elapsed_ms = stats.elapsed.as_millis() as u64, "done");
    Ok(())
}
