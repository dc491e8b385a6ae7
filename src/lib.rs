//! `csv-bulk-loader` loads a single delimited text file into a relational table through a
//! bulk-copy channel, inside one transaction.
//!
//! The primary entrypoint is [`ingestion::load_from_path`], which picks plain text or a
//! single-entry zip archive from the file extension (or you can force a format via
//! [`ingestion::LoadOptions`]).
//!
//! ## Type specification
//!
//! Each header column is described by one character of the type specification:
//!
//! | code | type | schema type |
//! |------|------|-------------|
//! | `' '` | [`types::FieldType::Skip`]: read, not loaded | - |
//! | `i` | [`types::FieldType::Integer`] | `bigint` |
//! | `s` | [`types::FieldType::String`] (trimmed) | `nvarchar(255)` |
//! | `f` | [`types::FieldType::Float`] (`,` or `.` decimal separator) | `float` |
//! | `m` | [`types::FieldType::Money`] (reserved, unsupported) | - |
//! | `d` | [`types::FieldType::Date`] | `date` |
//! | `t` | [`types::FieldType::Timestamp`] | `datetime2` |
//! | `w` | [`types::FieldType::TimestampWithoutSeconds`] | `datetime2` |
//!
//! Fields that are empty after trimming load as NULL whatever their type. Any other value that
//! fails to parse aborts the whole load and rolls the transaction back.
//!
//! ## Quick example
//!
//! ```no_run
//! use csv_bulk_loader::destination::SqliteDestination;
//! use csv_bulk_loader::ingestion::{load_from_path, Charset, LoadOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut db = SqliteDestination::open("warehouse.db")?;
//! let mut options = LoadOptions::new("main.payments".parse()?, "is f d".parse()?);
//! options.csv.delimiter = ";".parse()?;
//! options.csv.skip_rows = 2;
//! options.csv.charset = Charset::Windows1251;
//! options.create_table = true;
//!
//! let stats = load_from_path("payments.zip", &mut db, &options)?;
//! println!("rows={}", stats.rows);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: load entrypoints, row stream, schema resolution, provisioning, observers
//! - [`destination`]: the [`destination::Destination`] seam and the bundled SQLite engine
//! - [`types`]: type codes, values and table names
//! - [`error`]: error types shared by every stage

pub mod destination;
pub mod error;
pub mod ingestion;
pub mod types;

pub use error::{LoadError, LoadResult, LoadStage};
