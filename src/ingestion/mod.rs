//! Load entrypoints and the source-side pipeline.
//!
//! Most callers should use [`load_from_path`] (from [`unified`]) which:
//!
//! - auto-detects plain text vs. zip by file extension (or you can override via [`LoadOptions`])
//! - decodes the charset, skips banner rows and reads the header
//! - runs the transactional bulk load into a [`crate::destination::Destination`]
//! - optionally reports progress/success/failure/alerts to a [`LoadObserver`]
//!
//! The building blocks are also available under:
//! - [`encoding`]: source charsets and per-field decoding
//! - [`csv`]: row stream and per-record coercion
//! - [`schema`]: column specs and destination column resolution
//! - [`provision`]: table creation
//! - [`loader`]: the transactional load itself

pub mod archive;
pub mod csv;
pub mod encoding;
pub mod loader;
pub mod observability;
pub mod provision;
pub mod schema;
pub mod unified;

pub use csv::{CsvOptions, Delimiter, RowStream, SourceRecord};
pub use encoding::Charset;
pub use loader::LoadPlan;
pub use observability::{
    CompositeObserver, FileObserver, LoadContext, LoadObserver, LoadSeverity, LoadStats,
    StdErrObserver,
};
pub use unified::{
    load_from_path, load_from_reader, plan_from_path, plan_from_reader, severity_for_error,
    LoadOptions, LoadRequest, SourceFormat, DEFAULT_PROGRESS_EVERY,
};
