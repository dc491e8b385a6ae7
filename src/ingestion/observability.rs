use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;

use crate::error::LoadError;
use crate::types::TableName;

use super::unified::SourceFormat;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoadSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (load failed on bad input or configuration).
    Error,
    /// Critical error (I/O, archive or destination failures).
    Critical,
}

/// Context about a load attempt.
#[derive(Debug, Clone)]
pub struct LoadContext {
    /// Human-readable description of the input (usually its path).
    pub source: String,
    /// Format used to open the input.
    pub format: SourceFormat,
    /// Destination table.
    pub table: TableName,
}

/// Stats reported on a successful load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    /// Affected-row count reported by the destination.
    pub rows: u64,
    /// Wall time from transaction begin to commit.
    pub elapsed: Duration,
}

impl LoadStats {
    pub fn rows_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.rows as f64 / secs
        } else {
            self.rows as f64
        }
    }
}

/// Observer interface for load progress and outcomes.
///
/// Implementors can print progress, record metrics, or trigger alerts. Callbacks run on the
/// loading thread and should return quickly.
pub trait LoadObserver: Send + Sync {
    /// Called every `progress_every` rows while streaming.
    fn on_progress(&self, _ctx: &LoadContext, _rows: u64) {}

    /// Called after the transaction commits.
    fn on_success(&self, _ctx: &LoadContext, _stats: LoadStats) {}

    /// Called when the load fails.
    fn on_failure(&self, _ctx: &LoadContext, _severity: LoadSeverity, _error: &LoadError) {}

    /// Called when a load failure meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &LoadContext, severity: LoadSeverity, error: &LoadError) {
        self.on_failure(ctx, severity, error)
    }
}

/// Forwards every callback to each inner observer, in insertion order.
#[derive(Default)]
pub struct CompositeObserver {
    inner: Vec<Arc<dyn LoadObserver>>,
}

impl CompositeObserver {
    pub fn new(inner: Vec<Arc<dyn LoadObserver>>) -> Self {
        Self { inner }
    }

    /// Append `observer` and return the composite.
    pub fn with(mut self, observer: Arc<dyn LoadObserver>) -> Self {
        self.inner.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl FromIterator<Arc<dyn LoadObserver>> for CompositeObserver {
    fn from_iter<I: IntoIterator<Item = Arc<dyn LoadObserver>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompositeObserver({} observers)", self.inner.len())
    }
}

impl LoadObserver for CompositeObserver {
    fn on_progress(&self, ctx: &LoadContext, rows: u64) {
        for o in &self.inner {
            o.on_progress(ctx, rows);
        }
    }

    fn on_success(&self, ctx: &LoadContext, stats: LoadStats) {
        for o in &self.inner {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &LoadContext, severity: LoadSeverity, error: &LoadError) {
        for o in &self.inner {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &LoadContext, severity: LoadSeverity, error: &LoadError) {
        for o in &self.inner {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Prints a running record counter and the final outcome to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl LoadObserver for StdErrObserver {
    fn on_progress(&self, _ctx: &LoadContext, rows: u64) {
        eprint!("Processed {rows} records...\r");
    }

    fn on_success(&self, _ctx: &LoadContext, stats: LoadStats) {
        eprintln!(
            "Processed {} records.   ({:.0} rows/s)",
            stats.rows,
            stats.rows_per_second()
        );
    }

    fn on_failure(&self, ctx: &LoadContext, severity: LoadSeverity, error: &LoadError) {
        eprintln!(
            "[load][{:?}] format={:?} source={} table={} err={}",
            severity, ctx.format, ctx.source, ctx.table, error
        );
    }

    fn on_alert(&self, ctx: &LoadContext, severity: LoadSeverity, error: &LoadError) {
        eprintln!(
            "[ALERT][load][{:?}] format={:?} source={} table={} err={}",
            severity, ctx.format, ctx.source, ctx.table, error
        );
    }
}

/// Appends one timestamped line per load event to a log file.
///
/// The file is opened for each event, so it may be rotated between loads. Write failures are
/// dropped; the log never fails a load.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileObserver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_line(&self, event: &str) {
        let _serialized = self.write_lock.lock().ok();
        let opened = OpenOptions::new().create(true).append(true).open(&self.path);
        if let Ok(mut file) = opened {
            let _ = writeln!(file, "{} {event}", Utc::now().to_rfc3339());
        }
    }
}

impl LoadObserver for FileObserver {
    fn on_progress(&self, ctx: &LoadContext, rows: u64) {
        self.append_line(&format!(
            "progress source={} table={} rows={rows}",
            ctx.source, ctx.table
        ));
    }

    fn on_success(&self, ctx: &LoadContext, stats: LoadStats) {
        self.append_line(&format!(
            "ok format={:?} source={} table={} rows={} elapsed_ms={}",
            ctx.format,
            ctx.source,
            ctx.table,
            stats.rows,
            stats.elapsed.as_millis()
        ));
    }

    fn on_failure(&self, ctx: &LoadContext, severity: LoadSeverity, error: &LoadError) {
        self.append_line(&format!(
            "fail severity={:?} format={:?} source={} table={} err={}",
            severity, ctx.format, ctx.source, ctx.table, error
        ));
    }

    fn on_alert(&self, ctx: &LoadContext, severity: LoadSeverity, error: &LoadError) {
        self.append_line(&format!(
            "ALERT severity={:?} format={:?} source={} table={} err={}",
            severity, ctx.format, ctx.source, ctx.table, error
        ));
    }
}
