//! Single-entry zip archives.
//!
//! A zipped source must contain exactly one file; the entry is streamed straight into the
//! pipeline without extracting it to disk.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use tracing::debug;
use zip::ZipArchive;

use crate::error::{LoadError, LoadResult};

/// Open the zip archive at `path` and call `f` with a reader over its only entry.
pub fn with_single_entry<T>(
    path: impl AsRef<Path>,
    f: impl FnOnce(&mut dyn Read) -> LoadResult<T>,
) -> LoadResult<T> {
    let file = File::open(path.as_ref())?;
    with_single_entry_from_reader(file, f)
}

/// Like [`with_single_entry`], for an archive that is already open.
pub fn with_single_entry_from_reader<A, T>(
    archive: A,
    f: impl FnOnce(&mut dyn Read) -> LoadResult<T>,
) -> LoadResult<T>
where
    A: Read + Seek,
{
    let mut archive = ZipArchive::new(archive)?;
    if archive.len() != 1 {
        return Err(LoadError::config(format!(
            "supported only one file in archive, got {} files",
            archive.len()
        )));
    }

    let mut entry = archive.by_index(0)?;
    debug!(entry = entry.name(), size = entry.size(), "opened archive entry");
    f(&mut entry)
}
