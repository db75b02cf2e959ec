use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info};

use super::CatalogEntry;
use crate::error::{CrawlError, Result};

/// The catalog document on disk.
///
/// Writers go through [`CatalogStore::save`], which serializes to a sibling
/// `.tmp` file and renames it over the target while holding the store's mutex.
/// Readers only ever see the previous or the new complete document.
#[derive(Debug)]
pub struct CatalogStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut s: OsString = self.path.as_os_str().to_owned();
        s.push(".tmp");
        PathBuf::from(s)
    }

    /// Load the full catalog. A missing document is an empty catalog.
    pub fn load(&self) -> Result<Vec<CatalogEntry>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let entries: Vec<CatalogEntry> = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| CrawlError::Storage(format!("{}: {}", self.path.display(), e)))?;
        debug!(path = %self.path.display(), entries = entries.len(), "Loaded catalog");
        Ok(entries)
    }

    /// Replace the document with `entries`.
    pub fn save(&self, entries: &[CatalogEntry]) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| CrawlError::Storage("catalog write lock poisoned".into()))?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let tmp = self.temp_path();
        {
            let file = File::create(&tmp)?;
            let mut w = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut w, entries)?;
            w.flush()?;
            w.get_ref().sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;

        info!(path = %self.path.display(), entries = entries.len(), "Saved catalog");
        Ok(())
    }
}
