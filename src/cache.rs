//! Keyed storage for evaluated tables.

use std::fs::{self, File};
use std::path::PathBuf;

use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::info;

use crate::error::{Error, Result};
use crate::output::write_tests_csv;
use crate::records::TestTable;

/// Accepts a table under a caller-chosen key. Nothing is returned.
pub trait CacheStore {
    fn store(&self, key: &str, table: &TestTable) -> Result<()>;
}

/// Stores each table as `<dir>/<key>.csv.gz`.
pub struct GzipCsvCache {
    dir: PathBuf,
}

impl GzipCsvCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.csv.gz"))
    }
}

impl CacheStore for GzipCsvCache {
    fn store(&self, key: &str, table: &TestTable) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        let path = self.path_for(key);

        let file = File::create(&path).map_err(|e| Error::io(&path, e))?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        write_tests_csv(&mut encoder, table)?;
        encoder.finish().map_err(|e| Error::io(&path, e))?;

        info!(path = %path.display(), rows = table.len(), "Data saved");
        Ok(())
    }
}
