//! Destinations able to hold several named sheets in one artifact.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{Error, Result};
use crate::report::sheet::Sheet;

/// Collects sheets and commits them as one artifact.
///
/// Nothing becomes visible until [`SheetSink::finish`] succeeds; dropping a
/// sink before that discards every sheet written so far.
pub trait SheetSink {
    type Output;

    fn write_sheet(&mut self, sheet: Sheet) -> Result<()>;

    fn finish(self) -> Result<Self::Output>;
}

#[derive(Serialize)]
struct Workbook<'a> {
    sheets: &'a [Sheet],
}

/// Writes all sheets to a single JSON document, optionally gzip-compressed.
///
/// The document is staged in a temporary file next to the destination and
/// renamed into place, so readers never observe a partial report.
pub struct JsonWorkbook {
    path: PathBuf,
    gzip: bool,
    names: HashSet<String>,
    sheets: Vec<Sheet>,
}

impl JsonWorkbook {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            gzip: false,
            names: HashSet::new(),
            sheets: Vec::new(),
        }
    }

    pub fn gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip;
        self
    }

    fn write_to(&self, file: &mut NamedTempFile) -> Result<()> {
        let workbook = Workbook {
            sheets: &self.sheets,
        };
        if self.gzip {
            let mut encoder = GzEncoder::new(file.as_file_mut(), Compression::default());
            serde_json::to_writer(&mut encoder, &workbook)?;
            encoder.finish().map_err(|e| Error::io(&self.path, e))?;
        } else {
            serde_json::to_writer(file.as_file_mut(), &workbook)?;
        }
        file.as_file_mut()
            .flush()
            .map_err(|e| Error::io(&self.path, e))
    }
}

impl SheetSink for JsonWorkbook {
    type Output = PathBuf;

    fn write_sheet(&mut self, sheet: Sheet) -> Result<()> {
        if !self.names.insert(sheet.name.clone()) {
            return Err(Error::DuplicateSheet(sheet.name));
        }
        self.sheets.push(sheet);
        Ok(())
    }

    fn finish(self) -> Result<PathBuf> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;

        let mut staged = NamedTempFile::new_in(&dir).map_err(|e| Error::io(&dir, e))?;
        self.write_to(&mut staged)?;
        staged
            .persist(&self.path)
            .map_err(|e| Error::io(&self.path, e.error))?;

        info!(
            path = %self.path.display(),
            sheets = self.sheets.len(),
            gzip = self.gzip,
            "Report written"
        );
        Ok(self.path)
    }
}

/// Keeps sheets in memory; used by callers that post-process the report.
#[derive(Debug, Default)]
pub struct MemoryWorkbook {
    sheets: Vec<Sheet>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SheetSink for MemoryWorkbook {
    type Output = Vec<Sheet>;

    fn write_sheet(&mut self, sheet: Sheet) -> Result<()> {
        if self.sheets.iter().any(|s| s.name == sheet.name) {
            return Err(Error::DuplicateSheet(sheet.name));
        }
        self.sheets.push(sheet);
        Ok(())
    }

    fn finish(self) -> Result<Vec<Sheet>> {
        Ok(self.sheets)
    }
}

/// Reads back a workbook produced by [`JsonWorkbook`], plain or gzipped.
pub fn read_workbook(path: &Path) -> Result<serde_json::Value> {
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
    if bytes.starts_with(&[0x1f, 0x8b]) {
        let decoder = flate2::read::GzDecoder::new(bytes.as_slice());
        Ok(serde_json::from_reader(decoder)?)
    } else {
        Ok(serde_json::from_slice(&bytes)?)
    }
}
