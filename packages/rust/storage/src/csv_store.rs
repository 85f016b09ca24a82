//! Append-only CSV output.
//!
//! The output file is both the primary result and the resume checkpoint:
//! every source URL that appears in it counts as processed on the next run.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use portscout_core::{ProcessedSource, RecordSink};
use portscout_shared::{PipelineRecord, Result, ScoutError};

/// The primary record store.
#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    /// Use `path` as the output file, creating its parent directory.
    ///
    /// The file itself is created on the first append.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| ScoutError::io(parent, e))?;
            }
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row, writing the header first if the file is new or empty.
    ///
    /// A previous row cut short by a crash is closed with a newline first so
    /// the new row starts on its own line.
    pub fn append_record(&self, record: &PipelineRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ScoutError::io(&self.path, e))?;

        let len = file
            .metadata()
            .map_err(|e| ScoutError::io(&self.path, e))?
            .len();

        if len > 0 && !ends_with_newline(&mut file).map_err(|e| ScoutError::io(&self.path, e))? {
            file.write_all(b"\n")
                .map_err(|e| ScoutError::io(&self.path, e))?;
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if len == 0 {
            writer
                .write_record(PipelineRecord::COLUMNS)
                .map_err(|e| ScoutError::Storage(format!("CSV header write failed: {e}")))?;
        }
        writer
            .serialize(record)
            .map_err(|e| ScoutError::Storage(format!("CSV row write failed: {e}")))?;
        writer
            .flush()
            .map_err(|e| ScoutError::io(&self.path, e))?;

        debug!(company = %record.company_name, path = %self.path.display(), "row appended");
        Ok(())
    }

    /// Every distinct, non-empty `source_url` already in the output.
    ///
    /// A missing file means nothing has been processed yet.
    pub fn processed_urls(&self) -> Result<HashSet<String>> {
        if !self.path.exists() {
            return Ok(HashSet::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| ScoutError::parse(format!("{}: {e}", self.path.display())))?;

        let column = reader
            .headers()
            .map_err(|e| ScoutError::parse(format!("{}: {e}", self.path.display())))?
            .iter()
            .position(|h| h.trim() == "source_url")
            .unwrap_or(0);

        let mut processed = HashSet::new();
        for row in reader.records() {
            let row = row.map_err(|e| ScoutError::parse(format!("{}: {e}", self.path.display())))?;
            if let Some(url) = row.get(column).map(str::trim).filter(|u| !u.is_empty()) {
                processed.insert(url.to_string());
            }
        }

        info!(count = processed.len(), path = %self.path.display(), "loaded processed source URLs");
        Ok(processed)
    }
}

fn ends_with_newline(file: &mut File) -> std::io::Result<bool> {
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

#[async_trait]
impl RecordSink for CsvStore {
    async fn append(&self, record: &PipelineRecord) -> Result<()> {
        self.append_record(record)
    }
}

impl ProcessedSource for CsvStore {
    fn load_processed(&self) -> Result<HashSet<String>> {
        self.processed_urls()
    }
}
