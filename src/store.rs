//! Record storage
//!
//! The pipeline only needs one operation from its storage collaborator:
//! append a record. `JsonlStore` is the provided file backend, writing one
//! JSON object per line and flushing per append; `MemoryStore` keeps records
//! in memory for tests and in-process inspection.

use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::rc::Rc;

use crate::error::{AuditError, AuditResult};
use crate::record::LogRecord;

/// Storage collaborator the dispatcher appends records to
pub trait RecordStore {
    /// Append one record
    fn append(&mut self, record: &LogRecord) -> AuditResult<()>;
}

/// Append-only JSONL file store
///
/// Each record is written as a single JSON line and flushed immediately so a
/// crash after the append cannot lose it.
pub struct JsonlStore {
    /// Path to the record file
    log_path: PathBuf,
}

impl JsonlStore {
    /// Create a store writing to the specified path
    pub fn new(log_path: PathBuf) -> Self {
        Self { log_path }
    }

    /// Read all records from the file
    ///
    /// Returns records in append order (oldest first).
    pub fn read_all(&self) -> AuditResult<Vec<LogRecord>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.log_path)
            .map_err(|e| AuditError::Io(format!("Failed to open record file: {}", e)))?;

        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| {
                AuditError::Io(format!("Failed to read record line {}: {}", line_num + 1, e))
            })?;

            // Skip empty lines
            if line.trim().is_empty() {
                continue;
            }

            let record: LogRecord = serde_json::from_str(&line).map_err(|e| {
                AuditError::Json(format!(
                    "Failed to parse record at line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;

            records.push(record);
        }

        Ok(records)
    }

    /// Read the most recent N records
    pub fn read_recent(&self, count: usize) -> AuditResult<Vec<LogRecord>> {
        let all = self.read_all()?;
        let start = all.len().saturating_sub(count);
        Ok(all[start..].to_vec())
    }

    /// Number of records in the file
    pub fn entry_count(&self) -> AuditResult<usize> {
        Ok(self.read_all()?.len())
    }

    /// Check if the record file exists
    pub fn exists(&self) -> bool {
        self.log_path.exists()
    }

    /// Path to the record file
    pub fn path(&self) -> &PathBuf {
        &self.log_path
    }
}

impl RecordStore for JsonlStore {
    fn append(&mut self, record: &LogRecord) -> AuditResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| AuditError::Storage(format!("Failed to open record file: {}", e)))?;

        let json = serde_json::to_string(record)
            .map_err(|e| AuditError::Storage(format!("Failed to serialize record: {}", e)))?;

        writeln!(file, "{}", json)
            .map_err(|e| AuditError::Storage(format!("Failed to write record: {}", e)))?;

        file.flush()
            .map_err(|e| AuditError::Storage(format!("Failed to flush record file: {}", e)))?;

        Ok(())
    }
}

/// In-memory store with a shareable view of the appended records
///
/// Single-threaded, like the rest of the pipeline: the handle returned by
/// `records()` lets a test or host inspect what was flushed while the
/// aggregator owns the store itself.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Rc<RefCell<Vec<LogRecord>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the appended records
    pub fn records(&self) -> Rc<RefCell<Vec<LogRecord>>> {
        Rc::clone(&self.records)
    }
}

impl RecordStore for MemoryStore {
    fn append(&mut self, record: &LogRecord) -> AuditResult<()> {
        self.records.borrow_mut().push(record.clone());
        Ok(())
    }
}
