//! JSONL journal reader - sequential reader for replay

use crate::error::JournalError;
use crate::record::OperationRecord;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Sequential reader over all journal files in a directory
pub struct JournalReader {
    files: Vec<std::path::PathBuf>,
}

impl JournalReader {
    pub fn from_directory(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let path = path.as_ref();
        let mut files = Vec::new();

        if path.exists() {
            for entry in std::fs::read_dir(path)? {
                let entry = entry?;
                let file_path = entry.path();
                if file_path.extension().map_or(false, |ext| ext == "jsonl") {
                    files.push(file_path);
                }
            }
        }

        files.sort();

        Ok(Self { files })
    }

    /// Read all records from all files in order
    pub fn read_all(&self) -> Result<Vec<OperationRecord>, JournalError> {
        let mut records = Vec::new();

        for file_path in &self.files {
            let file = File::open(file_path)?;
            let reader = BufReader::new(file);

            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let record: OperationRecord = serde_json::from_str(&line)?;
                records.push(record);
            }
        }

        Ok(records)
    }

    /// Get the last record (for sequence/prev_hash continuation)
    pub fn last_record(&self) -> Result<Option<OperationRecord>, JournalError> {
        let records = self.read_all()?;
        Ok(records.into_iter().last())
    }

    /// Count records across all files
    pub fn count(&self) -> Result<usize, JournalError> {
        Ok(self.read_all()?.len())
    }
}
