//! JSONL journal store - append-only writer

use crate::error::JournalError;
use crate::record::OperationRecord;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Append-only JSONL journal, one file per day
pub struct JournalStore {
    base_path: PathBuf,
    current_file: Option<BufWriter<File>>,
    current_date: Option<String>,
}

impl JournalStore {
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;

        Ok(Self {
            base_path,
            current_file: None,
            current_date: None,
        })
    }

    /// Append a record; flushed to disk before returning
    pub fn append(&mut self, record: &OperationRecord) -> Result<(), JournalError> {
        let date = record.timestamp.format("%Y-%m-%d").to_string();

        if self.current_date.as_ref() != Some(&date) {
            self.rotate_file(&date)?;
        }

        if let Some(ref mut writer) = self.current_file {
            let json = serde_json::to_string(record)?;
            writeln!(writer, "{}", json)?;
            writer.flush()?;
        }

        Ok(())
    }

    fn rotate_file(&mut self, date: &str) -> Result<(), JournalError> {
        if let Some(ref mut writer) = self.current_file {
            writer.flush()?;
        }

        let file_path = self.base_path.join(format!("{}.jsonl", date));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)?;

        self.current_file = Some(BufWriter::new(file));
        self.current_date = Some(date.to_string());

        Ok(())
    }

    pub fn close(&mut self) -> Result<(), JournalError> {
        if let Some(ref mut writer) = self.current_file {
            writer.flush()?;
        }
        self.current_file = None;
        self.current_date = None;
        Ok(())
    }
}

impl Drop for JournalStore {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::calculate_record_hash;
    use crate::reader::JournalReader;
    use crate::record::OperationKind;
    use chrono::Utc;
    use tempfile::TempDir;

    fn record(sequence: u64, prev_hash: &str) -> OperationRecord {
        let mut r = OperationRecord {
            sequence,
            prev_hash: prev_hash.to_string(),
            hash: String::new(),
            timestamp: Utc::now(),
            at: 1_700_000_000,
            kind: OperationKind::Faucet,
            correlation_id: format!("c-{}", sequence),
            payload: serde_json::json!({}),
        };
        r.hash = calculate_record_hash(&r);
        r
    }

    #[test]
    fn test_append_and_read_back() {
        let dir = TempDir::new().unwrap();
        let mut store = JournalStore::new(dir.path()).unwrap();

        let r1 = record(1, "GENESIS");
        let r2 = record(2, &r1.hash);
        store.append(&r1).unwrap();
        store.append(&r2).unwrap();
        store.close().unwrap();

        let reader = JournalReader::from_directory(dir.path()).unwrap();
        let records = reader.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].sequence, 2);
    }
}
