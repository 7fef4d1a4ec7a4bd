//! Emergency audit log.
//!
//! Append-only JSONL store with rotation, plus an in-memory store. Logging is
//! fire-and-forget for the guidance flow: callers spawn it and only record
//! failures.

use async_trait::async_trait;
use lifeline_shared::{CompleteAssessment, EmergencyRecord, Location, NewEmergency};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Log task failed: {0}")]
    Task(String),
}

impl LogError {
    pub fn code(&self) -> i32 {
        match self {
            LogError::Io(_) => -32030,
            LogError::Json(_) => -32031,
            LogError::Task(_) => -32032,
        }
    }
}

#[async_trait]
pub trait EmergencyLogger: Send + Sync {
    /// Persist an emergency, returning the stored record
    async fn log(&self, emergency: NewEmergency) -> Result<EmergencyRecord, LogError>;

    /// Most recent records, newest last
    async fn recent(&self, limit: usize) -> Result<Vec<EmergencyRecord>, LogError>;

    /// Persist a completed assessment with the bystander location, if known
    async fn log_assessment(
        &self,
        assessment: &CompleteAssessment,
        location: Option<&Location>,
    ) -> Result<EmergencyRecord, LogError> {
        self.log(NewEmergency::from_assessment(assessment, location))
            .await
    }
}

fn tail(mut records: Vec<EmergencyRecord>, limit: usize) -> Vec<EmergencyRecord> {
    let skip = records.len().saturating_sub(limit);
    records.drain(..skip);
    records
}

/// In-memory store
#[derive(Default)]
pub struct MemoryEmergencyLog {
    records: Mutex<Vec<EmergencyRecord>>,
}

impl MemoryEmergencyLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EmergencyLogger for MemoryEmergencyLog {
    async fn log(&self, emergency: NewEmergency) -> Result<EmergencyRecord, LogError> {
        let record = EmergencyRecord::new(emergency);
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record.clone());
        info!("Emergency logged: {}", record.id);
        Ok(record)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<EmergencyRecord>, LogError> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner()).clone();
        Ok(tail(records, limit))
    }
}

/// JSONL file with rotation
struct LogFile {
    path: PathBuf,
    max_entries: usize,
    lock: Mutex<()>,
}

impl LogFile {
    fn append(&self, record: &EmergencyRecord) -> Result<(), LogError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let line = serde_json::to_string(record)?;
        writeln!(file, "{}", line)?;

        self.maybe_rotate()
    }

    fn read_all(&self) -> Result<Vec<EmergencyRecord>, LogError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&self.path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            // Skip lines from older or damaged writes
            if let Ok(record) = serde_json::from_str::<EmergencyRecord>(&line) {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Rotate if past max entries, keeping the newest 75%
    fn maybe_rotate(&self) -> Result<(), LogError> {
        let records = self.read_all()?;
        if records.len() <= self.max_entries {
            return Ok(());
        }

        // The newest record always survives
        let keep_count = (self.max_entries * 3 / 4).max(1);
        let to_keep = &records[records.len() - keep_count..];

        // Write to temp file then rename
        let temp_path = self.path.with_extension("jsonl.tmp");
        {
            let mut file = File::create(&temp_path)?;
            for record in to_keep {
                writeln!(file, "{}", serde_json::to_string(record)?)?;
            }
        }
        fs::rename(&temp_path, &self.path)?;
        info!(
            "Rotated emergency log: kept {} of {} records",
            keep_count,
            records.len()
        );
        Ok(())
    }
}

/// File-backed store. Blocking I/O runs off the async workers.
pub struct JsonlEmergencyLog {
    file: Arc<LogFile>,
}

impl JsonlEmergencyLog {
    pub fn new(path: impl AsRef<Path>, max_entries: usize) -> Self {
        Self {
            file: Arc::new(LogFile {
                path: path.as_ref().to_path_buf(),
                max_entries: max_entries.max(1),
                lock: Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file.path
    }
}

#[async_trait]
impl EmergencyLogger for JsonlEmergencyLog {
    async fn log(&self, emergency: NewEmergency) -> Result<EmergencyRecord, LogError> {
        let record = EmergencyRecord::new(emergency);
        let file = Arc::clone(&self.file);
        let to_write = record.clone();
        tokio::task::spawn_blocking(move || file.append(&to_write))
            .await
            .map_err(|e| LogError::Task(e.to_string()))??;
        info!("Emergency logged: {}", record.id);
        Ok(record)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<EmergencyRecord>, LogError> {
        let file = Arc::clone(&self.file);
        let records = tokio::task::spawn_blocking(move || file.read_all())
            .await
            .map_err(|e| LogError::Task(e.to_string()))??;
        Ok(tail(records, limit))
    }
}
