//! Append-only review log.
//!
//! Every review event is appended to a JSONL (JSON Lines) file with file
//! locking to ensure safe concurrent access.

use crate::Result;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// What happened to a word during a review
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReviewKind {
    /// Active recall, graded by the learner
    Graded { correct: bool, new_level: i32 },
    /// Passive playback through the whole card
    Passive,
}

/// One logged review event
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewRecord {
    pub id: Uuid,
    pub word_id: Uuid,
    pub kind: ReviewKind,
    pub reviewed_at: DateTime<Utc>,
}

impl ReviewRecord {
    pub fn new(word_id: Uuid, kind: ReviewKind, reviewed_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            word_id,
            kind,
            reviewed_at,
        }
    }
}

/// Review sink trait for persisting review events
pub trait ReviewSink: Send {
    fn append(&mut self, record: &ReviewRecord) -> Result<()>;
}

/// JSONL-based review sink with file locking
pub struct JsonlReviewLog {
    path: PathBuf,
}

impl JsonlReviewLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl ReviewSink for JsonlReviewLog {
    fn append(&mut self, record: &ReviewRecord) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let torn = ends_mid_line(&file)?;
        let mut writer = std::io::BufWriter::new(&file);
        if torn {
            tracing::warn!("Review log {:?} ends with a partial line", self.path);
            writer.write_all(b"\n")?;
        }
        let line = serde_json::to_string(record)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!("Appended review {} for word {}", record.id, record.word_id);
        Ok(())
    }
}

/// True if the last writer stopped before finishing its line
fn ends_mid_line(mut file: &File) -> Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

/// Read all review records from a log file
pub fn read_reviews(path: &Path) -> Result<Vec<ReviewRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut records = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<ReviewRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!("Failed to parse review at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} reviews from log", records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graded(correct: bool) -> ReviewRecord {
        ReviewRecord::new(
            Uuid::new_v4(),
            ReviewKind::Graded {
                correct,
                new_level: if correct { 1 } else { 0 },
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_append_and_read_single_review() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("reviews.jsonl");

        let record = graded(true);
        let mut log = JsonlReviewLog::new(&log_path);
        log.append(&record).unwrap();

        let records = read_reviews(&log_path).unwrap();
        assert_eq!(records, vec![record]);
    }

    #[test]
    fn test_append_mixed_kinds() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("logs").join("reviews.jsonl");

        let mut log = JsonlReviewLog::new(&log_path);
        log.append(&graded(true)).unwrap();
        log.append(&graded(false)).unwrap();
        log.append(&ReviewRecord::new(Uuid::new_v4(), ReviewKind::Passive, Utc::now()))
            .unwrap();

        let records = read_reviews(&log_path).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].kind, ReviewKind::Passive);
    }

    #[test]
    fn test_corrupt_lines_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("reviews.jsonl");

        let record = graded(false);
        let mut contents = serde_json::to_string(&record).unwrap();
        contents.push_str("\n{ invalid json }\n\n{\"id\":\"partial");
        std::fs::write(&log_path, contents).unwrap();

        let records = read_reviews(&log_path).unwrap();
        assert_eq!(records, vec![record]);
    }

    #[test]
    fn test_append_after_torn_line() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("reviews.jsonl");
        std::fs::write(&log_path, "{\"id\":\"partial").unwrap();

        let record = graded(true);
        JsonlReviewLog::new(&log_path).append(&record).unwrap();

        let records = read_reviews(&log_path).unwrap();
        assert_eq!(records, vec![record]);
    }

    #[test]
    fn test_read_missing_log() {
        let temp_dir = tempfile::tempdir().unwrap();
        let records = read_reviews(&temp_dir.path().join("nonexistent.jsonl")).unwrap();
        assert!(records.is_empty());
    }
}
