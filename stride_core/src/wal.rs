//! Write-Ahead Log (WAL) for activity persistence.
//!
//! Activities are appended to a JSONL (JSON Lines) file with file locking
//! to ensure safe concurrent access.

use crate::{Activity, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Activity sink trait for persisting recorded activities
pub trait ActivitySink {
    fn append(&mut self, activity: &Activity) -> Result<()>;
}

/// JSONL-based activity sink with file locking
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    /// Create a new JSONL sink for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ensure the parent directory exists
    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl ActivitySink for JsonlSink {
    fn append(&mut self, activity: &Activity) -> Result<()> {
        self.ensure_parent_dir()?;

        // Open file for appending
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        // Acquire exclusive lock
        file.lock_exclusive()?;

        // Write activity as JSON line
        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(activity)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        file.unlock()?;

        tracing::debug!("Appended activity {} to WAL", activity.id);
        Ok(())
    }
}

/// Read all activities from a WAL file
pub fn read_activities(path: &Path) -> Result<Vec<Activity>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    // Acquire shared lock for reading
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut activities = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<Activity>(&line) {
            Ok(activity) => activities.push(activity),
            Err(e) => {
                tracing::warn!("Failed to parse activity at line {}: {}", line_num + 1, e);
                // Continue reading, don't fail completely
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} activities from WAL", activities.len());
    Ok(activities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sport;
    use chrono::NaiveDate;

    fn create_test_activity(day: u32) -> Activity {
        Activity::record(
            NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            Sport::Run,
            45.0,
            6,
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_append_and_read_single_activity() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("test.wal");

        let activity = create_test_activity(1);
        let activity_id = activity.id;

        // Append activity
        let mut sink = JsonlSink::new(&wal_path);
        sink.append(&activity).unwrap();

        // Read back
        let activities = read_activities(&wal_path).unwrap();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].id, activity_id);
        assert_eq!(activities[0].systemic_load_au, 270.0);
    }

    #[test]
    fn test_append_multiple_activities() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("test.wal");

        let mut sink = JsonlSink::new(&wal_path);

        for day in 1..=5 {
            sink.append(&create_test_activity(day)).unwrap();
        }

        let activities = read_activities(&wal_path).unwrap();
        assert_eq!(activities.len(), 5);
    }

    #[test]
    fn test_read_empty_wal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("nonexistent.wal");

        let activities = read_activities(&wal_path).unwrap();
        assert!(activities.is_empty());
    }

    #[test]
    fn test_corrupt_line_is_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("test.wal");

        let mut sink = JsonlSink::new(&wal_path);
        sink.append(&create_test_activity(1)).unwrap();

        // Inject a corrupt line
        use std::io::Write as _;
        let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
        writeln!(file, "{{ not valid json").unwrap();

        sink.append(&create_test_activity(2)).unwrap();

        let activities = read_activities(&wal_path).unwrap();
        assert_eq!(activities.len(), 2);
    }
}
