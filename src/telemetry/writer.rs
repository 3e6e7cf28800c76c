//! # Telemetry Writer
//!
//! JSONL file writer with rotation. Files are named
//! `telemetry_<UTC timestamp>_<index>.jsonl` so lexical order is creation
//! order.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};

use super::TelemetryRecord;
use crate::config::TelemetryConfig;
use crate::error::Result;

const FILE_PREFIX: &str = "telemetry_";
const FILE_EXTENSION: &str = "jsonl";

/// Rotating JSONL writer
#[derive(Debug)]
pub struct TelemetryWriter {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    current: Option<BufWriter<File>>,
    records_in_file: usize,
    file_index: u32,
}

impl TelemetryWriter {
    /// Create the log directory if needed. No file is opened until the
    /// first record.
    pub fn new<P: AsRef<Path>>(
        dir: P,
        max_records_per_file: usize,
        max_files_to_keep: usize,
    ) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        Ok(Self {
            dir,
            max_records_per_file: max_records_per_file.max(1),
            max_files_to_keep: max_files_to_keep.max(1),
            current: None,
            records_in_file: 0,
            file_index: 0,
        })
    }

    pub fn from_config(config: &TelemetryConfig) -> Result<Self> {
        Self::new(&config.log_dir, config.max_records_per_file, config.max_files_to_keep)
    }

    /// Append one record, rotating first if the current file is full
    pub fn write(&mut self, record: &TelemetryRecord) -> Result<()> {
        if self.current.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        let line = serde_json::to_string(record).map_err(std::io::Error::from)?;
        if let Some(file) = self.current.as_mut() {
            writeln!(file, "{}", line)?;
            self.records_in_file += 1;
        }
        Ok(())
    }

    /// Flush the current file
    pub fn flush(&mut self) -> Result<()> {
        if let Some(file) = self.current.as_mut() {
            file.flush()?;
        }
        Ok(())
    }

    fn rotate(&mut self) -> Result<()> {
        self.flush()?;

        let name = format!(
            "{}{}_{:04}.{}",
            FILE_PREFIX,
            Utc::now().format("%Y%m%dT%H%M%S"),
            self.file_index,
            FILE_EXTENSION
        );
        self.file_index = self.file_index.wrapping_add(1);

        let path = self.dir.join(name);
        let file = File::create(&path)?;
        info!("Writing telemetry to {}", path.display());

        self.current = Some(BufWriter::new(file));
        self.records_in_file = 0;
        self.prune()
    }

    /// Delete the oldest files beyond the retention limit
    fn prune(&self) -> Result<()> {
        let mut files = telemetry_files(&self.dir)?;
        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }

        files.sort();
        let excess = files.len() - self.max_files_to_keep;
        for path in files.into_iter().take(excess) {
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed old telemetry file {}", path.display()),
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
        Ok(())
    }
}

impl Drop for TelemetryWriter {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("Failed to flush telemetry on shutdown: {}", e);
        }
    }
}

fn telemetry_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_telemetry = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| {
                name.starts_with(FILE_PREFIX) && name.ends_with(FILE_EXTENSION)
            });
        if is_telemetry {
            files.push(path);
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::TelemetryEvent;
    use tempfile::TempDir;

    fn record() -> TelemetryRecord {
        TelemetryRecord::now(TelemetryEvent::BehindScanRequested)
    }

    fn line_counts(dir: &Path) -> Vec<usize> {
        let mut files = telemetry_files(dir).unwrap();
        files.sort();
        files
            .iter()
            .map(|path| fs::read_to_string(path).unwrap().lines().count())
            .collect()
    }

    #[test]
    fn test_no_file_before_first_record() {
        let dir = TempDir::new().unwrap();
        let _writer = TelemetryWriter::new(dir.path(), 10, 3).unwrap();
        assert!(telemetry_files(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_records_are_json_lines() {
        let dir = TempDir::new().unwrap();
        let mut writer = TelemetryWriter::new(dir.path(), 10, 3).unwrap();
        writer.write(&record()).unwrap();
        writer.write(&record()).unwrap();
        writer.flush().unwrap();

        let files = telemetry_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        let contents = fs::read_to_string(&files[0]).unwrap();
        for line in contents.lines() {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(value["kind"], "behind_scan_requested");
        }
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn test_rotation_by_record_count() {
        let dir = TempDir::new().unwrap();
        let mut writer = TelemetryWriter::new(dir.path(), 2, 10).unwrap();
        for _ in 0..5 {
            writer.write(&record()).unwrap();
        }
        writer.flush().unwrap();

        assert_eq!(line_counts(dir.path()), vec![2, 2, 1]);
    }

    #[test]
    fn test_retention_keeps_newest_files() {
        let dir = TempDir::new().unwrap();
        let mut writer = TelemetryWriter::new(dir.path(), 1, 2).unwrap();
        for _ in 0..5 {
            writer.write(&record()).unwrap();
        }
        writer.flush().unwrap();

        let mut files = telemetry_files(dir.path()).unwrap();
        files.sort();
        assert_eq!(files.len(), 2);
        let last = files[1].file_name().unwrap().to_str().unwrap().to_string();
        assert!(last.ends_with("_0004.jsonl"), "unexpected newest file {}", last);
    }

    #[test]
    fn test_foreign_files_untouched() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.txt"), "keep").unwrap();

        let mut writer = TelemetryWriter::new(dir.path(), 1, 1).unwrap();
        for _ in 0..3 {
            writer.write(&record()).unwrap();
        }
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_file_errors_are_local_io() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, "").unwrap();

        let result = TelemetryWriter::new(&blocker, 10, 3);
        assert!(matches!(result, Err(crate::error::CortexError::Io(_))));
    }

    #[test]
    fn test_from_config_creates_directory() {
        let dir = TempDir::new().unwrap();
        let config = TelemetryConfig {
            log_dir: dir.path().join("nested/logs").to_string_lossy().to_string(),
            ..TelemetryConfig::default()
        };
        TelemetryWriter::from_config(&config).unwrap();
        assert!(dir.path().join("nested/logs").is_dir());
    }
}
