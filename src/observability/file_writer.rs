//! Append-only span log with size-based rotation.
//!
//! Backups are named after the moment they were rotated out
//! (`<file>.<YYYYmmddTHHMMSS>`), so lexical order is age order and no file
//! metadata is needed to find the oldest ones.

use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Rotation threshold of the span log (10 MB).
pub const MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Backups kept next to the live log.
pub const MAX_BACKUP_FILES: usize = 3;

/// Thread-safe span log writer.
///
/// The file handle is opened on the first write. Before every write the
/// current size is checked; once it exceeds the threshold the file is renamed
/// to a timestamped backup and backups beyond the retention limit are removed.
pub struct SpanLog {
    path: PathBuf,
    max_bytes: u64,
    backups: usize,
    file: Mutex<Option<fs::File>>,
}

impl SpanLog {
    /// Writer for `path` with the default limits.
    pub const fn new(path: PathBuf) -> Self {
        Self::with_limits(path, MAX_FILE_SIZE_BYTES, MAX_BACKUP_FILES)
    }

    /// Writer for `path` rotating above `max_bytes` and keeping `backups` old files.
    pub const fn with_limits(path: PathBuf, max_bytes: u64, backups: usize) -> Self {
        Self {
            path,
            max_bytes,
            backups,
            file: Mutex::new(None),
        }
    }

    /// Path of the live log.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one line, rotating first when the log is full.
    ///
    /// # Errors
    ///
    /// Fails when the log cannot be rotated, opened or written, or when the
    /// lock was poisoned by a panicking writer.
    pub fn append(&self, line: &str) -> std::io::Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, format!("span log lock poisoned: {e}")))?;

        if fs::metadata(&self.path).map_or(false, |m| m.len() > self.max_bytes) {
            *guard = None;
            self.rotate()?;
        }

        if guard.is_none() {
            *guard = Some(OpenOptions::new().create(true).append(true).open(&self.path)?);
        }
        let file = guard
            .as_mut()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "span log is not open"))?;
        writeln!(file, "{line}")?;
        file.flush()
    }

    fn rotate(&self) -> std::io::Result<()> {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%3f");
        let mut backup = self.path.clone().into_os_string();
        backup.push(format!(".{stamp}"));
        if self.path.exists() {
            fs::rename(&self.path, PathBuf::from(backup))?;
        }
        self.prune()
    }

    fn prune(&self) -> std::io::Result<()> {
        let (Some(dir), Some(name)) = (self.path.parent(), self.path.file_name().and_then(|n| n.to_str())) else {
            return Ok(());
        };
        let prefix = format!("{name}.");

        let mut backups: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&prefix))
            })
            .collect();
        backups.sort();

        let excess = backups.len().saturating_sub(self.backups);
        for old in backups.iter().take(excess) {
            // A backup that cannot be removed is retried on the next rotation.
            let _ = fs::remove_file(old);
        }
        Ok(())
    }
}

impl std::fmt::Debug for SpanLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpanLog")
            .field("path", &self.path)
            .field("max_bytes", &self.max_bytes)
            .field("backups", &self.backups)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backups(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with("spans.jsonl."))
            .count()
    }

    #[test]
    fn appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = SpanLog::new(dir.path().join("spans.jsonl"));
        log.append("{\"a\":1}").unwrap();
        log.append("{\"a\":2}").unwrap();
        let text = fs::read_to_string(log.path()).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn rotates_and_prunes_backups() {
        let dir = tempfile::tempdir().unwrap();
        let log = SpanLog::with_limits(dir.path().join("spans.jsonl"), 4, 2);
        for i in 0..5 {
            log.append(&format!("line-{i}")).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        assert_eq!(backups(dir.path()), 2);
        let live = fs::read_to_string(log.path()).unwrap();
        assert_eq!(live.trim(), "line-4");
    }
}
