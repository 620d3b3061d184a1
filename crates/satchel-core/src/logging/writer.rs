//! Append-only JSONL file per session.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::entry::JsonLogEntry;

/// Appends entries to `<logs_dir>/raw/<date>_<session>.jsonl`
pub struct SessionLogWriter {
    session: String,
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl SessionLogWriter {
    /// Open (or create) today's file for `session`, creating `raw/` as needed
    pub fn new(logs_dir: impl AsRef<Path>, session: impl Into<String>) -> std::io::Result<Self> {
        let session = session.into();
        let raw_dir = logs_dir.as_ref().join("raw");
        fs::create_dir_all(&raw_dir)?;

        let date = chrono::Local::now().format("%Y-%m-%d");
        let path = raw_dir.join(format!("{}_{}.jsonl", date, session));

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            session,
            writer: Mutex::new(BufWriter::new(file)),
            path,
        })
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one entry followed by a newline and flush
    pub fn write(&self, entry: &JsonLogEntry) -> std::io::Result<()> {
        let json = entry
            .to_json_line()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let mut writer = self.writer.lock();
        writeln!(writer, "{}", json)?;
        writer.flush()
    }

    pub fn write_raw(
        &self,
        level: &str,
        target: &str,
        message: &str,
        fields: Option<serde_json::Value>,
    ) -> std::io::Result<()> {
        let mut entry = JsonLogEntry::new(level, &self.session, target, message);
        if let Some(f) = fields {
            entry = entry.with_fields(f);
        }
        self.write(&entry)
    }

    pub fn flush(&self) -> std::io::Result<()> {
        self.writer.lock().flush()
    }
}

impl Drop for SessionLogWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// Read every entry under `<logs_dir>/raw`, sorted by timestamp
pub fn read_all_entries(logs_dir: impl AsRef<Path>) -> std::io::Result<Vec<JsonLogEntry>> {
    read_matching(logs_dir.as_ref(), |_| true)
}

/// Read entries from files whose name starts with `date` (YYYY-MM-DD)
pub fn read_entries_for_date(
    logs_dir: impl AsRef<Path>,
    date: &str,
) -> std::io::Result<Vec<JsonLogEntry>> {
    read_matching(logs_dir.as_ref(), |name| name.starts_with(date))
}

fn read_matching(
    logs_dir: &Path,
    keep: impl Fn(&str) -> bool,
) -> std::io::Result<Vec<JsonLogEntry>> {
    let raw_dir = logs_dir.join("raw");
    if !raw_dir.exists() {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for dir_entry in fs::read_dir(&raw_dir)? {
        let path = dir_entry?.path();
        let Some(name) = path.file_name().and_then(|f| f.to_str()) else {
            continue;
        };
        if !name.ends_with(".jsonl") || !keep(name) {
            continue;
        }

        let content = fs::read_to_string(&path)?;
        for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
            match JsonLogEntry::from_json_line(line) {
                Ok(entry) => entries.push(entry),
                // A torn final line from a crashed writer is skipped
                Err(e) => tracing::debug!(?path, error = %e, "Skipping unparseable log line"),
            }
        }
    }

    entries.sort_by(|a, b| a.ts.cmp(&b.ts));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_writer_creates_directory_structure() {
        let temp = TempDir::new().unwrap();
        let logs_dir = temp.path().join("logs");

        let writer = SessionLogWriter::new(&logs_dir, "4kX9pQ2m").unwrap();

        assert!(logs_dir.join("raw").exists());
        assert!(writer.path().exists());
        assert!(writer.path().to_string_lossy().ends_with("_4kX9pQ2m.jsonl"));
    }

    #[test]
    fn test_writer_appends_entries() {
        let temp = TempDir::new().unwrap();
        let writer = SessionLogWriter::new(temp.path(), "a").unwrap();

        writer.write_raw("info", "test", "First", None).unwrap();
        writer
            .write_raw("debug", "test", "Second", Some(serde_json::json!({"n": 1})))
            .unwrap();

        let content = fs::read_to_string(writer.path()).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("First"));
        assert!(lines[1].contains("\"n\":1"));
    }

    #[test]
    fn test_read_all_entries_merges_sessions() {
        let temp = TempDir::new().unwrap();

        let first = SessionLogWriter::new(temp.path(), "one").unwrap();
        let second = SessionLogWriter::new(temp.path(), "two").unwrap();
        first.write_raw("info", "sync", "One connected", None).unwrap();
        second.write_raw("info", "sync", "Two connected", None).unwrap();
        drop(first);
        drop(second);

        // Garbage lines are skipped, not fatal
        fs::write(temp.path().join("raw").join("broken.jsonl"), "{oops\n").unwrap();

        let entries = read_all_entries(temp.path()).unwrap();
        assert_eq!(entries.len(), 2);
        let sessions: Vec<_> = entries.iter().map(|e| e.session.as_str()).collect();
        assert!(sessions.contains(&"one"));
        assert!(sessions.contains(&"two"));
    }

    #[test]
    fn test_read_entries_for_date_filters_by_name() {
        let temp = TempDir::new().unwrap();
        let writer = SessionLogWriter::new(temp.path(), "today").unwrap();
        writer.write_raw("info", "t", "hello", None).unwrap();

        let today = chrono::Local::now().format("%Y-%m-%d").to_string();
        assert_eq!(read_entries_for_date(temp.path(), &today).unwrap().len(), 1);
        assert!(read_entries_for_date(temp.path(), "1999-01-01")
            .unwrap()
            .is_empty());
        assert!(read_all_entries(temp.path().join("missing"))
            .unwrap()
            .is_empty());
    }
}
