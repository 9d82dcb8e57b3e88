//! File writer that rotates on day change or when the current file would exceed a
//! configured size, indexing same-day rotations with a trailing `.N` suffix.
//!
//! Grounded on `AsyncLogger::loop`'s reopen logic: a new file is opened when the
//! calendar day (in the local timezone) changes or the current file's size has crossed
//! the configured maximum, whichever comes first.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

/// A `Write` implementation suitable for wrapping in `tracing_appender::non_blocking`,
/// rotating the backing file transparently as writes cross the size or date boundary.
pub struct RotatingWriter {
    file_stem: String,
    directory: PathBuf,
    max_file_size: u64,
    date: String,
    index: u32,
    file: Option<File>,
    written: u64,
}

impl RotatingWriter {
    /// `file_stem` names the logical stream (e.g. `"rapidrpc_rpc"` or `"rapidrpc_app"`);
    /// `directory` is the target directory, created if missing.
    pub fn new(file_stem: impl Into<String>, directory: impl Into<PathBuf>, max_file_size: u64) -> Self {
        Self {
            file_stem: file_stem.into(),
            directory: directory.into(),
            max_file_size: max_file_size.max(1),
            date: String::new(),
            index: 0,
            file: None,
            written: 0,
        }
    }

    fn today() -> String {
        chrono::Local::now().format("%Y%m%d").to_string()
    }

    fn path_for(&self) -> PathBuf {
        self.directory.join(format!("{}_{}_log.{}", self.file_stem, self.date, self.index))
    }

    fn roll_if_needed(&mut self) -> io::Result<()> {
        let today = Self::today();
        let day_changed = today != self.date;
        let size_exceeded = self.written >= self.max_file_size;

        if self.file.is_none() || day_changed || size_exceeded {
            if day_changed {
                self.date = today;
                self.index = 0;
            } else if size_exceeded {
                self.index += 1;
            }

            std::fs::create_dir_all(&self.directory)?;
            let path = self.path_for();
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            self.written = file.metadata()?.len();
            self.file = Some(file);
        }
        Ok(())
    }
}

impl Write for RotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.roll_if_needed()?;
        let file = self.file.as_mut().expect("roll_if_needed always sets a file");
        let written = file.write(buf)?;
        self.written += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_write_creates_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = RotatingWriter::new("stream", dir.path(), 1024);
        writer.write_all(b"hello\n").unwrap();
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn exceeding_max_size_rolls_to_next_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = RotatingWriter::new("stream", dir.path(), 4);
        writer.write_all(b"12345").unwrap();
        writer.write_all(b"more").unwrap();
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 2, "expected two distinct indexed files");
    }
}
