//! Size-bounded rotating log file.
//!
//! Before a write that would push the active file past `max_bytes`, backups
//! are shifted (`name.4` -> `name.5`, ..., `name` -> `name.1`) and a fresh
//! file is started. At most `backup_count` backups are kept.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct RotatingFileWriter {
    path: PathBuf,
    max_bytes: u64,
    backup_count: u32,
    file: Option<File>,
    size: u64,
}

impl RotatingFileWriter {
    /// Open (or create) the active file in append mode.
    pub fn open(path: impl Into<PathBuf>, max_bytes: u64, backup_count: u32) -> io::Result<Self> {
        let path = path.into();
        let file = open_append(&path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            path,
            max_bytes,
            backup_count,
            file: Some(file),
            size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the n-th backup.
    pub fn backup_path(&self, n: u32) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_os_string();
        name.push(format!(".{}", n));
        PathBuf::from(name)
    }

    fn should_rollover(&self, incoming: usize) -> bool {
        if self.max_bytes == 0 || self.backup_count == 0 {
            return false;
        }
        // A single oversized record still lands in a fresh file.
        self.size > 0 && self.size + incoming as u64 > self.max_bytes
    }

    fn rollover(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }

        for n in (1..self.backup_count).rev() {
            let src = self.backup_path(n);
            if src.exists() {
                let dst = self.backup_path(n + 1);
                if dst.exists() {
                    fs::remove_file(&dst)?;
                }
                fs::rename(&src, &dst)?;
            }
        }

        let first = self.backup_path(1);
        if first.exists() {
            fs::remove_file(&first)?;
        }
        if self.path.exists() {
            fs::rename(&self.path, &first)?;
        }

        self.file = Some(open_append(&self.path)?);
        self.size = 0;
        Ok(())
    }
}

impl Write for RotatingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.should_rollover(buf.len()) {
            self.rollover()?;
        }
        let file = match self.file.take() {
            Some(file) => file,
            // A failed rollover leaves no open file.
            None => {
                let file = open_append(&self.path)?;
                self.size = file.metadata()?.len();
                file
            }
        };
        let file = self.file.insert(file);
        file.write_all(buf)?;
        self.size += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn rotates_when_full() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("limited.log");
        let mut writer = RotatingFileWriter::open(&path, 10, 2).unwrap();

        writer.write_all(b"aaaaaaaa\n").unwrap(); // 9 bytes
        writer.write_all(b"bbbbbbbb\n").unwrap(); // would be 18 -> rotate
        writer.write_all(b"cccccccc\n").unwrap(); // rotate again
        writer.write_all(b"dddddddd\n").unwrap(); // oldest backup dropped
        writer.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "dddddddd\n");
        assert_eq!(
            fs::read_to_string(writer.backup_path(1)).unwrap(),
            "cccccccc\n"
        );
        assert_eq!(
            fs::read_to_string(writer.backup_path(2)).unwrap(),
            "bbbbbbbb\n"
        );
        assert!(!writer.backup_path(3).exists());
    }

    #[test]
    fn no_rotation_when_disabled() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("limited.log");

        let mut writer = RotatingFileWriter::open(&path, 0, 5).unwrap();
        for _ in 0..10 {
            writer.write_all(b"0123456789\n").unwrap();
        }
        assert!(!writer.backup_path(1).exists());

        let mut writer = RotatingFileWriter::open(&path, 4, 0).unwrap();
        writer.write_all(b"more\n").unwrap();
        assert!(!writer.backup_path(1).exists());
        assert_eq!(fs::metadata(&path).unwrap().len(), 115);
    }

    #[test]
    fn existing_size_counts() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("limited.log");
        fs::write(&path, "previous run\n").unwrap();

        let mut writer = RotatingFileWriter::open(&path, 16, 1).unwrap();
        writer.write_all(b"new record\n").unwrap();

        assert_eq!(
            fs::read_to_string(writer.backup_path(1)).unwrap(),
            "previous run\n"
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), "new record\n");
    }
}
