//! Append-only run journal
//!
//! Every line is prefixed with the local time as `YYYY-MM-DD HH:MM:SS-`.
//! Writing is best effort: a journal that cannot be written never stops a
//! dispatch run.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Sink for timestamped run messages
pub trait Journal {
    /// Append one message; the implementation adds the timestamp
    fn append_line(&mut self, message: &str);
}

/// Format a journal line
pub fn journal_line(at: NaiveDateTime, message: &str) -> String {
    format!("{}-{}", at.format(TIMESTAMP_FORMAT), message)
}

/// Journal appending to a file, usually `logs/log.txt`
#[derive(Debug, Clone)]
pub struct FileJournal {
    path: PathBuf,
}

impl FileJournal {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn try_append(&self, line: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)
    }
}

impl Journal for FileJournal {
    fn append_line(&mut self, message: &str) {
        let line = journal_line(Local::now().naive_local(), message);
        if let Err(e) = self.try_append(&line) {
            log::warn!("cannot write to journal '{}': {}", self.path.display(), e);
        }
    }
}

/// Journal kept in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryJournal {
    lines: Vec<String>,
}

impl MemoryJournal {
    /// Recorded lines, with timestamps
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Recorded messages, with the timestamp prefix stripped
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.lines
            .iter()
            .map(|line| line.get(TIMESTAMP_LEN + 1..).unwrap_or_default())
    }
}

/// Length of a formatted timestamp
const TIMESTAMP_LEN: usize = "YYYY-MM-DD HH:MM:SS".len();

impl Journal for MemoryJournal {
    fn append_line(&mut self, message: &str) {
        self.lines
            .push(journal_line(Local::now().naive_local(), message));
    }
}
