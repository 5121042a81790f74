//! Journal - append-only JSONL copy of the ledger
//!
//! Every entry is flushed as soon as it is written, so a session that dies
//! before finalize still leaves its timeline behind.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::LedgerEntry;

pub struct Journal {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal").field("path", &self.path).finish()
    }
}

impl Journal {
    /// Open (or create) the journal file for appending
    pub fn open(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref().to_path_buf();
        debug!(?path, "Journal::open: called");
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one entry as a JSON line
    pub fn append(&mut self, entry: &LedgerEntry) -> eyre::Result<()> {
        debug!(step = entry.step, "Journal::append: called");
        let json = serde_json::to_string(entry)?;
        writeln!(self.writer, "{}", json)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Read every entry back from a journal file
pub fn read_journal(path: impl AsRef<Path>) -> eyre::Result<Vec<LedgerEntry>> {
    let content = fs::read_to_string(path.as_ref())?;
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(Into::into))
        .collect()
}
