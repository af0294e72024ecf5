//! Transition journal
//!
//! Appends one JSON line per controller transition. Staged failures are
//! written with their own `kind` so they can never be mistaken for genuine
//! ones when the trail is reviewed.

use crate::flow::{DemoStep, Trigger};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Transition,
    Failure,
    ScriptedServiceFailure,
}

/// Entry in the journal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp: DateTime<Utc>,
    pub session_id: Uuid,
    pub trigger: Trigger,
    pub from: DemoStep,
    pub to: DemoStep,
    pub kind: EntryKind,
    pub signature: Option<String>,
    pub message: Option<String>,
}

/// Writer for journal entries
struct JournalWriter {
    path: PathBuf,
}

impl JournalWriter {
    fn write(&self, entry: &JournalEntry) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}

pub struct TransitionJournal {
    session_id: Uuid,
    writer: Mutex<JournalWriter>,
}

impl TransitionJournal {
    /// Open a journal at `path` under a fresh session id
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            writer: Mutex::new(JournalWriter { path: path.into() }),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Build an entry stamped with the current time. Nothing is written.
    pub fn entry(
        &self,
        trigger: Trigger,
        from: DemoStep,
        to: DemoStep,
        kind: EntryKind,
        signature: Option<String>,
        message: Option<String>,
    ) -> JournalEntry {
        JournalEntry {
            timestamp: Utc::now(),
            session_id: self.session_id,
            trigger,
            from,
            to,
            kind,
            signature,
            message,
        }
    }

    /// Write the entries returned by `drain`.
    ///
    /// `drain` runs under the writer lock, so batches drained by concurrent
    /// callers land in the order they were drained. Write failures are
    /// logged and swallowed.
    pub fn append_from(&self, drain: impl FnOnce() -> Vec<JournalEntry>) {
        let writer = self
            .writer
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        for entry in drain() {
            if let Err(e) = writer.write(&entry) {
                tracing::warn!(error = %e, "Failed to write journal entry");
            }
        }
    }

    /// Read every entry from a journal file
    pub fn read_entries(path: &Path) -> Result<Vec<JournalEntry>> {
        let file = std::fs::File::open(path)?;
        let mut entries = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }
        Ok(entries)
    }
}

impl std::fmt::Debug for TransitionJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionJournal")
            .field("session_id", &self.session_id)
            .finish()
    }
}
