//! JSONL audit log of conversation turns

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use uuid::Uuid;

use crate::config::Config;
use crate::error::Result;
use crate::session::Turn;

/// Append-only JSONL log, one file per session.
///
/// The in-memory [`Session`](crate::session::Session) is the source of
/// truth for history windows; this log exists for inspection and audit.
pub struct TurnLog {
    base_path: PathBuf,
}

impl TurnLog {
    /// Create a new turn log rooted at the configured session directory
    pub fn new(config: &Config) -> Result<Self> {
        let base_path = config.session_log_dir();
        std::fs::create_dir_all(&base_path)?;

        Ok(Self { base_path })
    }

    fn log_path(&self, session_id: Uuid) -> PathBuf {
        self.base_path.join(format!("{}.jsonl", session_id))
    }

    /// Append a turn to the session's log
    pub fn append(&self, session_id: Uuid, turn: &Turn) -> Result<()> {
        let path = self.log_path(session_id);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;

        let json = serde_json::to_string(turn)?;
        writeln!(file, "{}", json)?;

        Ok(())
    }

    /// Read all turns logged for a session
    pub fn read_all(&self, session_id: Uuid) -> Result<Vec<Turn>> {
        let path = self.log_path(session_id);

        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&path)?;
        let reader = BufReader::new(file);

        let mut turns = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let turn: Turn = serde_json::from_str(&line)?;
            turns.push(turn);
        }

        Ok(turns)
    }

    /// Read the last N turns logged for a session
    pub fn read_last_n(&self, session_id: Uuid, n: usize) -> Result<Vec<Turn>> {
        let all = self.read_all(session_id)?;
        let start = all.len().saturating_sub(n);
        Ok(all[start..].to_vec())
    }

    /// Count turns logged for a session
    pub fn count(&self, session_id: Uuid) -> Result<usize> {
        Ok(self.read_all(session_id)?.len())
    }
}
