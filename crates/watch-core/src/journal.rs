use crate::config::default_journal_dir;
use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use uuid::Uuid;

const MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Append-only JSONL record of what a watch or command session did.
#[derive(Clone)]
pub struct ActivityJournal {
    session_id: String,
    base_dir: PathBuf,
    max_bytes: u64,
}

impl ActivityJournal {
    pub fn new() -> anyhow::Result<Self> {
        Self::new_with_dir(default_journal_dir()?, MAX_BYTES)
    }

    pub fn new_with_dir(base_dir: PathBuf, max_bytes: u64) -> anyhow::Result<Self> {
        fs::create_dir_all(&base_dir).context("create journal dir")?;
        Ok(Self {
            session_id: Uuid::new_v4().to_string(),
            base_dir,
            max_bytes,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn record(
        &self,
        event: &str,
        status: JournalStatus,
        repo_id: Option<&str>,
        details: Option<Value>,
        error: Option<&str>,
    ) -> anyhow::Result<String> {
        let ts = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .context("format timestamp")?;
        let entry_id = Uuid::new_v4().to_string();
        let entry = JournalEntry {
            ts,
            level: status.level(),
            event,
            entry_id: &entry_id,
            session_id: &self.session_id,
            status: status.as_str(),
            repo_id,
            error,
            details,
        };
        self.write_entry(&entry)?;
        Ok(entry_id)
    }

    fn write_entry(&self, entry: &JournalEntry<'_>) -> anyhow::Result<()> {
        let date = OffsetDateTime::now_utc()
            .format(format_description!("[year][month][day]"))
            .context("format date")?;
        let path = next_journal_path(&self.base_dir, &date, self.max_bytes);
        let line = serde_json::to_string(entry).context("serialize journal entry")?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open journal {}", path.display()))?;
        writeln!(file, "{line}").context("write journal entry")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum JournalStatus {
    Ok,
    Failed,
    Skipped,
}

impl JournalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JournalStatus::Ok => "ok",
            JournalStatus::Failed => "failed",
            JournalStatus::Skipped => "skipped",
        }
    }

    fn level(&self) -> &'static str {
        match self {
            JournalStatus::Ok => "INFO",
            JournalStatus::Failed => "ERROR",
            JournalStatus::Skipped => "WARN",
        }
    }
}

#[derive(Serialize)]
struct JournalEntry<'a> {
    ts: String,
    level: &'static str,
    event: &'a str,
    entry_id: &'a str,
    session_id: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    repo_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

fn next_journal_path(base_dir: &Path, date: &str, max_bytes: u64) -> PathBuf {
    let mut suffix = 0;
    loop {
        let name = if suffix == 0 {
            format!("journal-{date}.jsonl")
        } else {
            format!("journal-{date}-{suffix}.jsonl")
        };
        let path = base_dir.join(name);
        if let Ok(metadata) = fs::metadata(&path)
            && metadata.len() >= max_bytes
        {
            suffix += 1;
            continue;
        }
        return path;
    }
}
