use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Opaque repository identifier. The server may send it as a string or an
/// integer; it is normalised to a string on the way in.
pub type RepoId = String;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal verdict of a completed audit run. Values the server sends that
/// are not one of the three known verdicts are kept as `Other`.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Verdict {
    Pass,
    Fail,
    Error,
    Other(String),
}

impl Verdict {
    pub fn as_str(&self) -> &str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
            Verdict::Error => "ERROR",
            Verdict::Other(value) => value.as_str(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Verdict::Fail | Verdict::Error)
    }
}

impl From<String> for Verdict {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PASS" => Verdict::Pass,
            "FAIL" => Verdict::Fail,
            "ERROR" => Verdict::Error,
            _ => Verdict::Other(value),
        }
    }
}

impl From<Verdict> for String {
    fn from(value: Verdict) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit execution against one commit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditRun {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub overall_result: Option<Verdict>,
    #[serde(default)]
    pub commit_sha: Option<String>,
    #[serde(default)]
    pub commit_message: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl AuditRun {
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Verdict of a completed run; `None` while the run is still in flight.
    pub fn verdict(&self) -> Option<&Verdict> {
        if self.is_completed() {
            self.overall_result.as_ref()
        } else {
            None
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditPage {
    pub items: Vec<AuditRun>,
    pub total: u64,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    #[serde(default)]
    pub synced: u32,
    #[serde(default)]
    pub skipped: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub repo_url: Option<String>,
}

/// The projects endpoint answers either `{ "items": [...] }` or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ProjectList {
    Wrapped { items: Vec<ProjectSummary> },
    Bare(Vec<ProjectSummary>),
}

impl ProjectList {
    pub fn into_vec(self) -> Vec<ProjectSummary> {
        match self {
            ProjectList::Wrapped { items } => items,
            ProjectList::Bare(items) => items,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    #[default]
    Idle,
    Running,
}

impl SyncState {
    pub fn is_running(&self) -> bool {
        matches!(self, SyncState::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Idle => "idle",
            SyncState::Running => "running",
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ScanProgress {
    pub current_file: Option<String>,
    pub files_done: u32,
    pub files_total: u32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Text(String),
    Int(i64),
    Unsigned(u64),
}

pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match IdRepr::deserialize(deserializer)? {
        IdRepr::Text(value) => value,
        IdRepr::Int(value) => value.to_string(),
        IdRepr::Unsigned(value) => value.to_string(),
    })
}
