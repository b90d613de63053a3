use crate::error::WatchError;
use crate::model::{RepoId, deserialize_id};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw push message as it arrives on the wire: `{ "type": ..., "payload": ... }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl EventEnvelope {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    pub fn from_json(line: &str) -> Result<Self, WatchError> {
        serde_json::from_str(line).map_err(|err| WatchError::MalformedEvent {
            kind: "<envelope>".to_string(),
            detail: err.to_string(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SyncProgressPayload {
    #[serde(deserialize_with = "deserialize_id")]
    pub repo_id: RepoId,
    pub status: String,
}

impl SyncProgressPayload {
    pub fn is_running(&self) -> bool {
        self.status == "running"
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AuditProgressPayload {
    #[serde(deserialize_with = "deserialize_id")]
    pub repo_id: RepoId,
    #[serde(default, alias = "current_file")]
    pub file: Option<String>,
    #[serde(default, alias = "filesDone")]
    pub files_done: u32,
    #[serde(default, alias = "filesTotal")]
    pub files_total: u32,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AuditUpdatePayload {
    #[serde(deserialize_with = "deserialize_id")]
    pub repo_id: RepoId,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ContractProgressPayload {
    pub status: String,
    pub index: i64,
    pub total: i64,
}

impl ContractProgressPayload {
    /// The last contract of a generation run finished.
    pub fn is_final(&self) -> bool {
        self.status == "done" && self.index == self.total - 1
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildPhase {
    Started,
    Complete,
    Error,
}

/// Push events the dispatcher understands.
#[derive(Clone, Debug, PartialEq)]
pub enum WatchEvent {
    SyncProgress(SyncProgressPayload),
    AuditProgress(AuditProgressPayload),
    AuditUpdate(AuditUpdatePayload),
    ContractProgress(ContractProgressPayload),
    Build(BuildPhase),
    Other(String),
}

impl WatchEvent {
    pub fn decode(envelope: &EventEnvelope) -> Result<Self, WatchError> {
        let kind = envelope.kind.as_str();
        Ok(match kind {
            "sync_progress" => WatchEvent::SyncProgress(payload(envelope)?),
            "audit_progress" => WatchEvent::AuditProgress(payload(envelope)?),
            "audit_update" => WatchEvent::AuditUpdate(payload(envelope)?),
            "contract_progress" => WatchEvent::ContractProgress(payload(envelope)?),
            "build_started" => WatchEvent::Build(BuildPhase::Started),
            "build_complete" => WatchEvent::Build(BuildPhase::Complete),
            "build_error" => WatchEvent::Build(BuildPhase::Error),
            other => WatchEvent::Other(other.to_string()),
        })
    }

    pub fn kind(&self) -> &str {
        match self {
            WatchEvent::SyncProgress(_) => "sync_progress",
            WatchEvent::AuditProgress(_) => "audit_progress",
            WatchEvent::AuditUpdate(_) => "audit_update",
            WatchEvent::ContractProgress(_) => "contract_progress",
            WatchEvent::Build(BuildPhase::Started) => "build_started",
            WatchEvent::Build(BuildPhase::Complete) => "build_complete",
            WatchEvent::Build(BuildPhase::Error) => "build_error",
            WatchEvent::Other(kind) => kind.as_str(),
        }
    }
}

fn payload<T: DeserializeOwned>(envelope: &EventEnvelope) -> Result<T, WatchError> {
    serde_json::from_value(envelope.payload.clone()).map_err(|err| WatchError::MalformedEvent {
        kind: envelope.kind.clone(),
        detail: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_audit_progress_with_camel_case_fields() {
        let envelope = EventEnvelope::new(
            "audit_progress",
            json!({ "repo_id": 7, "file": "src/lib.rs", "filesDone": 3, "filesTotal": 9 }),
        );
        let event = WatchEvent::decode(&envelope).unwrap();
        assert_eq!(
            event,
            WatchEvent::AuditProgress(AuditProgressPayload {
                repo_id: "7".to_string(),
                file: Some("src/lib.rs".to_string()),
                files_done: 3,
                files_total: 9,
            })
        );
    }

    #[test]
    fn unknown_type_is_other() {
        let envelope = EventEnvelope::new("heartbeat", Value::Null);
        assert_eq!(
            WatchEvent::decode(&envelope).unwrap(),
            WatchEvent::Other("heartbeat".to_string())
        );
    }

    #[test]
    fn build_events_ignore_payload() {
        let envelope = EventEnvelope::from_json(r#"{"type":"build_error"}"#).unwrap();
        assert_eq!(
            WatchEvent::decode(&envelope).unwrap(),
            WatchEvent::Build(BuildPhase::Error)
        );
    }

    #[test]
    fn mismatched_payload_is_malformed() {
        let envelope = EventEnvelope::new("sync_progress", json!({ "status": "running" }));
        let err = WatchEvent::decode(&envelope).unwrap_err();
        assert!(matches!(err, WatchError::MalformedEvent { kind, .. } if kind == "sync_progress"));
    }

    #[test]
    fn contract_progress_final_only_on_last_index() {
        let last = ContractProgressPayload {
            status: "done".to_string(),
            index: 4,
            total: 5,
        };
        let middle = ContractProgressPayload {
            index: 2,
            ..last.clone()
        };
        let generating = ContractProgressPayload {
            status: "generating".to_string(),
            ..last.clone()
        };
        assert!(last.is_final());
        assert!(!middle.is_final());
        assert!(!generating.is_final());
    }
}
