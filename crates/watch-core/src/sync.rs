use crate::error::WatchError;
use crate::model::{RepoId, SyncReport, SyncState};
use tracing::{info, warn};

/// Idle/Running state machine for one repository. Locally requested syncs and
/// server-pushed progress drive the same state so the indicator cannot split.
#[derive(Clone, Debug)]
pub struct SyncCoordinator {
    repo_id: RepoId,
    state: SyncState,
    request_in_flight: bool,
    last_report: Option<SyncReport>,
}

impl SyncCoordinator {
    pub fn new(repo_id: impl Into<RepoId>) -> Self {
        Self {
            repo_id: repo_id.into(),
            state: SyncState::Idle,
            request_in_flight: false,
            last_report: None,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn last_report(&self) -> Option<SyncReport> {
        self.last_report
    }

    pub fn request_in_flight(&self) -> bool {
        self.request_in_flight
    }

    /// Accepts a local start request. The caller issues exactly one
    /// "begin sync" request per `Ok`.
    pub fn start(&mut self) -> Result<(), WatchError> {
        if self.state.is_running() || self.request_in_flight {
            warn!(repo_id = %self.repo_id, "Sync already running");
            return Err(WatchError::AlreadyRunning {
                repo: self.repo_id.clone(),
            });
        }
        info!(repo_id = %self.repo_id, "Starting sync");
        self.state = SyncState::Running;
        self.request_in_flight = true;
        Ok(())
    }

    /// Applies a server-reported state. Returns true when the state changed.
    pub fn observe(&mut self, running: bool) -> bool {
        let next = if running {
            SyncState::Running
        } else {
            SyncState::Idle
        };
        let changed = self.state != next;
        self.state = next;
        changed
    }

    /// Settles the locally initiated request. Either outcome ends `Running`.
    pub fn finish(&mut self, result: &Result<SyncReport, WatchError>) {
        self.request_in_flight = false;
        self.state = SyncState::Idle;
        match result {
            Ok(report) => {
                info!(
                    repo_id = %self.repo_id,
                    synced = report.synced,
                    skipped = report.skipped,
                    "Sync request completed"
                );
                self.last_report = Some(*report);
            }
            Err(err) => {
                warn!(repo_id = %self.repo_id, error = %err, "Sync request failed");
            }
        }
    }
}
