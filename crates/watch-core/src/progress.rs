use crate::model::{RepoId, ScanProgress};

/// Last file-level scan progress reported for one repository.
#[derive(Clone, Debug, Default)]
pub struct ProgressTracker {
    repo_id: RepoId,
    current: Option<ScanProgress>,
}

impl ProgressTracker {
    pub fn new(repo_id: impl Into<RepoId>) -> Self {
        Self {
            repo_id: repo_id.into(),
            current: None,
        }
    }

    pub fn current(&self) -> Option<&ScanProgress> {
        self.current.as_ref()
    }

    /// Last write wins. Updates for any other repository are dropped and
    /// `false` is returned.
    pub fn update(
        &mut self,
        repo_id: &str,
        file: Option<String>,
        files_done: u32,
        files_total: u32,
    ) -> bool {
        if repo_id != self.repo_id {
            return false;
        }
        self.current = Some(ScanProgress {
            current_file: file,
            files_done,
            files_total,
        });
        true
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}
