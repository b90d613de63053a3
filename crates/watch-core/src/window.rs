use crate::api::AuditApi;
use crate::error::WatchError;
use crate::model::{AuditPage, AuditRun, RepoId};
use serde::Serialize;
use tracing::debug;

/// Client-held, offset-paged view of one repository's audit history,
/// newest first.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AuditWindow {
    pub repo_id: RepoId,
    pub items: Vec<AuditRun>,
    pub total: u64,
    /// Offset of the furthest page loaded so far.
    pub offset: u64,
    pub limit: u64,
    pub loading: bool,
}

impl AuditWindow {
    pub fn new(repo_id: impl Into<RepoId>, limit: u64) -> Self {
        Self {
            repo_id: repo_id.into(),
            limit: limit.max(1),
            ..Self::default()
        }
    }

    pub fn reset(&mut self) {
        self.items.clear();
        self.total = 0;
        self.offset = 0;
        self.loading = false;
    }

    /// Where the next "load more" page starts.
    pub fn next_offset(&self) -> u64 {
        self.offset.saturating_add(self.limit)
    }

    pub fn has_more(&self) -> bool {
        self.next_offset() < self.total
    }

    /// Page size for a refresh from offset 0 that re-reads every loaded row.
    pub fn refresh_limit(&self) -> u64 {
        u64::try_from(self.items.len())
            .unwrap_or(u64::MAX)
            .max(self.limit)
    }

    /// Merges a page fetched at `offset` with the window's page size.
    pub fn apply_page(&mut self, offset: u64, page: AuditPage) {
        self.apply_span(offset, self.limit, page);
    }

    /// Merges a page fetched at `offset` with page size `limit`: the slice it
    /// covers is replaced, anything past it is kept, and a page starting at
    /// the end is appended. `offset` never points past the last loaded page.
    pub fn apply_span(&mut self, offset: u64, limit: u64, page: AuditPage) {
        let len = self.items.len();
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(len);
        let span = usize::try_from(limit).unwrap_or(usize::MAX);
        let end = start.saturating_add(span).min(len);
        debug!(
            repo_id = %self.repo_id,
            offset,
            limit,
            replaced = end - start,
            received = page.items.len(),
            total = page.total,
            "Applying audit page"
        );
        self.items.splice(start..end, page.items);
        self.total = page.total;
        self.offset = self.offset.max(offset).min(self.last_page_offset());
    }

    fn last_page_offset(&self) -> u64 {
        let len = u64::try_from(self.items.len()).unwrap_or(u64::MAX);
        let limit = self.limit.max(1);
        (len.saturating_sub(1) / limit) * limit
    }

    /// Fetches one page and merges it. On failure the window is untouched.
    pub async fn load_page(
        &mut self,
        api: &dyn AuditApi,
        offset: u64,
    ) -> Result<&AuditWindow, WatchError> {
        let page = api.list_audits(&self.repo_id, self.limit, offset).await?;
        self.apply_page(offset, page);
        Ok(self)
    }
}
