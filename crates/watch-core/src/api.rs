use crate::error::WatchError;
use crate::model::{AuditPage, ProjectSummary, SyncReport};
use std::future::Future;
use std::pin::Pin;

pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, WatchError>> + Send + 'a>>;

/// Request/response facility the watch core reads server state through.
/// Implementations decide the transport; the core only needs these three calls.
pub trait AuditApi: Send + Sync {
    fn list_audits<'a>(
        &'a self,
        repo_id: &'a str,
        limit: u64,
        offset: u64,
    ) -> ApiFuture<'a, AuditPage>;

    fn begin_sync<'a>(&'a self, repo_id: &'a str) -> ApiFuture<'a, SyncReport>;

    fn list_projects(&self) -> ApiFuture<'_, Vec<ProjectSummary>>;
}
