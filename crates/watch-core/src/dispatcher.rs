use crate::error::WatchError;
use crate::events::{BuildPhase, WatchEvent};
use crate::health::{HealthScore, health_score};
use crate::model::{AuditPage, ProjectSummary, RepoId, ScanProgress, SyncReport, SyncState};
use crate::progress::ProgressTracker;
use crate::sync::SyncCoordinator;
use crate::window::AuditWindow;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchReason {
    Refresh,
    LoadMore,
}

/// Side effect the dispatcher asks its runtime to perform. Each one comes
/// back as exactly one [`Completion`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Effect {
    /// `epoch` is echoed back in the completion; pages fetched before the
    /// window was last reset are dropped.
    FetchPage {
        repo_id: RepoId,
        offset: u64,
        limit: u64,
        reason: FetchReason,
        epoch: u64,
    },
    BeginSync {
        repo_id: RepoId,
    },
    FetchProjects,
}

#[derive(Clone, Debug)]
pub enum Completion {
    Page {
        repo_id: RepoId,
        offset: u64,
        limit: u64,
        reason: FetchReason,
        epoch: u64,
        result: Result<AuditPage, WatchError>,
    },
    Sync {
        repo_id: RepoId,
        result: Result<SyncReport, WatchError>,
    },
    Projects {
        result: Result<Vec<ProjectSummary>, WatchError>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Transient user-facing notification.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Notice {
    pub seq: u64,
    pub level: NoticeLevel,
    pub message: String,
}

/// Read-only view handed to the presentation layer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WatchSnapshot {
    pub subject: RepoId,
    pub window: AuditWindow,
    pub sync: SyncState,
    pub last_sync: Option<SyncReport>,
    pub progress: Option<ScanProgress>,
    pub health: HealthScore,
    pub projects: Vec<ProjectSummary>,
    pub notices: Vec<Notice>,
    /// Any fetch or sync request still outstanding.
    pub busy: bool,
}

/// At most one fetch in flight; requests made meanwhile collapse into a
/// single trailing fetch.
#[derive(Clone, Copy, Debug, Default)]
struct FetchGate {
    in_flight: bool,
    trailing: bool,
}

impl FetchGate {
    fn request(&mut self) -> bool {
        if self.in_flight {
            self.trailing = true;
            return false;
        }
        self.in_flight = true;
        true
    }

    fn settle(&mut self) -> bool {
        self.in_flight = false;
        if self.trailing {
            self.trailing = false;
            self.in_flight = true;
            return true;
        }
        false
    }
}

struct RepoView {
    window: AuditWindow,
    sync: SyncCoordinator,
    progress: ProgressTracker,
    refresh: FetchGate,
    load_more: Option<u64>,
    epoch: u64,
}

impl RepoView {
    fn new(repo_id: &str, limit: u64) -> Self {
        Self {
            window: AuditWindow::new(repo_id, limit),
            sync: SyncCoordinator::new(repo_id),
            progress: ProgressTracker::new(repo_id),
            refresh: FetchGate::default(),
            load_more: None,
            epoch: 0,
        }
    }

    /// Empties the window and forgets fetches issued before now.
    fn reset(&mut self) {
        self.window.reset();
        self.refresh = FetchGate::default();
        self.load_more = None;
        self.epoch += 1;
    }

    fn mark_loading(&mut self) {
        self.window.loading = self.refresh.in_flight || self.load_more.is_some();
    }

    /// Re-reads everything loaded so far in one fetch from the top, so rows
    /// that shifted down since the last load land in the right place.
    fn refresh_effect(&self) -> Effect {
        Effect::FetchPage {
            repo_id: self.window.repo_id.clone(),
            offset: 0,
            limit: self.window.refresh_limit(),
            reason: FetchReason::Refresh,
            epoch: self.epoch,
        }
    }

    fn request_refresh(&mut self) -> Option<Effect> {
        let issue = self.refresh.request();
        self.mark_loading();
        if issue {
            debug!(
                repo_id = %self.window.repo_id,
                rows = self.window.items.len(),
                "Refreshing audit window"
            );
            Some(self.refresh_effect())
        } else {
            debug!(
                repo_id = %self.window.repo_id,
                "Refresh coalesced into in-flight fetch"
            );
            None
        }
    }
}

/// Routes push events, user commands and fetch completions for one subject
/// repository into its stores, and decides which fetches to issue.
pub struct Dispatcher {
    subject: RepoId,
    page_limit: u64,
    repos: HashMap<RepoId, RepoView>,
    projects: Vec<ProjectSummary>,
    projects_gate: FetchGate,
    notices: VecDeque<Notice>,
    notice_capacity: usize,
    next_notice: u64,
}

impl Dispatcher {
    pub fn new(subject: impl Into<RepoId>, page_limit: u64, notice_capacity: usize) -> Self {
        let subject = subject.into();
        let page_limit = page_limit.max(1);
        let mut repos = HashMap::new();
        repos.insert(subject.clone(), RepoView::new(&subject, page_limit));
        Self {
            subject,
            page_limit,
            repos,
            projects: Vec::new(),
            projects_gate: FetchGate::default(),
            notices: VecDeque::new(),
            notice_capacity: notice_capacity.max(1),
            next_notice: 0,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Initial load: the subject's first page and the project list.
    pub fn open(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        let view = self.subject_view_mut();
        view.reset();
        effects.extend(view.request_refresh());
        effects.extend(self.request_projects());
        effects
    }

    /// Switches the viewed repository. State of the previous subject stays
    /// keyed under its id; late completions for it land there.
    pub fn set_subject(&mut self, subject: impl Into<RepoId>) -> Vec<Effect> {
        let subject = subject.into();
        if subject == self.subject {
            return Vec::new();
        }
        info!(from = %self.subject, to = %subject, "Switching subject repo");
        self.subject = subject;
        let view = self.subject_view_mut();
        view.reset();
        view.request_refresh().into_iter().collect()
    }

    pub fn refresh(&mut self) -> Vec<Effect> {
        self.subject_view_mut().request_refresh().into_iter().collect()
    }

    pub fn dispatch(&mut self, event: WatchEvent) -> Vec<Effect> {
        match event {
            WatchEvent::SyncProgress(payload) => {
                if payload.repo_id != self.subject {
                    return self.ignore_foreign("sync_progress", &payload.repo_id);
                }
                let view = self.subject_view_mut();
                if payload.is_running() {
                    if view.sync.observe(true) {
                        info!(repo_id = %payload.repo_id, "Server reported sync running");
                    }
                    return Vec::new();
                }
                view.sync.observe(false);
                view.progress.clear();
                info!(
                    repo_id = %payload.repo_id,
                    status = %payload.status,
                    "Server reported sync finished"
                );
                view.request_refresh().into_iter().collect()
            }
            WatchEvent::AuditProgress(payload) => {
                if payload.repo_id != self.subject {
                    return self.ignore_foreign("audit_progress", &payload.repo_id);
                }
                self.subject_view_mut().progress.update(
                    &payload.repo_id,
                    payload.file,
                    payload.files_done,
                    payload.files_total,
                );
                Vec::new()
            }
            WatchEvent::AuditUpdate(payload) => {
                if payload.repo_id != self.subject {
                    return self.ignore_foreign("audit_update", &payload.repo_id);
                }
                self.subject_view_mut()
                    .request_refresh()
                    .into_iter()
                    .collect()
            }
            WatchEvent::ContractProgress(payload) => {
                if !payload.is_final() {
                    return Vec::new();
                }
                debug!(total = payload.total, "Contract generation finished");
                self.request_projects().into_iter().collect()
            }
            WatchEvent::Build(phase) => {
                debug!(phase = ?phase, "Build event");
                if phase == BuildPhase::Error {
                    warn!("Server reported a build error");
                }
                self.request_projects().into_iter().collect()
            }
            WatchEvent::Other(kind) => {
                debug!(kind = %kind, "Ignoring unhandled event type");
                Vec::new()
            }
        }
    }

    pub fn start_sync(&mut self) -> Vec<Effect> {
        let view = self.subject_view_mut();
        match view.sync.start() {
            Ok(()) => vec![Effect::BeginSync {
                repo_id: view.window.repo_id.clone(),
            }],
            Err(err) => {
                self.push_notice(NoticeLevel::Error, err.to_string());
                Vec::new()
            }
        }
    }

    pub fn load_more(&mut self) -> Vec<Effect> {
        let view = self.subject_view_mut();
        if view.load_more.is_some() {
            debug!(repo_id = %view.window.repo_id, "Load more already in flight");
            return Vec::new();
        }
        if !view.window.has_more() {
            debug!(
                repo_id = %view.window.repo_id,
                total = view.window.total,
                "No more audits to load"
            );
            return Vec::new();
        }
        let offset = view.window.next_offset();
        view.load_more = Some(offset);
        view.mark_loading();
        vec![Effect::FetchPage {
            repo_id: view.window.repo_id.clone(),
            offset,
            limit: view.window.limit,
            reason: FetchReason::LoadMore,
            epoch: view.epoch,
        }]
    }

    pub fn complete(&mut self, completion: Completion) -> Vec<Effect> {
        match completion {
            Completion::Page {
                repo_id,
                offset,
                limit,
                reason,
                epoch,
                result,
            } => self.complete_page(&repo_id, offset, limit, reason, epoch, result),
            Completion::Sync { repo_id, result } => self.complete_sync(&repo_id, result),
            Completion::Projects { result } => self.complete_projects(result),
        }
    }

    fn complete_page(
        &mut self,
        repo_id: &str,
        offset: u64,
        limit: u64,
        reason: FetchReason,
        epoch: u64,
        result: Result<AuditPage, WatchError>,
    ) -> Vec<Effect> {
        let Some(view) = self.repos.get_mut(repo_id) else {
            debug!(repo_id, "Discarding page for unknown repo");
            return Vec::new();
        };
        if epoch != view.epoch {
            debug!(repo_id, offset, reason = ?reason, "Discarding page fetched before reset");
            return Vec::new();
        }
        let failure = match result {
            Ok(page) => {
                view.window.apply_span(offset, limit, page);
                None
            }
            Err(err) => {
                warn!(repo_id, offset, reason = ?reason, error = %err, "Loading audits failed");
                Some(err)
            }
        };
        let mut effects = Vec::new();
        match reason {
            FetchReason::Refresh => {
                if view.refresh.settle() {
                    effects.push(view.refresh_effect());
                }
            }
            FetchReason::LoadMore => view.load_more = None,
        }
        view.mark_loading();
        if let Some(err) = failure {
            self.push_notice(NoticeLevel::Error, format!("Loading audits failed: {err}"));
        }
        effects
    }

    fn complete_sync(
        &mut self,
        repo_id: &str,
        result: Result<SyncReport, WatchError>,
    ) -> Vec<Effect> {
        let Some(view) = self.repos.get_mut(repo_id) else {
            return Vec::new();
        };
        view.sync.finish(&result);
        view.progress.clear();
        match result {
            Ok(report) => {
                let effects = view.request_refresh().into_iter().collect();
                self.push_notice(
                    NoticeLevel::Info,
                    format!(
                        "Sync finished: {} synced, {} skipped",
                        report.synced, report.skipped
                    ),
                );
                effects
            }
            Err(err) => {
                self.push_notice(NoticeLevel::Error, format!("Sync failed: {err}"));
                Vec::new()
            }
        }
    }

    fn complete_projects(
        &mut self,
        result: Result<Vec<ProjectSummary>, WatchError>,
    ) -> Vec<Effect> {
        match result {
            Ok(projects) => {
                debug!(count = projects.len(), "Project list refreshed");
                self.projects = projects;
            }
            Err(err) => {
                warn!(error = %err, "Loading projects failed");
                self.push_notice(NoticeLevel::Error, format!("Loading projects failed: {err}"));
            }
        }
        if self.projects_gate.settle() {
            vec![Effect::FetchProjects]
        } else {
            Vec::new()
        }
    }

    fn request_projects(&mut self) -> Option<Effect> {
        self.projects_gate.request().then_some(Effect::FetchProjects)
    }

    fn ignore_foreign(&self, kind: &str, repo_id: &str) -> Vec<Effect> {
        debug!(kind, repo_id, subject = %self.subject, "Ignoring event for another repo");
        Vec::new()
    }

    fn subject_view(&self) -> &RepoView {
        &self.repos[&self.subject]
    }

    fn subject_view_mut(&mut self) -> &mut RepoView {
        let limit = self.page_limit;
        self.repos
            .entry(self.subject.clone())
            .or_insert_with_key(|key| RepoView::new(key, limit))
    }

    fn push_notice(&mut self, level: NoticeLevel, message: String) {
        self.next_notice += 1;
        self.notices.push_back(Notice {
            seq: self.next_notice,
            level,
            message,
        });
        while self.notices.len() > self.notice_capacity {
            self.notices.pop_front();
        }
    }

    pub fn window(&self) -> &AuditWindow {
        &self.subject_view().window
    }

    pub fn sync_state(&self) -> SyncState {
        self.subject_view().sync.state()
    }

    pub fn progress(&self) -> Option<&ScanProgress> {
        self.subject_view().progress.current()
    }

    pub fn health(&self) -> HealthScore {
        health_score(&self.window().items)
    }

    pub fn projects(&self) -> &[ProjectSummary] {
        &self.projects
    }

    pub fn notices(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter()
    }

    pub fn snapshot(&self) -> WatchSnapshot {
        let view = self.subject_view();
        WatchSnapshot {
            subject: self.subject.clone(),
            window: view.window.clone(),
            sync: view.sync.state(),
            last_sync: view.sync.last_report(),
            progress: view.progress.current().cloned(),
            health: health_score(&view.window.items),
            projects: self.projects.clone(),
            notices: self.notices.iter().cloned().collect(),
            busy: view.window.loading
                || view.sync.request_in_flight()
                || self.projects_gate.in_flight,
        }
    }
}

#[cfg(test)]
mod tests;
