use super::*;
use crate::events::{
    AuditProgressPayload, AuditUpdatePayload, ContractProgressPayload, SyncProgressPayload,
};
use crate::model::{AuditRun, RunStatus, Verdict};

fn dispatcher() -> Dispatcher {
    Dispatcher::new("r1", 2, 5)
}

fn run(id: &str, status: RunStatus, result: Option<Verdict>) -> AuditRun {
    AuditRun {
        id: id.to_string(),
        status,
        overall_result: result,
        commit_sha: None,
        commit_message: None,
        created_at: None,
    }
}

fn page(ids: &[&str], total: u64) -> AuditPage {
    AuditPage {
        items: ids
            .iter()
            .map(|id| run(id, RunStatus::Completed, Some(Verdict::Pass)))
            .collect(),
        total,
    }
}

fn sync_progress(repo: &str, status: &str) -> WatchEvent {
    WatchEvent::SyncProgress(SyncProgressPayload {
        repo_id: repo.to_string(),
        status: status.to_string(),
    })
}

fn audit_progress(repo: &str, file: &str, done: u32, total: u32) -> WatchEvent {
    WatchEvent::AuditProgress(AuditProgressPayload {
        repo_id: repo.to_string(),
        file: Some(file.to_string()),
        files_done: done,
        files_total: total,
    })
}

fn audit_update(repo: &str) -> WatchEvent {
    WatchEvent::AuditUpdate(AuditUpdatePayload {
        repo_id: repo.to_string(),
    })
}

/// Refresh of "r1" from the top, covering `limit` rows, first window epoch.
fn refresh_of(limit: u64) -> Effect {
    Effect::FetchPage {
        repo_id: "r1".to_string(),
        offset: 0,
        limit,
        reason: FetchReason::Refresh,
        epoch: 1,
    }
}

fn load_more_at(offset: u64, epoch: u64) -> Effect {
    Effect::FetchPage {
        repo_id: "r1".to_string(),
        offset,
        limit: 2,
        reason: FetchReason::LoadMore,
        epoch,
    }
}

fn page_done(
    offset: u64,
    reason: FetchReason,
    result: Result<AuditPage, WatchError>,
) -> Completion {
    page_done_with(offset, 2, reason, 1, result)
}

fn page_done_with(
    offset: u64,
    limit: u64,
    reason: FetchReason,
    epoch: u64,
    result: Result<AuditPage, WatchError>,
) -> Completion {
    Completion::Page {
        repo_id: "r1".to_string(),
        offset,
        limit,
        reason,
        epoch,
        result,
    }
}

fn ids(dispatcher: &Dispatcher) -> Vec<&str> {
    dispatcher
        .window()
        .items
        .iter()
        .map(|run| run.id.as_str())
        .collect()
}

/// Opens the dispatcher and settles the initial fetches with one page.
fn opened(first: AuditPage) -> Dispatcher {
    let mut dispatcher = dispatcher();
    let effects = dispatcher.open();
    assert_eq!(effects, vec![refresh_of(2), Effect::FetchProjects]);
    assert!(
        dispatcher
            .complete(page_done(0, FetchReason::Refresh, Ok(first)))
            .is_empty()
    );
    assert!(
        dispatcher
            .complete(Completion::Projects { result: Ok(Vec::new()) })
            .is_empty()
    );
    dispatcher
}

#[test]
fn sync_running_event_sets_running_and_keeps_progress() {
    let mut dispatcher = opened(page(&["a"], 1));
    dispatcher.dispatch(audit_progress("r1", "src/a.rs", 1, 4));
    let effects = dispatcher.dispatch(sync_progress("r1", "running"));
    assert!(effects.is_empty());
    assert_eq!(dispatcher.sync_state(), SyncState::Running);
    assert_eq!(dispatcher.progress().map(|p| p.files_done), Some(1));
}

#[test]
fn sync_done_event_goes_idle_clears_progress_and_refetches_once() {
    let mut dispatcher = opened(page(&["a"], 1));
    dispatcher.dispatch(sync_progress("r1", "running"));
    dispatcher.dispatch(audit_progress("r1", "src/a.rs", 3, 4));
    let effects = dispatcher.dispatch(sync_progress("r1", "done"));
    assert_eq!(effects, vec![refresh_of(2)]);
    assert_eq!(dispatcher.sync_state(), SyncState::Idle);
    assert_eq!(dispatcher.progress(), None);
}

#[test]
fn events_for_other_repos_are_dropped() {
    let mut dispatcher = opened(page(&["a"], 1));
    dispatcher.dispatch(audit_progress("r1", "src/a.rs", 1, 2));
    assert!(dispatcher.dispatch(audit_progress("r2", "x", 9, 9)).is_empty());
    assert!(dispatcher.dispatch(sync_progress("r2", "running")).is_empty());
    assert!(dispatcher.dispatch(audit_update("r2")).is_empty());
    assert_eq!(dispatcher.progress().map(|p| p.files_done), Some(1));
    assert_eq!(dispatcher.sync_state(), SyncState::Idle);
}

#[test]
fn audit_updates_coalesce_while_fetch_in_flight() {
    let mut dispatcher = opened(page(&["a"], 1));
    assert_eq!(dispatcher.dispatch(audit_update("r1")), vec![refresh_of(2)]);
    assert!(dispatcher.dispatch(audit_update("r1")).is_empty());
    assert!(dispatcher.dispatch(audit_update("r1")).is_empty());
    assert!(dispatcher.snapshot().busy);

    let trailing = dispatcher.complete(page_done(0, FetchReason::Refresh, Ok(page(&["b"], 2))));
    assert_eq!(trailing, vec![refresh_of(2)]);
    let done = dispatcher.complete(page_done(0, FetchReason::Refresh, Ok(page(&["c"], 2))));
    assert!(done.is_empty());
    assert!(!dispatcher.snapshot().busy);
    assert_eq!(dispatcher.window().items[0].id, "c");
}

#[test]
fn start_sync_twice_issues_one_request() {
    let mut dispatcher = opened(page(&["a"], 1));
    let first = dispatcher.start_sync();
    assert_eq!(
        first,
        vec![Effect::BeginSync {
            repo_id: "r1".to_string()
        }]
    );
    assert!(dispatcher.start_sync().is_empty());
    let notices: Vec<_> = dispatcher.notices().collect();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert!(notices[0].message.contains("already running"));
}

#[test]
fn start_sync_rejected_when_server_already_syncing() {
    let mut dispatcher = opened(page(&["a"], 1));
    dispatcher.dispatch(sync_progress("r1", "running"));
    assert!(dispatcher.start_sync().is_empty());
}

#[test]
fn sync_success_records_counts_and_refetches() {
    let mut dispatcher = opened(page(&["a"], 1));
    dispatcher.start_sync();
    let effects = dispatcher.complete(Completion::Sync {
        repo_id: "r1".to_string(),
        result: Ok(SyncReport {
            synced: 4,
            skipped: 2,
        }),
    });
    assert_eq!(effects, vec![refresh_of(2)]);
    let snapshot = dispatcher.snapshot();
    assert_eq!(snapshot.sync, SyncState::Idle);
    assert_eq!(
        snapshot.last_sync,
        Some(SyncReport {
            synced: 4,
            skipped: 2
        })
    );
    assert_eq!(snapshot.notices[0].message, "Sync finished: 4 synced, 2 skipped");
}

#[test]
fn sync_failure_returns_to_idle_without_refetch() {
    let mut dispatcher = opened(page(&["a"], 1));
    dispatcher.start_sync();
    let effects = dispatcher.complete(Completion::Sync {
        repo_id: "r1".to_string(),
        result: Err(WatchError::Rejected {
            status: 401,
            message: "unauthorized".to_string(),
        }),
    });
    assert!(effects.is_empty());
    assert_eq!(dispatcher.sync_state(), SyncState::Idle);
    assert!(!dispatcher.start_sync().is_empty());
}

#[test]
fn load_more_appends_and_advances_by_limit() {
    let mut dispatcher = opened(page(&["a", "b"], 5));
    assert_eq!(dispatcher.load_more(), vec![load_more_at(2, 1)]);
    assert!(dispatcher.load_more().is_empty());
    dispatcher.complete(page_done(2, FetchReason::LoadMore, Ok(page(&["c", "d"], 5))));
    assert_eq!(ids(&dispatcher), vec!["a", "b", "c", "d"]);
    assert_eq!(dispatcher.window().offset, 2);
}

#[test]
fn failed_load_more_keeps_loaded_pages() {
    let mut dispatcher = opened(page(&["a", "b"], 5));
    dispatcher.load_more();
    dispatcher.complete(page_done(
        2,
        FetchReason::LoadMore,
        Err(WatchError::Transport("timeout".to_string())),
    ));
    let window = dispatcher.window();
    assert_eq!(window.items.len(), 2);
    assert_eq!(window.offset, 0);
    assert!(!window.loading);
    assert_eq!(dispatcher.load_more().len(), 1);
}

#[test]
fn load_more_is_noop_when_window_is_complete() {
    let mut dispatcher = opened(page(&["a", "b"], 2));
    assert!(dispatcher.load_more().is_empty());
}

#[test]
fn refresh_after_load_more_rereads_from_the_top() {
    let mut dispatcher = opened(page(&["a", "b"], 4));
    dispatcher.load_more();
    dispatcher.complete(page_done(2, FetchReason::LoadMore, Ok(page(&["c", "d"], 4))));
    assert_eq!(dispatcher.dispatch(audit_update("r1")), vec![refresh_of(4)]);

    // A new run arrived at the head, pushing "d" onto the next page.
    let shifted = page(&["n", "a", "b", "c"], 5);
    let effects = dispatcher.complete(page_done_with(0, 4, FetchReason::Refresh, 1, Ok(shifted)));
    assert!(effects.is_empty());
    assert_eq!(ids(&dispatcher), vec!["n", "a", "b", "c"]);
    assert_eq!(dispatcher.window().total, 5);
    assert_eq!(dispatcher.window().offset, 2);
    assert_eq!(dispatcher.load_more(), vec![load_more_at(4, 1)]);
}

#[test]
fn load_more_landing_during_refresh_keeps_its_rows() {
    let mut dispatcher = opened(page(&["a", "b"], 6));
    assert_eq!(dispatcher.dispatch(audit_update("r1")), vec![refresh_of(2)]);
    dispatcher.load_more();
    dispatcher.complete(page_done(2, FetchReason::LoadMore, Ok(page(&["c", "d"], 6))));
    dispatcher.complete(page_done(0, FetchReason::Refresh, Ok(page(&["a", "b"], 6))));
    assert_eq!(ids(&dispatcher), vec!["a", "b", "c", "d"]);
    assert_eq!(dispatcher.window().offset, 2);
}

#[test]
fn contract_progress_refetches_projects_only_when_final() {
    let mut dispatcher = opened(page(&["a"], 1));
    let middle = WatchEvent::ContractProgress(ContractProgressPayload {
        status: "done".to_string(),
        index: 1,
        total: 3,
    });
    assert!(dispatcher.dispatch(middle).is_empty());
    let last = WatchEvent::ContractProgress(ContractProgressPayload {
        status: "done".to_string(),
        index: 2,
        total: 3,
    });
    assert_eq!(dispatcher.dispatch(last), vec![Effect::FetchProjects]);
}

#[test]
fn build_events_coalesce_project_fetches() {
    let mut dispatcher = opened(page(&["a"], 1));
    assert_eq!(
        dispatcher.dispatch(WatchEvent::Build(BuildPhase::Started)),
        vec![Effect::FetchProjects]
    );
    assert!(
        dispatcher
            .dispatch(WatchEvent::Build(BuildPhase::Complete))
            .is_empty()
    );
    let trailing = dispatcher.complete(Completion::Projects {
        result: Ok(vec![ProjectSummary {
            id: "p1".to_string(),
            name: "demo".to_string(),
            status: None,
            repo_url: None,
        }]),
    });
    assert_eq!(trailing, vec![Effect::FetchProjects]);
    assert_eq!(dispatcher.projects().len(), 1);
}

#[test]
fn unknown_events_are_ignored() {
    let mut dispatcher = opened(page(&["a"], 1));
    let before = dispatcher.snapshot();
    assert!(
        dispatcher
            .dispatch(WatchEvent::Other("ping".to_string()))
            .is_empty()
    );
    assert_eq!(dispatcher.snapshot(), before);
}

#[test]
fn health_follows_loaded_window() {
    let mut dispatcher = opened(page(&["a"], 2));
    assert_eq!(dispatcher.health(), HealthScore::Green);
    dispatcher.dispatch(audit_update("r1"));
    let mixed = AuditPage {
        items: vec![
            run("a", RunStatus::Completed, Some(Verdict::Pass)),
            run("b", RunStatus::Completed, Some(Verdict::Fail)),
        ],
        total: 2,
    };
    dispatcher.complete(page_done(0, FetchReason::Refresh, Ok(mixed)));
    assert_eq!(dispatcher.snapshot().health, HealthScore::Red);
}

#[test]
fn failed_refresh_keeps_items_and_raises_notice() {
    let mut dispatcher = opened(page(&["a"], 1));
    dispatcher.dispatch(audit_update("r1"));
    dispatcher.complete(page_done(
        0,
        FetchReason::Refresh,
        Err(WatchError::Rejected {
            status: 500,
            message: "boom".to_string(),
        }),
    ));
    let snapshot = dispatcher.snapshot();
    assert_eq!(snapshot.window.items.len(), 1);
    assert_eq!(snapshot.notices.len(), 1);
    assert!(snapshot.notices[0].message.starts_with("Loading audits failed"));
}

#[test]
fn notices_are_bounded() {
    let mut dispatcher = opened(page(&["a"], 1));
    dispatcher.start_sync();
    for _ in 0..10 {
        dispatcher.start_sync();
    }
    let notices: Vec<_> = dispatcher.notices().collect();
    assert_eq!(notices.len(), 5);
    assert_eq!(notices.last().map(|n| n.seq), Some(10));
}

#[test]
fn switching_subject_keeps_previous_state_keyed() {
    let mut dispatcher = opened(page(&["a"], 1));
    dispatcher.start_sync();
    let effects = dispatcher.set_subject("r2");
    assert_eq!(
        effects,
        vec![Effect::FetchPage {
            repo_id: "r2".to_string(),
            offset: 0,
            limit: 2,
            reason: FetchReason::Refresh,
            epoch: 1,
        }]
    );
    assert_eq!(dispatcher.sync_state(), SyncState::Idle);
    dispatcher.complete(Completion::Sync {
        repo_id: "r1".to_string(),
        result: Ok(SyncReport::default()),
    });
    assert_eq!(dispatcher.subject(), "r2");
    assert_eq!(dispatcher.snapshot().last_sync, None);
}

#[test]
fn switching_back_drops_load_more_issued_before_the_switch() {
    let mut dispatcher = opened(page(&["a", "b"], 6));
    assert_eq!(dispatcher.load_more(), vec![load_more_at(2, 1)]);
    dispatcher.set_subject("r2");
    let effects = dispatcher.set_subject("r1");
    assert_eq!(
        effects,
        vec![Effect::FetchPage {
            repo_id: "r1".to_string(),
            offset: 0,
            limit: 2,
            reason: FetchReason::Refresh,
            epoch: 2,
        }]
    );

    let stale = dispatcher.complete(page_done(2, FetchReason::LoadMore, Ok(page(&["c", "d"], 6))));
    assert!(stale.is_empty());
    assert!(dispatcher.window().items.is_empty());
    assert_eq!(dispatcher.window().offset, 0);

    dispatcher.complete(page_done_with(
        0,
        2,
        FetchReason::Refresh,
        2,
        Ok(page(&["a", "b"], 6)),
    ));
    assert_eq!(ids(&dispatcher), vec!["a", "b"]);
    assert!(!dispatcher.snapshot().busy);
    assert_eq!(dispatcher.load_more(), vec![load_more_at(2, 2)]);
}
