use watch_core::dispatcher::{Notice, NoticeLevel, WatchSnapshot};
use watch_core::health::health_score;
use watch_core::model::{AuditRun, ProjectSummary};
use watch_core::window::AuditWindow;

const SHORT_SHA: usize = 7;
const MAX_MESSAGE_CHARS: usize = 60;

pub(super) fn run_row(run: &AuditRun) -> String {
    let verdict = run.verdict().map(|verdict| verdict.as_str()).unwrap_or("-");
    let sha: String = run
        .commit_sha
        .as_deref()
        .unwrap_or("-")
        .chars()
        .take(SHORT_SHA)
        .collect();
    let message: String = run
        .commit_message
        .as_deref()
        .and_then(|message| message.lines().next())
        .unwrap_or("")
        .chars()
        .take(MAX_MESSAGE_CHARS)
        .collect();
    format!(
        "{:<10} {:<9} {:<6} {:<7} {}",
        run.id,
        run.status.as_str(),
        verdict,
        sha,
        message
    )
    .trim_end()
    .to_string()
}

pub(super) fn project_row(project: &ProjectSummary) -> String {
    let mut row = format!("{:<10} {}", project.id, project.name);
    if let Some(status) = project.status.as_deref() {
        row.push_str(&format!(" [{status}]"));
    }
    if let Some(url) = project.repo_url.as_deref() {
        row.push_str(&format!(" {url}"));
    }
    row
}

/// One-line summary of a watch snapshot.
pub(super) fn page_footer(window: &AuditWindow, offset: u64) -> String {
    let shown = u64::try_from(window.items.len()).unwrap_or(u64::MAX);
    let first = if shown == 0 { 0 } else { offset.saturating_add(1) };
    format!(
        "Showing {first}-{} of {} | health: {}",
        offset.saturating_add(shown),
        window.total,
        health_score(&window.items)
    )
}

pub(super) fn status_line(snapshot: &WatchSnapshot) -> String {
    let window = &snapshot.window;
    let mut line = format!(
        "[{}] health={} sync={} audits={}/{}",
        snapshot.subject,
        snapshot.health,
        snapshot.sync.as_str(),
        window.items.len(),
        window.total
    );
    if let Some(progress) = &snapshot.progress {
        line.push_str(&format!(
            " scan={}/{}",
            progress.files_done, progress.files_total
        ));
        if let Some(file) = progress.current_file.as_deref() {
            line.push_str(&format!(" {file}"));
        }
    }
    if let Some(report) = &snapshot.last_sync {
        line.push_str(&format!(
            " last_sync={}+{}",
            report.synced, report.skipped
        ));
    }
    if snapshot.busy {
        line.push_str(" (loading)");
    }
    line
}

pub(super) fn notice_line(notice: &Notice) -> String {
    match notice.level {
        NoticeLevel::Info => format!("info: {}", notice.message),
        NoticeLevel::Error => format!("error: {}", notice.message),
    }
}
