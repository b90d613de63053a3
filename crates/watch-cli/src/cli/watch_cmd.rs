use super::render::{notice_line, status_line};
use super::*;
use serde_json::json;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::watch;
use watch_core::channel::LocalEventBus;
use watch_core::dispatcher::{NoticeLevel, WatchSnapshot};
use watch_core::model::SyncState;
use watch_core::session::WatchSession;

/// One line of watch input.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum InputLine<'a> {
    Blank,
    Sync,
    More,
    Refresh,
    Event(&'a str),
}

pub(super) fn parse_input(line: &str) -> InputLine<'_> {
    let trimmed = line.trim();
    match trimmed {
        "" => InputLine::Blank,
        "sync" => InputLine::Sync,
        "more" => InputLine::More,
        "refresh" => InputLine::Refresh,
        _ if trimmed.starts_with('#') => InputLine::Blank,
        _ => InputLine::Event(trimmed),
    }
}

pub(super) async fn handle_watch(
    args: WatchArgs,
    config: &WatchConfig,
    journal: &ActivityJournal,
) -> anyhow::Result<()> {
    let api = connect(config)?;
    let bus = LocalEventBus::new();
    let session = WatchSession::open(api, &bus, args.repo.as_str(), config);
    journal.record("watch.open", JournalStatus::Ok, Some(&args.repo), None, None)?;

    let printer = tokio::spawn(print_updates(
        session.watch(),
        journal.clone(),
        args.repo.clone(),
    ));

    if args.sync {
        request_sync(&session, journal, &args.repo);
    }

    let fed = match args.events.as_deref() {
        Some(source) => feed_input(source, &bus, &session, journal, &args.repo).await,
        None => Ok(0),
    };

    let settle = Duration::from_secs(args.settle_secs);
    if !session.settled(settle).await {
        warn!(repo_id = %args.repo, timeout_secs = args.settle_secs, "Requests still outstanding");
    }
    session.shutdown().await;
    if let Err(err) = printer.await {
        warn!(error = %err, "Status printer ended abnormally");
    }

    match &fed {
        Ok(lines) => {
            journal.record(
                "watch.close",
                JournalStatus::Ok,
                Some(&args.repo),
                Some(json!({ "lines": lines })),
                None,
            )?;
        }
        Err(err) => {
            let _ = journal.record(
                "watch.close",
                JournalStatus::Failed,
                Some(&args.repo),
                None,
                Some(&format!("{err:#}")),
            );
        }
    }
    fed.map(|_| ())
}

fn request_sync(session: &WatchSession, journal: &ActivityJournal, repo: &str) {
    session.start_sync();
    if let Err(err) = journal.record("sync.start", JournalStatus::Ok, Some(repo), None, None) {
        warn!(error = %err, "Failed to write journal entry");
    }
}

async fn feed_input(
    source: &Path,
    bus: &LocalEventBus,
    session: &WatchSession,
    journal: &ActivityJournal,
    repo: &str,
) -> anyhow::Result<usize> {
    let reader: Box<dyn AsyncRead + Unpin + Send> = if source == Path::new("-") {
        Box::new(tokio::io::stdin())
    } else {
        let file = tokio::fs::File::open(source)
            .await
            .with_context(|| format!("open events {}", source.display()))?;
        Box::new(file)
    };

    let mut lines = BufReader::new(reader).lines();
    let mut count = 0;
    while let Some(line) = lines.next_line().await.context("read events")? {
        count += 1;
        match parse_input(&line) {
            InputLine::Blank => {}
            InputLine::Sync => request_sync(session, journal, repo),
            InputLine::More => session.load_more(),
            InputLine::Refresh => session.refresh(),
            InputLine::Event(text) => {
                if let Err(err) = bus.publish_json(text) {
                    warn!(line = count, error = %err, "Skipping unreadable event line");
                }
            }
        }
    }
    Ok(count)
}

/// Prints a status line whenever the rendered view changes, and each notice
/// once. Ends when the session stops publishing.
async fn print_updates(
    mut rx: watch::Receiver<WatchSnapshot>,
    journal: ActivityJournal,
    repo: String,
) {
    let mut last_line = String::new();
    let mut last_notice = 0;
    let mut last_sync = SyncState::Idle;
    loop {
        let (line, notices, sync, report) = {
            let snapshot = rx.borrow_and_update();
            let notices: Vec<_> = snapshot
                .notices
                .iter()
                .filter(|notice| notice.seq > last_notice)
                .cloned()
                .collect();
            (
                status_line(&snapshot),
                notices,
                snapshot.sync,
                snapshot.last_sync,
            )
        };

        if line != last_line {
            println!("{line}");
            last_line = line;
        }
        for notice in notices {
            last_notice = notice.seq;
            println!("{}", notice_line(&notice));
            let status = match notice.level {
                NoticeLevel::Info => JournalStatus::Ok,
                NoticeLevel::Error => JournalStatus::Failed,
            };
            let error = (notice.level == NoticeLevel::Error).then_some(notice.message.as_str());
            if let Err(err) = journal.record(
                "notice",
                status,
                Some(&repo),
                Some(json!({ "seq": notice.seq, "message": notice.message })),
                error,
            ) {
                warn!(error = %err, "Failed to write journal entry");
            }
        }
        if last_sync.is_running() && !sync.is_running() {
            let details = report.map(|report| {
                json!({ "synced": report.synced, "skipped": report.skipped })
            });
            if let Err(err) =
                journal.record("sync.finish", JournalStatus::Ok, Some(&repo), details, None)
            {
                warn!(error = %err, "Failed to write journal entry");
            }
        }
        last_sync = sync;

        if rx.changed().await.is_err() {
            break;
        }
    }
}
