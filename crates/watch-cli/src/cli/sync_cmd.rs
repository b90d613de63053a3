use super::*;
use serde_json::json;

pub(super) async fn handle_sync(
    args: SyncArgs,
    config: &WatchConfig,
    journal: &ActivityJournal,
) -> anyhow::Result<()> {
    let result = async {
        let api = connect(config)?;
        let report = api
            .begin_sync(&args.repo)
            .await
            .with_context(|| format!("start sync for {}", args.repo))?;
        println!("Synced: {}, skipped: {}", report.synced, report.skipped);
        anyhow::Ok(report)
    }
    .await;

    match &result {
        Ok(report) => {
            let entry_id = journal.record(
                "sync.start",
                JournalStatus::Ok,
                Some(&args.repo),
                Some(json!({ "synced": report.synced, "skipped": report.skipped })),
                None,
            )?;
            println!("Journal ID: {entry_id}");
        }
        Err(err) => {
            let _ = journal.record(
                "sync.start",
                JournalStatus::Failed,
                Some(&args.repo),
                None,
                Some(&format!("{err:#}")),
            );
        }
    }
    result.map(|_| ())
}
