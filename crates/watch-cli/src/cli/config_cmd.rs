use super::*;
pub(super) fn handle_config(
    args: ConfigArgs,
    config_path: &Path,
    base_url: Option<&str>,
    journal: &ActivityJournal,
) -> anyhow::Result<()> {
    match args.command {
        ConfigCommands::Init(args) => handle_init(args, config_path, base_url, journal),
        ConfigCommands::Show => handle_show(config_path, base_url),
    }
}

pub(super) fn handle_init(
    args: InitArgs,
    config_path: &Path,
    base_url: Option<&str>,
    journal: &ActivityJournal,
) -> anyhow::Result<()> {
    let result: anyhow::Result<()> = (|| {
        let base_url = base_url.context("config init requires --base-url")?;
        let mut config = WatchConfig::load(config_path)?;
        config.base_url = Some(base_url.to_string());
        if let Some(limit) = args.page_limit {
            config.page_limit = limit;
        }
        if let Some(timeout) = args.timeout_secs {
            config.request_timeout_secs = timeout;
        }
        let config = config.normalized();
        config.require_base_url()?;
        config.save(config_path)?;
        println!("Config saved to {}", config_path.display());
        Ok(())
    })();

    if let Err(err) = &result {
        let _ = journal.record(
            "config.init",
            JournalStatus::Failed,
            None,
            None,
            Some(&err.to_string()),
        );
    } else {
        let entry_id = journal.record("config.init", JournalStatus::Ok, None, None, None)?;
        println!("Journal ID: {entry_id}");
    }
    result
}

fn handle_show(config_path: &Path, base_url: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path, base_url.map(str::to_string))?;
    println!("Config path: {}", config_path.display());
    println!(
        "{}",
        serde_json::to_string_pretty(&config).context("serialize config")?
    );
    Ok(())
}
