use super::*;
pub async fn run() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let journal = ActivityJournal::new()?;
    info!(command = command_label(&cli.command), "Running command");

    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let base_url = cli.base_url;

    let result = match cli.command {
        Commands::Config(args) => {
            handle_config(args, &config_path, base_url.as_deref(), &journal)
        }
        Commands::Audits(args) => match load_config(&config_path, base_url) {
            Ok(config) => handle_audits(args, &config).await,
            Err(err) => Err(err),
        },
        Commands::Sync(args) => match load_config(&config_path, base_url) {
            Ok(config) => handle_sync(args, &config, &journal).await,
            Err(err) => Err(err),
        },
        Commands::Projects => match load_config(&config_path, base_url) {
            Ok(config) => handle_projects(&config).await,
            Err(err) => Err(err),
        },
        Commands::Watch(args) => match load_config(&config_path, base_url) {
            Ok(config) => handle_watch(args, &config, &journal).await,
            Err(err) => Err(err),
        },
    };

    if let Err(err) = &result {
        warn!(error = %err, "Command failed");
        let _ = journal.record(
            "app.error",
            JournalStatus::Failed,
            None,
            None,
            Some(&err.to_string()),
        );
    }

    result
}

/// File values with command-line overrides applied.
pub(super) fn load_config(path: &Path, base_url: Option<String>) -> anyhow::Result<WatchConfig> {
    let mut config = WatchConfig::load(path)
        .with_context(|| format!("load config {}", path.display()))?;
    if base_url.is_some() {
        config.base_url = base_url;
    }
    Ok(config.normalized())
}

pub(super) fn connect(config: &WatchConfig) -> anyhow::Result<Arc<dyn AuditApi>> {
    Ok(Arc::new(HttpAuditApi::new(config)?))
}

fn command_label(command: &Commands) -> &'static str {
    match command {
        Commands::Config(_) => "config",
        Commands::Audits(_) => "audits",
        Commands::Sync(_) => "sync",
        Commands::Projects => "projects",
        Commands::Watch(_) => "watch",
    }
}
