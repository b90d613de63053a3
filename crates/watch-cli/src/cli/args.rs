use super::*;
#[derive(Parser)]
#[command(author, version, about)]
pub(super) struct Cli {
    #[arg(long, global = true, help = "Path to the config file")]
    pub(super) config: Option<PathBuf>,
    #[arg(long, global = true, help = "Audit server base URL (overrides config)")]
    pub(super) base_url: Option<String>,
    #[command(subcommand)]
    pub(super) command: Commands,
}

#[derive(clap::Subcommand)]
pub(super) enum Commands {
    #[command(about = "Manage config")]
    Config(ConfigArgs),
    #[command(about = "Show one page of audit runs and the health rollup")]
    Audits(AuditsArgs),
    #[command(about = "Start a sync for a repository")]
    Sync(SyncArgs),
    #[command(about = "List projects known to the server")]
    Projects,
    #[command(
        about = "Follow live events for a repository",
        long_about = "Follow live events for a repository. Input lines `sync`, `more` and `refresh` act as commands."
    )]
    Watch(WatchArgs),
}

#[derive(Parser)]
pub(super) struct ConfigArgs {
    #[command(subcommand)]
    pub(super) command: ConfigCommands,
}

#[derive(clap::Subcommand)]
pub(super) enum ConfigCommands {
    #[command(about = "Write a config; requires --base-url")]
    Init(InitArgs),
    #[command(about = "Print the effective config")]
    Show,
}

#[derive(Parser)]
pub(super) struct InitArgs {
    #[arg(long)]
    pub(super) page_limit: Option<u64>,
    #[arg(long)]
    pub(super) timeout_secs: Option<u64>,
}

#[derive(Parser)]
pub(super) struct AuditsArgs {
    #[arg(long)]
    pub(super) repo: String,
    #[arg(long, default_value_t = 0)]
    pub(super) offset: u64,
    #[arg(long)]
    pub(super) limit: Option<u64>,
}

#[derive(Parser)]
pub(super) struct SyncArgs {
    #[arg(long)]
    pub(super) repo: String,
}

#[derive(Parser)]
pub(super) struct WatchArgs {
    #[arg(long)]
    pub(super) repo: String,
    #[arg(long, help = "JSON event lines to replay, from a file or - for stdin")]
    pub(super) events: Option<PathBuf>,
    #[arg(long, help = "Start a sync once the session is open")]
    pub(super) sync: bool,
    #[arg(
        long,
        default_value_t = 30,
        help = "Seconds to wait for outstanding requests at end of input"
    )]
    pub(super) settle_secs: u64,
}
