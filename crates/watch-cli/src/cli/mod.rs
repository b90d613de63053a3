use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use watch_client::HttpAuditApi;
use watch_core::api::AuditApi;
use watch_core::config::{WatchConfig, default_config_path};
use watch_core::journal::{ActivityJournal, JournalStatus};

mod app;
mod args;
mod config_cmd;
mod query_cmd;
mod render;
mod sync_cmd;
mod watch_cmd;

use args::*;

use app::{connect, load_config};
use config_cmd::handle_config;
use query_cmd::{handle_audits, handle_projects};
use sync_cmd::handle_sync;
use watch_cmd::handle_watch;

pub async fn run() -> anyhow::Result<()> {
    app::run().await
}
