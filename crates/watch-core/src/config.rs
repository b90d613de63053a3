use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_PAGE_LIMIT: u64 = 20;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_NOTICE_CAPACITY: usize = 20;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub base_url: Option<String>,
    pub page_limit: u64,
    pub request_timeout_secs: u64,
    pub notice_capacity: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            page_limit: DEFAULT_PAGE_LIMIT,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            notice_capacity: DEFAULT_NOTICE_CAPACITY,
        }
    }
}

impl WatchConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path).context("read config")?;
        let config: Self = serde_json::from_str(&data).context("parse config")?;
        Ok(config.normalized())
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("create config directory")?;
        }
        let data = serde_json::to_string_pretty(self).context("serialize config")?;
        fs::write(path, data).context("write config")?;
        Ok(())
    }

    pub fn normalized(mut self) -> Self {
        self.page_limit = self.page_limit.max(1);
        self.notice_capacity = self.notice_capacity.max(1);
        self.base_url = self
            .base_url
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn require_base_url(&self) -> anyhow::Result<&str> {
        self.base_url
            .as_deref()
            .context("base URL not configured; run `audit-watch config init --base-url <URL>`")
    }
}

fn project_dirs() -> anyhow::Result<ProjectDirs> {
    ProjectDirs::from("com", "audit-watch", "audit-watch").context("resolve project dirs")
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("config.json"))
}

pub fn default_journal_dir() -> anyhow::Result<PathBuf> {
    Ok(project_dirs()?.data_local_dir().join("journal"))
}
