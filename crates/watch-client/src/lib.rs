pub mod http;

use crate::http::{read_json, send_checked};
use anyhow::{Context, bail};
use reqwest::{Client, Url};
use tracing::debug;
use watch_core::api::{ApiFuture, AuditApi};
use watch_core::config::WatchConfig;
use watch_core::model::{AuditPage, ProjectList, ProjectSummary, SyncReport};
use watch_core::WatchError;

/// [`AuditApi`] over the audit server's JSON HTTP interface.
pub struct HttpAuditApi {
    client: Client,
    base: Url,
}

impl HttpAuditApi {
    pub fn new(config: &WatchConfig) -> anyhow::Result<Self> {
        let base_url = config.require_base_url()?;
        let base = Url::parse(base_url).with_context(|| format!("parse base URL {base_url}"))?;
        if base.cannot_be_a_base() {
            bail!("base URL cannot carry paths: {base_url}");
        }
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("audit-watch/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build HTTP client")?;
        Ok(Self { client, base })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, WatchError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| WatchError::Transport(format!("invalid base URL {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl AuditApi for HttpAuditApi {
    fn list_audits<'a>(
        &'a self,
        repo_id: &'a str,
        limit: u64,
        offset: u64,
    ) -> ApiFuture<'a, AuditPage> {
        Box::pin(async move {
            let mut url = self.endpoint(&["repos", repo_id, "audits"])?;
            url.query_pairs_mut()
                .append_pair("limit", &limit.to_string())
                .append_pair("offset", &offset.to_string());
            debug!(repo_id, limit, offset, "list audits");
            let response = send_checked(self.client.get(url)).await?;
            read_json(response).await
        })
    }

    fn begin_sync<'a>(&'a self, repo_id: &'a str) -> ApiFuture<'a, SyncReport> {
        Box::pin(async move {
            let url = self.endpoint(&["repos", repo_id, "sync"])?;
            debug!(repo_id, "begin sync");
            let response = send_checked(self.client.post(url)).await?;
            read_json(response).await
        })
    }

    fn list_projects(&self) -> ApiFuture<'_, Vec<ProjectSummary>> {
        Box::pin(async move {
            let url = self.endpoint(&["projects"])?;
            debug!("list projects");
            let response = send_checked(self.client.get(url)).await?;
            let list: ProjectList = read_json(response).await?;
            Ok(list.into_vec())
        })
    }
}
