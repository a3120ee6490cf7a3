//! HTTP client for the health registry.
//!
//! Fetches the two check lists the collector needs (aggregate health and
//! replication progress) from a Consul-style `/v1/health/checks/<name>`
//! API and reduces them into one [`ClusterSnapshot`]. Every request
//! carries an explicit timeout; a registry that hangs is reported as
//! [`Error::Timeout`] rather than stalling the reconciler.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};
use crate::record::CheckRecord;
use crate::snapshot::ClusterSnapshot;

/// Where and how to reach the health registry.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Registry base URL, e.g. `http://localhost:8500`.
    pub base_url: String,

    /// Name of the aggregate health check.
    pub health_check: String,

    /// Name of the replication-progress check.
    pub progress_check: String,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8500".to_string(),
            health_check: "galera".to_string(),
            progress_check: "galera-last-committed".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

impl RegistryConfig {
    fn check_url(&self, check: &str) -> String {
        format!(
            "{}/v1/health/checks/{}",
            self.base_url.trim_end_matches('/'),
            check
        )
    }
}

/// Anything that can produce a fresh [`ClusterSnapshot`].
///
/// The reconciler consumes this seam instead of a concrete client so its
/// decision logic can be driven by scripted snapshots in tests.
#[async_trait]
pub trait SnapshotSource {
    /// Produce one fresh snapshot of the cluster.
    async fn collect(&self) -> Result<ClusterSnapshot>;
}

/// Live registry client backed by reqwest.
pub struct RegistryClient {
    config: RegistryConfig,
    http: reqwest::Client,
}

impl RegistryClient {
    /// Build a client for the given registry.
    pub fn new(config: RegistryConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Unreachable(e.to_string()))?;
        Ok(Self { config, http })
    }

    async fn fetch_checks(&self, check: &str) -> Result<Vec<CheckRecord>> {
        let url = self.config.check_url(check);
        debug!(url, "fetching registry checks");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            return Err(Error::Malformed(format!(
                "registry returned {} for {url}",
                response.status()
            )));
        }

        response
            .json::<Vec<CheckRecord>>()
            .await
            .map_err(|e| Error::Malformed(format!("bad check list from {url}: {e}")))
    }

    fn classify(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout(self.config.timeout)
        } else {
            Error::Unreachable(e.to_string())
        }
    }
}

#[async_trait]
impl SnapshotSource for RegistryClient {
    async fn collect(&self) -> Result<ClusterSnapshot> {
        let health = self.fetch_checks(&self.config.health_check).await?;
        let progress = self.fetch_checks(&self.config.progress_check).await?;
        ClusterSnapshot::reduce(&health, &progress)
    }
}
