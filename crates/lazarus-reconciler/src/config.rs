//! Runtime configuration for the reconciler.

use std::path::PathBuf;
use std::time::Duration;

use lazarus_registry::RegistryConfig;

/// Configuration for one reconciliation run.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// This host's node identifier, as the registry knows it.
    pub local_node: String,

    /// How to reach the health registry.
    pub registry: RegistryConfig,

    /// Extra snapshot samples taken to confirm a suspected quorum loss.
    pub confirm_samples: u32,

    /// Delay between confirmation samples.
    pub confirm_delay: Duration,

    /// Soft-bootstrap attempts before escalating.
    pub soft_attempts: u32,

    /// Delay after an unsuccessful soft-bootstrap attempt.
    pub soft_delay: Duration,

    /// Path to the my.cnf-style credentials file.
    pub credentials_path: PathBuf,

    /// Path to the grastate recovery-state marker file.
    pub grastate_path: PathBuf,

    /// Database host for the control connection.
    pub mysql_host: String,

    /// Service unit managed during a hard bootstrap.
    pub service_name: String,

    /// Timeout for the graceful service stop.
    pub stop_timeout: Duration,

    /// Timeout for the restart-in-bootstrap-mode command.
    pub restart_timeout: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl ReconcilerConfig {
    /// Create config from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        let local_node = std::env::var("LAZARUS_NODE_NAME")
            .ok()
            .unwrap_or_else(system_hostname);

        let mut registry = RegistryConfig::default();
        if let Ok(url) = std::env::var("LAZARUS_REGISTRY_URL") {
            registry.base_url = url;
        }
        if let Ok(check) = std::env::var("LAZARUS_HEALTH_CHECK") {
            registry.health_check = check;
        }
        if let Ok(check) = std::env::var("LAZARUS_PROGRESS_CHECK") {
            registry.progress_check = check;
        }

        let credentials_path = std::env::var("LAZARUS_MYCNF")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/root".to_string());
                PathBuf::from(home).join(".my.cnf")
            });

        let grastate_path = std::env::var("LAZARUS_GRASTATE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/var/lib/mysql/data/grastate.dat"));

        let mysql_host =
            std::env::var("LAZARUS_MYSQL_HOST").unwrap_or_else(|_| "localhost".to_string());

        let service_name =
            std::env::var("LAZARUS_SERVICE").unwrap_or_else(|_| "mysql".to_string());

        Self {
            local_node,
            registry,
            confirm_samples: 3,
            confirm_delay: Duration::from_secs(5),
            soft_attempts: 3,
            soft_delay: Duration::from_secs(10),
            credentials_path,
            grastate_path,
            mysql_host,
            service_name,
            stop_timeout: Duration::from_secs(60),
            restart_timeout: Duration::from_secs(120),
        }
    }
}

/// Ask the OS for this host's name.
fn system_hostname() -> String {
    std::process::Command::new("hostname")
        .output()
        .ok()
        .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}
