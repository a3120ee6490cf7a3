//! Live process and service-manager control.
//!
//! Shells out the same way the deployment's init tooling expects:
//! `/sbin/service <unit> ...` wrapped in `/usr/bin/timeout` so a hung
//! service manager cannot stall the reconciler, pid lookup via `pidof`,
//! and SIGKILL as the non-catchable fallback.

use std::process::Command;
use std::time::Duration;

use tracing::warn;

use crate::config::ReconcilerConfig;
use crate::machine::ServiceControl;

/// Service-manager control for the database process.
pub struct SysvService {
    service_name: String,
    process_name: String,
    stop_timeout: Duration,
    restart_timeout: Duration,
}

impl SysvService {
    /// Build the control surface from the reconciler configuration.
    pub fn new(config: &ReconcilerConfig) -> Self {
        Self {
            service_name: config.service_name.clone(),
            process_name: "mysqld".to_string(),
            stop_timeout: config.stop_timeout,
            restart_timeout: config.restart_timeout,
        }
    }

    fn service_command(&self, action: &str, timeout: Duration) -> bool {
        Command::new("/usr/bin/timeout")
            .arg(timeout.as_secs().to_string())
            .arg("/sbin/service")
            .arg(&self.service_name)
            .arg(action)
            .status()
            .map(|status| status.success())
            .unwrap_or_else(|e| {
                warn!(action, error = %e, "could not invoke the service manager");
                false
            })
    }
}

impl ServiceControl for SysvService {
    fn database_pid(&self) -> Option<u32> {
        let output = Command::new("pidof").arg(&self.process_name).output().ok()?;
        if !output.status.success() {
            return None;
        }
        String::from_utf8_lossy(&output.stdout)
            .split_whitespace()
            .next()?
            .parse()
            .ok()
    }

    fn stop_service(&self) -> bool {
        self.service_command("stop", self.stop_timeout)
    }

    fn kill_process(&self, pid: u32) {
        let killed = Command::new("kill")
            .args(["-KILL", &pid.to_string()])
            .status()
            .map(|status| status.success())
            .unwrap_or(false);
        if !killed {
            warn!(pid, "SIGKILL did not reach the database process");
        }
    }

    fn restart_in_bootstrap_mode(&self) -> bool {
        self.service_command("restart-bootstrap", self.restart_timeout)
    }
}
