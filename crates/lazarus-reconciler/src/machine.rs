//! The quorum-loss detection and escalating recovery state machine.
//!
//! One reconciliation run moves strictly forward:
//!
//! 1. **Evaluate** — one snapshot; any passing check ends the run.
//! 2. **Confirm** — extra delayed samples; the candidate modify-index must
//!    stay frozen across all of them, otherwise the registry is still
//!    progressing and the suspicion was transient.
//! 3. **Leadership** — only the node the snapshot elects as bootstrap
//!    leader acts; everyone else stays a passive observer.
//! 4. **Soft bootstrap** — bounded attempts to re-form the primary
//!    component through a live provider command, no process restart.
//! 5. **Hard bootstrap** — stop (or kill) the database process, override
//!    the on-disk safety flag, restart in bootstrap mode.
//!
//! The only backward edges are the two escapes to "healthy" in steps 1
//! and 2 and the early exit when a soft attempt finds the cluster ready.

use std::collections::BTreeSet;

use async_trait::async_trait;
use lazarus_registry::{ClusterSnapshot, SnapshotSource};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::ReconcilerConfig;
use crate::error::Result;
use crate::grastate;

/// Administrative control surface of the local database instance.
///
/// Every call opens a fresh connection: soft-bootstrap success is defined
/// as observing readiness on a *new* connection at the start of an
/// attempt, never as the after-effect of a command just issued.
#[async_trait]
pub trait DatabaseAdmin {
    /// Read the cluster-readiness status variable; true when "ON".
    async fn cluster_ready(&self) -> Result<bool>;

    /// Ask the provider to form a new primary component from this node.
    async fn request_primary_component(&self) -> Result<()>;
}

/// Process and service-manager control surface.
///
/// Outcomes here never abort the run: a failed graceful stop escalates to
/// a kill, and the final bootstrap-mode restart is issued best-effort and
/// not re-verified.
pub trait ServiceControl {
    /// Pid of the running database process, if any.
    fn database_pid(&self) -> Option<u32>;

    /// Graceful service stop with a bounded timeout; true on exit 0.
    fn stop_service(&self) -> bool;

    /// Immediate, non-catchable termination of the given process.
    fn kill_process(&self, pid: u32);

    /// Restart the service in bootstrap mode, bounded timeout; true on
    /// exit 0.
    fn restart_in_bootstrap_mode(&self) -> bool;
}

/// How a reconciliation run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// At least one health check was passing; nothing to do.
    Healthy,

    /// The candidate modify-index moved during confirmation; the registry
    /// is catching up and the quorum-loss suspicion was transient.
    RegistryProgressing,

    /// Quorum loss confirmed, but another node is the bootstrap leader.
    NotLeader,

    /// A soft attempt found the cluster ready, after this many
    /// unsuccessful attempts.
    SoftRecovered { attempts: u32 },

    /// All soft attempts exhausted; the hard bootstrap was executed.
    /// Whether the final restart brought the cluster back is not checked
    /// here.
    HardBootstrapped,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "cluster healthy"),
            Self::RegistryProgressing => write!(f, "registry progressing, treated as transient"),
            Self::NotLeader => write!(f, "not the bootstrap leader"),
            Self::SoftRecovered { attempts } => {
                write!(f, "recovered softly after {attempts} unsuccessful attempts")
            }
            Self::HardBootstrapped => write!(f, "hard bootstrap issued"),
        }
    }
}

/// The reconciler, built once from configuration and its collaborators.
pub struct Reconciler<S, D, C> {
    config: ReconcilerConfig,
    source: S,
    db: D,
    control: C,
}

impl<S, D, C> Reconciler<S, D, C>
where
    S: SnapshotSource + Send + Sync,
    D: DatabaseAdmin + Send + Sync,
    C: ServiceControl + Send + Sync,
{
    /// Create a reconciler for one run.
    pub fn new(config: ReconcilerConfig, source: S, db: D, control: C) -> Self {
        Self {
            config,
            source,
            db,
            control,
        }
    }

    /// Execute one full reconciliation.
    ///
    /// Errors here are the fatal tier: untrustworthy registry input,
    /// unreadable credentials upstream, or a failed marker rewrite.
    pub async fn run(&self) -> Result<Outcome> {
        let snapshot = self.source.collect().await?;
        if snapshot.any_passing() {
            info!("at least one health check is passing, nothing to do");
            return Ok(Outcome::Healthy);
        }

        info!(
            bootstrap_node = %snapshot.bootstrap_node,
            max_progress = snapshot.max_progress,
            "no passing health checks, confirming quorum loss"
        );

        let latest = match self.confirm(snapshot).await? {
            Some(snapshot) => snapshot,
            None => {
                info!("modify-index changed across samples, registry is progressing");
                return Ok(Outcome::RegistryProgressing);
            }
        };

        if latest.bootstrap_node != self.config.local_node {
            info!(
                leader = %latest.bootstrap_node,
                local = %self.config.local_node,
                "quorum loss confirmed, waiting for the leader to act"
            );
            return Ok(Outcome::NotLeader);
        }

        info!("this node is the bootstrap leader, starting recovery");

        if let Some(attempts) = self.soft_bootstrap().await {
            return Ok(Outcome::SoftRecovered { attempts });
        }

        self.hard_bootstrap()?;
        Ok(Outcome::HardBootstrapped)
    }

    /// Re-sample the registry to separate a stuck cluster from a stale
    /// read of an eventually-consistent registry.
    ///
    /// Returns the latest snapshot when every sample reported the same
    /// candidate modify-index, `None` as soon as a second distinct value
    /// shows up.
    async fn confirm(&self, first: ClusterSnapshot) -> Result<Option<ClusterSnapshot>> {
        let mut seen = BTreeSet::from([first.candidate_modify_index]);
        let mut latest = first;

        for sample in 1..=self.config.confirm_samples {
            sleep(self.config.confirm_delay).await;
            latest = self.source.collect().await?;
            seen.insert(latest.candidate_modify_index);
            debug!(
                sample,
                modify_index = latest.candidate_modify_index,
                distinct = seen.len(),
                "confirmation sample"
            );
            if seen.len() > 1 {
                return Ok(None);
            }
        }

        Ok(Some(latest))
    }

    /// The reversible recovery path: bounded attempts at re-forming the
    /// primary component through a live connection.
    ///
    /// Returns the number of unsuccessful attempts before readiness was
    /// observed, or `None` when the budget ran out. Connection failures
    /// are counted attempts, never fatal.
    async fn soft_bootstrap(&self) -> Option<u32> {
        for attempt in 0..self.config.soft_attempts {
            info!(attempt, "soft bootstrap attempt");
            match self.db.cluster_ready().await {
                Ok(true) => {
                    info!("cluster is ready, no further action needed");
                    return Some(attempt);
                }
                Ok(false) => {
                    info!("cluster not ready, requesting a new primary component");
                    if let Err(e) = self.db.request_primary_component().await {
                        warn!(error = %e, "provider bootstrap command failed");
                    }
                }
                Err(e) => {
                    warn!(error = %e, "cannot query local database");
                }
            }
            sleep(self.config.soft_delay).await;
        }
        None
    }

    /// The destructive path: stop or kill the database process, override
    /// the on-disk safety flag, restart in bootstrap mode.
    fn hard_bootstrap(&self) -> Result<()> {
        info!("soft attempts exhausted, escalating to hard bootstrap");

        match self.control.database_pid() {
            Some(pid) => {
                info!(pid, "database process running, requesting graceful stop");
                if self.control.stop_service() {
                    info!("service stopped gracefully");
                } else {
                    warn!("graceful stop failed, killing the database process");
                    if let Some(pid) = self.control.database_pid() {
                        self.control.kill_process(pid);
                    }
                }
            }
            None => info!("database process not found"),
        }

        grastate::permit_unsafe_bootstrap(&self.config.grastate_path)?;

        info!("restarting service in bootstrap mode");
        if !self.control.restart_in_bootstrap_mode() {
            warn!("bootstrap-mode restart reported failure");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use lazarus_registry::RegistryConfig;
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    const GRASTATE: &str = "version: 2.1\nseqno: -1\nsafe_to_bootstrap: 0\n";

    fn snapshot(statuses: &[&str], modify_index: u64, bootstrap_node: &str) -> ClusterSnapshot {
        ClusterSnapshot {
            statuses: statuses.iter().map(|s| s.to_string()).collect(),
            progress_by_node: BTreeMap::new(),
            max_progress: 0,
            most_advanced_nodes: BTreeSet::new(),
            candidate_modify_index: modify_index,
            bootstrap_node: bootstrap_node.to_string(),
        }
    }

    fn stuck(modify_index: u64, bootstrap_node: &str) -> ClusterSnapshot {
        snapshot(&["critical", "critical"], modify_index, bootstrap_node)
    }

    struct ScriptedSource {
        snapshots: Mutex<VecDeque<lazarus_registry::Result<ClusterSnapshot>>>,
    }

    impl ScriptedSource {
        fn new(
            snapshots: impl IntoIterator<Item = lazarus_registry::Result<ClusterSnapshot>>,
        ) -> Self {
            Self {
                snapshots: Mutex::new(snapshots.into_iter().collect()),
            }
        }
    }

    #[async_trait]
    impl SnapshotSource for ScriptedSource {
        async fn collect(&self) -> lazarus_registry::Result<ClusterSnapshot> {
            self.snapshots
                .lock()
                .unwrap()
                .pop_front()
                .expect("ran out of scripted snapshots")
        }
    }

    #[derive(Default)]
    struct FakeDb {
        readiness: Mutex<VecDeque<Result<bool>>>,
        primary_requests: AtomicU32,
    }

    impl FakeDb {
        fn scripted(readiness: impl IntoIterator<Item = Result<bool>>) -> Self {
            Self {
                readiness: Mutex::new(readiness.into_iter().collect()),
                primary_requests: AtomicU32::new(0),
            }
        }

        fn primary_requests(&self) -> u32 {
            self.primary_requests.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DatabaseAdmin for FakeDb {
        async fn cluster_ready(&self) -> Result<bool> {
            self.readiness
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected readiness probe")
        }

        async fn request_primary_component(&self) -> Result<()> {
            self.primary_requests.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeControl {
        pid: Option<u32>,
        stop_succeeds: bool,
        events: Mutex<Vec<String>>,
    }

    impl FakeControl {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl ServiceControl for FakeControl {
        fn database_pid(&self) -> Option<u32> {
            self.pid
        }

        fn stop_service(&self) -> bool {
            self.events.lock().unwrap().push("stop".to_string());
            self.stop_succeeds
        }

        fn kill_process(&self, pid: u32) {
            self.events.lock().unwrap().push(format!("kill {pid}"));
        }

        fn restart_in_bootstrap_mode(&self) -> bool {
            self.events.lock().unwrap().push("restart".to_string());
            true
        }
    }

    fn test_config(dir: &tempfile::TempDir, local_node: &str) -> ReconcilerConfig {
        ReconcilerConfig {
            local_node: local_node.to_string(),
            registry: RegistryConfig::default(),
            confirm_samples: 3,
            confirm_delay: Duration::ZERO,
            soft_attempts: 3,
            soft_delay: Duration::ZERO,
            credentials_path: dir.path().join(".my.cnf"),
            grastate_path: dir.path().join("grastate.dat"),
            mysql_host: "localhost".to_string(),
            service_name: "mysql".to_string(),
            stop_timeout: Duration::from_secs(60),
            restart_timeout: Duration::from_secs(120),
        }
    }

    fn db_error() -> Error {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ))
    }

    #[tokio::test]
    async fn passing_check_means_no_action() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::new([Ok(snapshot(&["passing", "critical"], 5, "b"))]);
        let db = FakeDb::default();
        let control = FakeControl::default();

        let reconciler = Reconciler::new(test_config(&dir, "b"), source, db, control);
        let outcome = reconciler.run().await.unwrap();

        assert_eq!(outcome, Outcome::Healthy);
        assert_eq!(reconciler.db.primary_requests(), 0);
        assert!(reconciler.control.events().is_empty());
    }

    #[tokio::test]
    async fn moving_modify_index_is_transient() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::new([
            Ok(stuck(5, "b")),
            Ok(stuck(5, "b")),
            Ok(stuck(6, "b")),
        ]);
        let db = FakeDb::default();
        let control = FakeControl::default();

        let reconciler = Reconciler::new(test_config(&dir, "b"), source, db, control);
        let outcome = reconciler.run().await.unwrap();

        assert_eq!(outcome, Outcome::RegistryProgressing);
        assert_eq!(reconciler.db.primary_requests(), 0);
        assert!(reconciler.control.events().is_empty());
    }

    #[tokio::test]
    async fn non_leader_stays_passive() {
        let dir = tempfile::tempdir().unwrap();
        let source =
            ScriptedSource::new((0..4).map(|_| Ok(stuck(5, "b"))).collect::<Vec<_>>());
        let db = FakeDb::default();
        let control = FakeControl::default();

        let reconciler = Reconciler::new(test_config(&dir, "a"), source, db, control);
        let outcome = reconciler.run().await.unwrap();

        assert_eq!(outcome, Outcome::NotLeader);
        assert_eq!(reconciler.db.primary_requests(), 0);
        assert!(reconciler.control.events().is_empty());
    }

    #[tokio::test]
    async fn ready_cluster_ends_recovery_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let source =
            ScriptedSource::new((0..4).map(|_| Ok(stuck(5, "b"))).collect::<Vec<_>>());
        let db = FakeDb::scripted([Ok(true)]);
        let control = FakeControl::default();

        let reconciler = Reconciler::new(test_config(&dir, "b"), source, db, control);
        let outcome = reconciler.run().await.unwrap();

        assert_eq!(outcome, Outcome::SoftRecovered { attempts: 0 });
        assert_eq!(reconciler.db.primary_requests(), 0);
        assert!(reconciler.control.events().is_empty());
    }

    #[tokio::test]
    async fn soft_attempt_failures_are_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let source =
            ScriptedSource::new((0..4).map(|_| Ok(stuck(5, "b"))).collect::<Vec<_>>());
        let db = FakeDb::scripted([Ok(false), Err(db_error()), Ok(true)]);
        let control = FakeControl::default();

        let reconciler = Reconciler::new(test_config(&dir, "b"), source, db, control);
        let outcome = reconciler.run().await.unwrap();

        assert_eq!(outcome, Outcome::SoftRecovered { attempts: 2 });
        assert_eq!(reconciler.db.primary_requests(), 1);
        assert!(reconciler.control.events().is_empty());
    }

    #[tokio::test]
    async fn exhausted_soft_attempts_escalate_to_hard_bootstrap() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("grastate.dat"), GRASTATE).unwrap();
        let source =
            ScriptedSource::new((0..4).map(|_| Ok(stuck(5, "b"))).collect::<Vec<_>>());
        let db = FakeDb::scripted([Ok(false), Ok(false), Ok(false)]);
        let control = FakeControl {
            pid: Some(42),
            stop_succeeds: true,
            ..FakeControl::default()
        };

        let reconciler = Reconciler::new(test_config(&dir, "b"), source, db, control);
        let outcome = reconciler.run().await.unwrap();

        assert_eq!(outcome, Outcome::HardBootstrapped);
        assert_eq!(reconciler.db.primary_requests(), 3);
        assert_eq!(reconciler.control.events(), ["stop", "restart"]);

        let marker = std::fs::read_to_string(dir.path().join("grastate.dat")).unwrap();
        assert!(marker.contains("safe_to_bootstrap: 1"));
    }

    #[tokio::test]
    async fn failed_stop_escalates_to_kill() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("grastate.dat"), GRASTATE).unwrap();
        let source =
            ScriptedSource::new((0..4).map(|_| Ok(stuck(5, "b"))).collect::<Vec<_>>());
        let db = FakeDb::scripted([Ok(false), Ok(false), Ok(false)]);
        let control = FakeControl {
            pid: Some(42),
            stop_succeeds: false,
            ..FakeControl::default()
        };

        let reconciler = Reconciler::new(test_config(&dir, "b"), source, db, control);
        let outcome = reconciler.run().await.unwrap();

        assert_eq!(outcome, Outcome::HardBootstrapped);
        assert_eq!(reconciler.control.events(), ["stop", "kill 42", "restart"]);
    }

    #[tokio::test]
    async fn missing_database_process_goes_straight_to_restart() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("grastate.dat"), GRASTATE).unwrap();
        let source =
            ScriptedSource::new((0..4).map(|_| Ok(stuck(5, "b"))).collect::<Vec<_>>());
        let db = FakeDb::scripted([Ok(false), Ok(false), Ok(false)]);
        let control = FakeControl {
            pid: None,
            stop_succeeds: true,
            ..FakeControl::default()
        };

        let reconciler = Reconciler::new(test_config(&dir, "b"), source, db, control);
        let outcome = reconciler.run().await.unwrap();

        assert_eq!(outcome, Outcome::HardBootstrapped);
        assert_eq!(reconciler.control.events(), ["restart"]);
    }

    #[tokio::test]
    async fn registry_failure_aborts_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::new([Err(lazarus_registry::Error::Unreachable(
            "connection refused".to_string(),
        ))]);
        let db = FakeDb::default();
        let control = FakeControl::default();

        let reconciler = Reconciler::new(test_config(&dir, "b"), source, db, control);
        let result = reconciler.run().await;

        assert!(matches!(result, Err(Error::Registry(_))));
        assert!(reconciler.control.events().is_empty());
    }

    #[tokio::test]
    async fn confirmation_failure_mid_sampling_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::new([
            Ok(stuck(5, "b")),
            Err(lazarus_registry::Error::Malformed("tie".to_string())),
        ]);
        let db = FakeDb::default();
        let control = FakeControl::default();

        let reconciler = Reconciler::new(test_config(&dir, "b"), source, db, control);
        assert!(reconciler.run().await.is_err());
    }
}
