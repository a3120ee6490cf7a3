//! Lazarus Registry - Cluster Snapshot Collector
//!
//! Observes a Consul-style health registry and reduces its per-node check
//! records into a single [`ClusterSnapshot`]: the check statuses, the
//! replication-progress counters, and the deterministically elected
//! bootstrap node. The reconciler in `lazarus-reconciler` consumes these
//! snapshots to decide whether the cluster has lost quorum and who is
//! responsible for re-forming it.
//!
//! # Architecture
//!
//! - **Record**: the registry's wire format (`Node`, `Status`, `Output`,
//!   `ModifyIndex`) plus progress-counter extraction
//! - **Snapshot**: pure reduction from record lists to a decision view
//! - **Client**: reqwest-backed fetch of the two check lists, behind the
//!   [`SnapshotSource`] seam

pub mod client;
pub mod error;
pub mod record;
pub mod snapshot;

pub use client::{RegistryClient, RegistryConfig, SnapshotSource};
pub use error::{Error, Result};
pub use record::CheckRecord;
pub use snapshot::ClusterSnapshot;
