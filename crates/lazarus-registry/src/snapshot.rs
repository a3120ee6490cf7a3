//! Reduction of raw registry records into a [`ClusterSnapshot`].
//!
//! The snapshot answers two questions for the reconciler:
//!
//! - is any check passing (cluster still has a live primary component)?
//! - which single node is the designated bootstrap leader?
//!
//! Leader selection is deterministic: the node with the highest
//! replication-progress counter wins, and among equally advanced nodes the
//! registry's modify-index acts as a recency tie-breaker. Every observer
//! that sees the same record set computes the same leader, which is the
//! only mutual-exclusion mechanism the recovery procedure has.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::record::CheckRecord;

/// One decision cycle's view of the cluster, rebuilt on every poll.
#[derive(Debug, Clone)]
pub struct ClusterSnapshot {
    /// Status strings of all health checks, in registry order.
    pub statuses: Vec<String>,

    /// Replication-progress counter per node, as far as the progress
    /// checks reported one.
    pub progress_by_node: BTreeMap<String, u64>,

    /// Highest progress counter seen, 0 when nothing reported.
    pub max_progress: u64,

    /// Nodes whose counter equals `max_progress`.
    pub most_advanced_nodes: BTreeSet<String>,

    /// Modify-index that selects the bootstrap node: the highest index
    /// among health entries of the most advanced nodes, or among all
    /// health entries when no progress data exists.
    pub candidate_modify_index: u64,

    /// The single node elected to re-form the cluster.
    pub bootstrap_node: String,
}

impl ClusterSnapshot {
    /// Reduce the two check lists into a snapshot.
    ///
    /// Fails with [`Error::Malformed`] when the health list is empty, a
    /// progress output does not parse, or no unique bootstrap node
    /// resolves. A tie on the candidate modify-index means two observers
    /// could elect different leaders, so it is rejected outright.
    pub fn reduce(health: &[CheckRecord], progress: &[CheckRecord]) -> Result<Self> {
        if health.is_empty() {
            return Err(Error::Malformed(
                "registry returned no health checks".to_string(),
            ));
        }

        let statuses: Vec<String> = health.iter().map(|r| r.status.clone()).collect();

        // A node may report progress through more than one record; keep
        // the largest counter so a stale duplicate cannot demote it.
        let mut progress_by_node: BTreeMap<String, u64> = BTreeMap::new();
        for record in progress {
            if let Some(value) = record.progress().transpose()? {
                let entry = progress_by_node.entry(record.node.clone()).or_insert(value);
                *entry = (*entry).max(value);
            }
        }

        let max_progress = progress_by_node.values().copied().max().unwrap_or(0);
        let most_advanced_nodes: BTreeSet<String> = progress_by_node
            .iter()
            .filter(|(_, &v)| v == max_progress)
            .map(|(node, _)| node.clone())
            .collect();

        let candidate_modify_index = if most_advanced_nodes.is_empty() {
            health.iter().map(|r| r.modify_index).max().unwrap_or(0)
        } else {
            health
                .iter()
                .filter(|r| most_advanced_nodes.contains(&r.node))
                .map(|r| r.modify_index)
                .max()
                .ok_or_else(|| {
                    Error::Malformed(
                        "no health entry for any of the most advanced nodes".to_string(),
                    )
                })?
        };

        let mut candidates = health
            .iter()
            .filter(|r| r.modify_index == candidate_modify_index);
        let bootstrap_node = match (candidates.next(), candidates.next()) {
            (Some(record), None) => record.node.clone(),
            (Some(_), Some(_)) => {
                return Err(Error::Malformed(format!(
                    "modify-index {candidate_modify_index} matches more than one health entry"
                )))
            }
            (None, _) => {
                return Err(Error::Malformed(format!(
                    "no health entry at modify-index {candidate_modify_index}"
                )))
            }
        };

        Ok(Self {
            statuses,
            progress_by_node,
            max_progress,
            most_advanced_nodes,
            candidate_modify_index,
            bootstrap_node,
        })
    }

    /// True when at least one health check is passing.
    ///
    /// Deliberately "any passing", not "all passing": a single live check
    /// means the registry still sees a primary component somewhere, and
    /// recovery must stay hands-off.
    pub fn any_passing(&self) -> bool {
        self.statuses.iter().any(|s| s == "passing")
    }
}
