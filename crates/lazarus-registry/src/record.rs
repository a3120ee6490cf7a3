//! Wire format of the health registry's check records.

use crate::error::{Error, Result};
use serde::Deserialize;

/// Marker that identifies a replication-progress check output.
pub const PROGRESS_MARKER: &str = "wsrep_last_committed";

/// One check record as returned by the registry's health endpoints.
///
/// The same shape is used by both lists the collector fetches: the
/// aggregate health checks and the replication-progress checks.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckRecord {
    /// Node the check was reported for.
    #[serde(rename = "Node")]
    pub node: String,

    /// Check status, e.g. "passing" or "critical".
    #[serde(rename = "Status")]
    pub status: String,

    /// Free-text check output. Progress checks embed the
    /// `wsrep_last_committed` counter here.
    #[serde(rename = "Output")]
    pub output: String,

    /// Registry-side logical clock; bumped whenever the entry changes.
    #[serde(rename = "ModifyIndex")]
    pub modify_index: u64,
}

impl CheckRecord {
    /// Parse the replication-progress counter out of the check output.
    ///
    /// Progress checks print a line containing [`PROGRESS_MARKER`] with the
    /// counter as the second whitespace-separated token. Returns `None` for
    /// records that are not progress reports; a progress report whose value
    /// is missing or non-numeric is a malformed response.
    pub fn progress(&self) -> Option<Result<u64>> {
        if !self.output.contains(PROGRESS_MARKER) {
            return None;
        }
        let parsed = self
            .output
            .split_whitespace()
            .nth(1)
            .and_then(|token| token.parse().ok())
            .ok_or_else(|| {
                Error::Malformed(format!(
                    "unparseable progress output from node {}: {:?}",
                    self.node, self.output
                ))
            });
        Some(parsed)
    }
}
