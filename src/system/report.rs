// src/system/report.rs

use crate::common::{address::XerxesAddr, error::XerxesError};
use core::fmt::Debug;
use core::time::Duration;
use log::{error, warn};

/// How a single leaf failed during a cycle.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FailureKind {
    Checksum,
    Incomplete,
    /// Leaf did not answer.
    Timeout,
    /// Bus lock not obtained in time.
    Busy,
    /// Anything else, including a panicking leaf.
    Other,
}

impl FailureKind {
    pub fn of<E: Debug>(err: &XerxesError<E>) -> Self {
        match err {
            XerxesError::Checksum { .. } => FailureKind::Checksum,
            XerxesError::MessageIncomplete => FailureKind::Incomplete,
            XerxesError::Timeout | XerxesError::FrameSyncTimeout => FailureKind::Timeout,
            XerxesError::NetworkBusy => FailureKind::Busy,
            _ => FailureKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafFailure {
    pub address: XerxesAddr,
    pub kind: FailureKind,
    pub detail: String,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CycleOutcome {
    /// Every leaf was visited; individual leaves may still have failed.
    Completed,
    /// The bus could not be acquired; no leaf was visited.
    NetworkBusy,
}

/// What one poll cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Sequence number, starting at 1.
    pub cycle: u64,
    pub outcome: CycleOutcome,
    /// Leaves that fetched successfully, in poll order.
    pub fetched: Vec<XerxesAddr>,
    pub failures: Vec<LeafFailure>,
    /// Set when the sync broadcast failed. The cycle carries on regardless.
    pub sync_error: Option<String>,
    pub duration: Duration,
}

impl CycleReport {
    pub(super) fn new(cycle: u64) -> Self {
        CycleReport {
            cycle,
            outcome: CycleOutcome::Completed,
            fetched: Vec::new(),
            failures: Vec::new(),
            sync_error: None,
            duration: Duration::ZERO,
        }
    }

    /// No sync error and no failed leaf.
    pub fn is_clean(&self) -> bool {
        self.outcome == CycleOutcome::Completed && self.sync_error.is_none() && self.failures.is_empty()
    }

    pub fn failure(&self, address: XerxesAddr) -> Option<&LeafFailure> {
        self.failures.iter().find(|f| f.address == address)
    }

    /// Logs and records a failed fetch.
    pub(super) fn record_error<E: Debug>(&mut self, address: XerxesAddr, err: &XerxesError<E>) {
        let kind = FailureKind::of(err);
        match kind {
            FailureKind::Checksum => warn!("message from leaf {address} has invalid checksum"),
            FailureKind::Incomplete => warn!("message from leaf {address} is not complete"),
            FailureKind::Timeout => warn!("Leaf {address} is not responding"),
            FailureKind::Busy => warn!("trying to access busy network"),
            FailureKind::Other => error!("unexpected error polling leaf {address}: {err}"),
        }
        self.failures.push(LeafFailure { address, kind, detail: err.to_string() });
    }

    pub(super) fn record_panic(&mut self, address: XerxesAddr, detail: String) {
        error!("leaf {address} panicked during fetch: {detail}");
        self.failures.push(LeafFailure { address, kind: FailureKind::Other, detail });
    }
}
