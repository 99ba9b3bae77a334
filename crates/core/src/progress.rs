//! Transfer progress events.

use crate::version::VersionRecord;
use serde::{Deserialize, Serialize};

/// An event pushed to the uploading client while an ingest runs.
///
/// A transfer emits zero or more `Progress` events followed by exactly one
/// terminal `Completed` or `Failed` event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransferProgressEvent {
    Progress { percent: u8 },
    Completed { result: VersionRecord },
    Failed { code: String, error: String },
}

impl TransferProgressEvent {
    /// Event name used on the wire (`progress`, `completed`, `failed`).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Progress { .. } => "progress",
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }
}

/// Turns a running byte count into whole-percent progress updates.
///
/// `advance` yields a value only when the whole percent strictly increases,
/// so a transfer produces at most 100 updates regardless of chunk size.
#[derive(Clone, Debug)]
pub struct ProgressThrottle {
    total: u64,
    transferred: u64,
    last_percent: u8,
}

impl ProgressThrottle {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            transferred: 0,
            last_percent: 0,
        }
    }

    /// Record `bytes` more transferred; returns the new percent if it grew.
    pub fn advance(&mut self, bytes: u64) -> Option<u8> {
        self.transferred = self.transferred.saturating_add(bytes);
        let percent = self.percent();
        if percent > self.last_percent {
            self.last_percent = percent;
            Some(percent)
        } else {
            None
        }
    }

    /// Current whole percent, clamped to 100. A zero-length total reports 0.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let percent = (self.transferred as u128 * 100) / self.total as u128;
        percent.min(100) as u8
    }

    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}
