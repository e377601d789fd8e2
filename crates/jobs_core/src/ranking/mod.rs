//! Leaderboards
//!
//! Every leveling resolution pushes a [`RankSnapshot`] through a
//! [`RankPublisher`]. [`TopListAggregator`] is the in-process publisher: it
//! keeps per-job and global standings ordered incrementally, and
//! [`RefreshQueue`] collapses repeated "this board changed" signals into a
//! single delayed refresh for whatever renders the boards.

pub mod aggregator;
pub mod refresh;

pub use aggregator::{BoardTarget, TopEntry, TopListAggregator};
pub use refresh::RefreshQueue;

use serde::{Deserialize, Serialize};

use crate::error::NotifyError;
use crate::job::JobId;
use crate::player::PlayerId;

/// Standing of one player in one job after a resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankSnapshot {
    pub job: JobId,
    pub player: PlayerId,
    pub level: u32,
    pub experience: f64,
    /// Per-record publish counter; older revisions are stale
    pub revision: u64,
}

/// Receiver of rank snapshots.
///
/// Implementations must treat snapshots as an upsert keyed by
/// `(job, player)` and tolerate duplicates.
pub trait RankPublisher {
    fn publish(&mut self, snapshot: &RankSnapshot) -> Result<(), NotifyError>;
}

/// Discards every snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPublisher;

impl RankPublisher for NullPublisher {
    fn publish(&mut self, _snapshot: &RankSnapshot) -> Result<(), NotifyError> {
        Ok(())
    }
}
