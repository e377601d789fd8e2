use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{RankPublisher, RankSnapshot};
use crate::error::NotifyError;
use crate::job::JobId;
use crate::player::PlayerId;

/// A leaderboard that can be rendered somewhere
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoardTarget {
    Job(JobId),
    Global,
}

/// One row of a leaderboard (1-based rank)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopEntry {
    pub rank: usize,
    pub player: PlayerId,
    pub level: u64,
    pub experience: f64,
}

#[derive(Debug, Clone, Copy)]
struct Standing {
    level: u32,
    experience: f64,
    revision: u64,
}

/// Ordering key: level desc, experience desc, player asc
#[derive(Debug, Clone)]
struct RankKey {
    level: u64,
    experience: f64,
    player: PlayerId,
}

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .level
            .cmp(&self.level)
            .then_with(|| other.experience.total_cmp(&self.experience))
            .then_with(|| self.player.cmp(&other.player))
    }
}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RankKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RankKey {}

/// In-process leaderboard keyed by job plus a cross-job "global" board
/// ranked by total level.
#[derive(Debug, Clone, Default)]
pub struct TopListAggregator {
    standings: HashMap<PlayerId, HashMap<JobId, Standing>>,
    by_job: HashMap<JobId, BTreeSet<RankKey>>,
    global: BTreeSet<RankKey>,
    /// Current global key per player, so the old entry can be removed exactly
    global_keys: HashMap<PlayerId, RankKey>,
    changed: HashSet<BoardTarget>,
}

impl TopListAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a snapshot. Returns true if any standing changed.
    pub fn upsert(&mut self, snapshot: &RankSnapshot) -> bool {
        let jobs = self.standings.entry(snapshot.player.clone()).or_default();

        if let Some(current) = jobs.get(&snapshot.job) {
            if snapshot.revision < current.revision {
                log::trace!(
                    "Ignoring stale snapshot r{} < r{} for {} in {}",
                    snapshot.revision,
                    current.revision,
                    snapshot.player,
                    snapshot.job
                );
                return false;
            }
            if current.level == snapshot.level
                && current.experience.total_cmp(&snapshot.experience) == Ordering::Equal
            {
                if let Some(current) = jobs.get_mut(&snapshot.job) {
                    current.revision = snapshot.revision;
                }
                return false;
            }
        }

        let previous = jobs.insert(
            snapshot.job.clone(),
            Standing {
                level: snapshot.level,
                experience: snapshot.experience,
                revision: snapshot.revision,
            },
        );

        let board = self.by_job.entry(snapshot.job.clone()).or_default();
        if let Some(previous) = previous {
            board.remove(&RankKey {
                level: previous.level as u64,
                experience: previous.experience,
                player: snapshot.player.clone(),
            });
        }
        board.insert(RankKey {
            level: snapshot.level as u64,
            experience: snapshot.experience,
            player: snapshot.player.clone(),
        });

        self.reindex_global(&snapshot.player);
        self.changed.insert(BoardTarget::Job(snapshot.job.clone()));
        self.changed.insert(BoardTarget::Global);
        true
    }

    /// Drop a player's standing in one job
    pub fn forget(&mut self, job: &JobId, player: &PlayerId) -> bool {
        let Some(jobs) = self.standings.get_mut(player) else {
            return false;
        };
        let Some(previous) = jobs.remove(job) else {
            return false;
        };
        if jobs.is_empty() {
            self.standings.remove(player);
        }

        if let Some(board) = self.by_job.get_mut(job) {
            board.remove(&RankKey {
                level: previous.level as u64,
                experience: previous.experience,
                player: player.clone(),
            });
            if board.is_empty() {
                self.by_job.remove(job);
            }
        }

        self.reindex_global(player);
        self.changed.insert(BoardTarget::Job(job.clone()));
        self.changed.insert(BoardTarget::Global);
        true
    }

    fn global_key(&self, player: &PlayerId) -> Option<RankKey> {
        let jobs = self.standings.get(player)?;
        let level = jobs.values().map(|s| s.level as u64).sum();
        let experience = jobs.values().map(|s| s.experience).sum();
        Some(RankKey { level, experience, player: player.clone() })
    }

    fn reindex_global(&mut self, player: &PlayerId) {
        if let Some(previous) = self.global_keys.remove(player) {
            self.global.remove(&previous);
        }
        if let Some(key) = self.global_key(player) {
            self.global.insert(key.clone());
            self.global_keys.insert(player.clone(), key);
        }
    }

    /// Best `limit` players in `job`
    pub fn top(&self, job: &JobId, limit: usize) -> Vec<TopEntry> {
        self.by_job.get(job).map(|board| rows(board, limit)).unwrap_or_default()
    }

    /// Best `limit` players by total level across all jobs
    pub fn global_top(&self, limit: usize) -> Vec<TopEntry> {
        rows(&self.global, limit)
    }

    pub fn rank_of(&self, job: &JobId, player: &PlayerId) -> Option<usize> {
        let board = self.by_job.get(job)?;
        board.iter().position(|key| &key.player == player).map(|i| i + 1)
    }

    pub fn global_rank_of(&self, player: &PlayerId) -> Option<usize> {
        self.global.iter().position(|key| &key.player == player).map(|i| i + 1)
    }

    /// Number of ranked players in `job`
    pub fn board_len(&self, job: &JobId) -> usize {
        self.by_job.get(job).map_or(0, BTreeSet::len)
    }

    /// Boards touched since the last call
    pub fn take_changed(&mut self) -> Vec<BoardTarget> {
        self.changed.drain().collect()
    }

    /// Serialize a board for external consumers
    pub fn export_json(&self, target: &BoardTarget, limit: usize) -> serde_json::Result<String> {
        let entries = match target {
            BoardTarget::Job(job) => self.top(job, limit),
            BoardTarget::Global => self.global_top(limit),
        };
        serde_json::to_string(&entries)
    }
}

fn rows(board: &BTreeSet<RankKey>, limit: usize) -> Vec<TopEntry> {
    board
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, key)| TopEntry {
            rank: i + 1,
            player: key.player.clone(),
            level: key.level,
            experience: key.experience,
        })
        .collect()
}

impl RankPublisher for TopListAggregator {
    fn publish(&mut self, snapshot: &RankSnapshot) -> Result<(), NotifyError> {
        self.upsert(snapshot);
        Ok(())
    }
}
