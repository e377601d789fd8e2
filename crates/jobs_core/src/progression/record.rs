use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::context::ProgressionContext;
use crate::error::{JobsError, Result};
use crate::job::Job;
use crate::player::PlayerId;
use crate::ranking::RankSnapshot;

/// Memoized threshold of the current level.
///
/// Cleared explicitly whenever level, job or the held-job count changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MaxExperience {
    value: i64,
    stale: bool,
}

impl MaxExperience {
    pub(crate) fn stale() -> Self {
        Self { value: 0, stale: true }
    }

    pub(crate) fn get(&self) -> Option<i64> {
        (!self.stale).then_some(self.value)
    }

    pub(crate) fn set(&mut self, value: i64) {
        self.value = value;
        self.stale = false;
    }

    pub(crate) fn invalidate(&mut self) {
        self.stale = true;
    }
}

/// Persisted part of a record, as supplied by the storage layer on load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSeed {
    pub level: u32,
    pub experience: f64,
    #[serde(default)]
    pub left_on: i64,
    #[serde(default)]
    pub last_experience_delta: f64,
}

impl Default for RecordSeed {
    fn default() -> Self {
        Self { level: 1, experience: 0.0, left_on: 0, last_experience_delta: 0.0 }
    }
}

/// Per-player, per-job progression state
#[derive(Debug, Clone)]
pub struct ProgressionRecord {
    pub(super) job: Arc<Job>,
    pub(super) player: PlayerId,
    pub(super) level: u32,
    pub(super) experience: f64,
    pub(super) max_experience: MaxExperience,
    /// Net experience change since the last reset. `take_experience` lowers
    /// it instead of adding the amount taken, so it is not a gross total and
    /// can go negative.
    pub(super) last_experience_delta: f64,
    pub(super) left_on: i64,
    pub(super) dirty: bool,
    pub(super) revision: u64,
}

impl ProgressionRecord {
    pub fn new(job: Arc<Job>, player: PlayerId, level: u32, experience: f64) -> Result<Self> {
        Self::from_seed(job, player, RecordSeed { level, experience, ..RecordSeed::default() })
    }

    /// Restore a record from persisted values
    pub fn from_seed(job: Arc<Job>, player: PlayerId, seed: RecordSeed) -> Result<Self> {
        if seed.level < 1 {
            return Err(JobsError::InvalidArgument(format!(
                "level must be at least 1, got {}",
                seed.level
            )));
        }
        ensure_finite("experience", seed.experience)?;
        ensure_finite("last experience delta", seed.last_experience_delta)?;

        Ok(Self {
            job,
            player,
            level: seed.level,
            experience: seed.experience,
            max_experience: MaxExperience::stale(),
            last_experience_delta: seed.last_experience_delta,
            left_on: seed.left_on.max(0),
            dirty: false,
            revision: 0,
        })
    }

    /// Values the storage layer needs to recreate this record
    pub fn seed(&self) -> RecordSeed {
        RecordSeed {
            level: self.level,
            experience: self.experience,
            left_on: self.left_on,
            last_experience_delta: self.last_experience_delta,
        }
    }

    pub fn job(&self) -> &Arc<Job> {
        &self.job
    }

    pub fn player(&self) -> &PlayerId {
        &self.player
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn experience(&self) -> f64 {
        self.experience
    }

    /// Cached threshold, `None` while stale
    pub fn max_experience(&self) -> Option<i64> {
        self.max_experience.get()
    }

    /// Net change since the last reset; takes count negative.
    pub fn last_experience_delta(&self) -> f64 {
        self.last_experience_delta
    }

    pub fn reset_last_experience_delta(&mut self) {
        self.last_experience_delta = 0.0;
    }

    pub fn left_on(&self) -> i64 {
        self.left_on
    }

    pub fn has_left(&self) -> bool {
        self.left_on != 0
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Called by the persistence layer once the record is stored
    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Continue publishing after `revision` so earlier standings for the
    /// same (job, player) read as stale.
    pub(crate) fn continue_revisions_from(&mut self, revision: u64) {
        self.revision = self.revision.max(revision);
    }

    pub fn snapshot(&self) -> RankSnapshot {
        RankSnapshot {
            job: self.job.id.clone(),
            player: self.player.clone(),
            level: self.level,
            experience: self.experience,
            revision: self.revision,
        }
    }

    /// Forget the cached threshold; the next read goes through the curve.
    pub fn invalidate_max_experience(&mut self) {
        self.max_experience.invalidate();
    }

    /// Threshold of the current level, recomputed if stale.
    pub fn refresh_max_experience(&mut self, ctx: &ProgressionContext<'_>) -> i64 {
        self.threshold(ctx)
    }

    pub(super) fn threshold(&mut self, ctx: &ProgressionContext<'_>) -> i64 {
        if let Some(value) = self.max_experience.get() {
            return value;
        }
        let value = ctx.curve.max_experience(&self.job.id, self.level, ctx.jobs_held);
        self.max_experience.set(value);
        value
    }

    /// Add (or with a negative delta, remove) experience.
    /// Returns true if at least one level-up happened.
    pub fn add_experience(&mut self, delta: f64, ctx: &mut ProgressionContext<'_>) -> Result<bool> {
        ensure_finite("experience delta", delta)?;
        self.dirty = true;
        self.experience += delta;
        self.last_experience_delta += delta;
        self.resolve(ctx)
    }

    pub fn take_experience(&mut self, amount: f64, ctx: &mut ProgressionContext<'_>) -> Result<bool> {
        ensure_finite("experience amount", amount)?;
        if amount < 0.0 {
            return Err(JobsError::InvalidArgument(format!(
                "cannot take a negative amount of experience ({})",
                amount
            )));
        }
        self.add_experience(-amount, ctx)
    }

    pub fn set_experience(&mut self, value: f64, ctx: &mut ProgressionContext<'_>) -> Result<bool> {
        ensure_finite("experience", value)?;
        self.dirty = true;
        self.experience = value;
        self.resolve(ctx)
    }

    /// Jump to `level`; experience already past the new threshold carries over.
    pub fn set_level(&mut self, level: u32, ctx: &mut ProgressionContext<'_>) -> Result<bool> {
        let upper = self.job.absolute_max_level().unwrap_or(u32::MAX);
        if level < 1 || level > upper {
            return Err(JobsError::InvalidArgument(format!(
                "level {} out of range 1..={} for job {}",
                level, upper, self.job.id
            )));
        }
        self.dirty = true;
        self.level = level;
        self.max_experience.invalidate();
        self.resolve(ctx)
    }

    pub fn set_job(&mut self, job: Arc<Job>, ctx: &mut ProgressionContext<'_>) -> Result<bool> {
        self.dirty = true;
        self.job = job;
        self.max_experience.invalidate();
        self.resolve(ctx)
    }
}

fn ensure_finite(what: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(JobsError::InvalidArgument(format!("{} must be finite, got {}", what, value)))
    }
}
