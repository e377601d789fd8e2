//! Player profiles
//!
//! A profile owns every progression record of one player (active and left),
//! plus the player-wide limits those records feed.

mod limits;

pub use limits::PlayerLimits;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::LevelingConfig;
use crate::curve::CurveFunction;
use crate::error::{JobsError, Result};
use crate::job::{Job, JobId};
use crate::progression::{ProgressionContext, ProgressionRecord, RecordSeed};
use crate::ranking::RankPublisher;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(Uuid);

impl PlayerId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared pieces a profile needs to run a record mutation
pub struct Leveling<'a> {
    pub curve: &'a dyn CurveFunction,
    pub publisher: &'a mut dyn RankPublisher,
    pub rules: &'a LevelingConfig,
}

#[derive(Debug, Clone)]
pub struct PlayerProfile {
    id: PlayerId,
    name: String,
    records: HashMap<JobId, ProgressionRecord>,
    limits: PlayerLimits,
    /// Last published revision of deleted records, per job
    retired_revisions: HashMap<JobId, u64>,
    dirty: bool,
}

impl PlayerProfile {
    pub fn new(id: PlayerId, name: impl Into<String>, limits: PlayerLimits) -> Self {
        Self {
            id,
            name: name.into(),
            records: HashMap::new(),
            limits,
            retired_revisions: HashMap::new(),
            dirty: false,
        }
    }

    pub fn id(&self) -> &PlayerId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn limits(&self) -> &PlayerLimits {
        &self.limits
    }

    /// Jobs currently held (left records excluded)
    pub fn jobs_held(&self) -> usize {
        self.records.values().filter(|r| !r.has_left()).count()
    }

    pub fn record(&self, job: &JobId) -> Option<&ProgressionRecord> {
        self.records.get(job)
    }

    /// Direct access for persistence bookkeeping. Progression changes still
    /// go through [`PlayerProfile::mutate`], which supplies the context.
    pub fn record_mut(&mut self, job: &JobId) -> Option<&mut ProgressionRecord> {
        self.records.get_mut(job)
    }

    /// Active record for `job`, if the player currently holds it
    pub fn active_record(&self, job: &JobId) -> Option<&ProgressionRecord> {
        self.records.get(job).filter(|r| !r.has_left())
    }

    pub fn records(&self) -> impl Iterator<Item = &ProgressionRecord> {
        self.records.values()
    }

    pub fn total_level(&self) -> u64 {
        self.records.values().filter(|r| !r.has_left()).map(|r| r.level() as u64).sum()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty || self.records.values().any(ProgressionRecord::is_dirty)
    }

    /// Called by the persistence layer after a successful save
    pub fn mark_saved(&mut self) {
        self.dirty = false;
        for record in self.records.values_mut() {
            record.mark_saved();
        }
    }

    /// Held-job count changed: every cached threshold depends on it.
    fn invalidate_thresholds(&mut self) {
        for record in self.records.values_mut() {
            record.invalidate_max_experience();
        }
    }

    /// Start (or resume) a job.
    ///
    /// A previously left record is resurrected if its cooldown has elapsed or
    /// `bypass` is set; otherwise a new record is seeded.
    pub fn join(
        &mut self,
        job: Arc<Job>,
        seed: Option<RecordSeed>,
        now_ms: i64,
        bypass: bool,
        leveling: Leveling<'_>,
    ) -> Result<bool> {
        let held = self.jobs_held();
        match self.records.get(&job.id) {
            Some(existing) if !existing.has_left() => {
                return Err(JobsError::AlreadyInJob { player: self.id.clone(), job: job.id.clone() });
            }
            Some(existing) if !existing.can_rejoin(now_ms, bypass) => {
                let remaining_ms = existing
                    .rejoin_time_remaining(now_ms)
                    .map_or(0, |d| d.num_milliseconds());
                return Err(JobsError::RejoinCooldown { job: job.id.clone(), remaining_ms });
            }
            _ => {}
        }
        if held >= self.limits.max_jobs() {
            return Err(JobsError::JobLimitReached { max: self.limits.max_jobs() });
        }

        let record = match self.records.remove(&job.id) {
            Some(mut left) => {
                left.resurrect();
                left
            }
            None => {
                let mut fresh =
                    ProgressionRecord::from_seed(Arc::clone(&job), self.id.clone(), seed.unwrap_or_default())?;
                if let Some(&revision) = self.retired_revisions.get(&job.id) {
                    fresh.continue_revisions_from(revision);
                }
                fresh
            }
        };
        self.limits.track(&job.id, record.level());
        self.records.insert(job.id.clone(), record);
        self.invalidate_thresholds();
        self.dirty = true;

        // Normalize the seeded values and publish the first standing
        self.mutate(&job.id, leveling, |record, ctx| {
            let experience = record.experience();
            record.set_experience(experience, ctx)
        })
    }

    /// Leave a job; the record stays for cooldown tracking.
    pub fn leave(&mut self, job: &JobId, now_ms: i64) -> Result<()> {
        let record = self
            .records
            .get_mut(job)
            .filter(|r| !r.has_left())
            .ok_or_else(|| JobsError::NotInJob { player: self.id.clone(), job: job.clone() })?;
        record.mark_left(now_ms);
        self.limits.untrack(job);
        self.invalidate_thresholds();
        self.dirty = true;
        Ok(())
    }

    /// Explicit deletion, driven by an external expiry policy
    pub fn remove_record(&mut self, job: &JobId) -> Option<ProgressionRecord> {
        let removed = self.records.remove(job)?;
        self.retire_revision(job, removed.revision());
        if !removed.has_left() {
            self.limits.untrack(job);
            self.invalidate_thresholds();
        }
        self.dirty = true;
        Some(removed)
    }

    fn retire_revision(&mut self, job: &JobId, revision: u64) {
        let retired = self.retired_revisions.entry(job.clone()).or_insert(0);
        *retired = (*retired).max(revision);
    }

    /// Run one state-machine operation on the active record for `job`.
    pub fn mutate<F>(&mut self, job: &JobId, leveling: Leveling<'_>, op: F) -> Result<bool>
    where
        F: FnOnce(&mut ProgressionRecord, &mut ProgressionContext<'_>) -> Result<bool>,
    {
        let jobs_held = self.jobs_held();
        let record = self
            .records
            .get_mut(job)
            .filter(|r| !r.has_left())
            .ok_or_else(|| JobsError::NotInJob { player: self.id.clone(), job: job.clone() })?;

        let mut ctx = ProgressionContext::new(
            leveling.curve,
            &mut self.limits,
            leveling.publisher,
            leveling.rules,
            jobs_held,
        );
        op(record, &mut ctx)
    }

    /// Move the progression held in `from` over to another job definition.
    ///
    /// A left record for the target job is replaced once its rejoin
    /// cooldown has elapsed (or `bypass` is set).
    pub fn change_job(
        &mut self,
        from: &JobId,
        to: Arc<Job>,
        now_ms: i64,
        bypass: bool,
        leveling: Leveling<'_>,
    ) -> Result<bool> {
        if !self.records.get(from).is_some_and(|r| !r.has_left()) {
            return Err(JobsError::NotInJob { player: self.id.clone(), job: from.clone() });
        }
        if &to.id != from {
            match self.records.get(&to.id) {
                Some(existing) if !existing.has_left() => {
                    return Err(JobsError::AlreadyInJob { player: self.id.clone(), job: to.id.clone() });
                }
                Some(existing) if !existing.can_rejoin(now_ms, bypass) => {
                    let remaining_ms = existing
                        .rejoin_time_remaining(now_ms)
                        .map_or(0, |d| d.num_milliseconds());
                    return Err(JobsError::RejoinCooldown { job: to.id.clone(), remaining_ms });
                }
                _ => {}
            }
            if let Some(left) = self.records.remove(&to.id) {
                self.retire_revision(&to.id, left.revision());
            }
        }

        let jobs_held = self.jobs_held();
        let Some(mut record) = self.records.remove(from) else {
            return Err(JobsError::NotInJob { player: self.id.clone(), job: from.clone() });
        };
        if &to.id != from {
            self.retire_revision(from, record.revision());
        }
        if let Some(&revision) = self.retired_revisions.get(&to.id) {
            record.continue_revisions_from(revision);
        }
        self.limits.untrack(from);
        self.limits.track(&to.id, record.level());

        let to_id = to.id.clone();
        let result = {
            let mut ctx = ProgressionContext::new(
                leveling.curve,
                &mut self.limits,
                leveling.publisher,
                leveling.rules,
                jobs_held,
            );
            record.set_job(to, &mut ctx)
        };
        self.records.insert(to_id, record);
        self.dirty = true;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimitsConfig;
    use crate::curve::CurveSpec;
    use crate::ranking::TopListAggregator;

    const NOW: i64 = 1_700_000_000_000;

    fn profile(max_jobs: usize) -> PlayerProfile {
        let limits = PlayerLimits::new(
            LimitsConfig { base_max_jobs: max_jobs, levels_per_bonus_job: 0, max_jobs_cap: 10 },
            false,
        );
        PlayerProfile::new(PlayerId::new_v4(), "steve", limits)
    }

    fn miner() -> Arc<Job> {
        Arc::new(
            Job::new("miner", "Miner")
                .with_rejoin_cooldown_ms(60_000)
                .with_curve(CurveSpec::Constant { value: 100 }),
        )
    }

    fn fisher() -> Arc<Job> {
        Arc::new(Job::new("fisher", "Fisher").with_curve(CurveSpec::Constant { value: 100 }))
    }

    #[test]
    fn test_join_publishes_and_normalizes_seed() {
        let rules = LevelingConfig::default();
        let curve = CurveSpec::Constant { value: 100 };
        let mut board = TopListAggregator::new();
        let mut player = profile(3);
        let seed = RecordSeed { level: 1, experience: 250.0, ..RecordSeed::default() };

        let leveled = player
            .join(miner(), Some(seed), NOW, false, Leveling { curve: &curve, publisher: &mut board, rules: &rules })
            .unwrap();

        assert!(leveled);
        let record = player.active_record(&JobId::new("miner")).unwrap();
        assert_eq!(record.level(), 3);
        assert_eq!(record.experience(), 50.0);
        assert_eq!(board.rank_of(&JobId::new("miner"), player.id()), Some(1));
        assert!(player.is_dirty());
        assert_eq!(player.limits().total_levels(), 3);
    }

    #[test]
    fn test_join_limits() {
        let rules = LevelingConfig::default();
        let curve = CurveSpec::Constant { value: 100 };
        let mut board = TopListAggregator::new();
        let mut player = profile(1);

        player.join(miner(), None, NOW, false, Leveling { curve: &curve, publisher: &mut board, rules: &rules }).unwrap();

        let err = player
            .join(miner(), None, NOW, false, Leveling { curve: &curve, publisher: &mut board, rules: &rules })
            .unwrap_err();
        assert!(matches!(err, JobsError::AlreadyInJob { .. }));

        let err = player
            .join(fisher(), None, NOW, false, Leveling { curve: &curve, publisher: &mut board, rules: &rules })
            .unwrap_err();
        assert_eq!(err, JobsError::JobLimitReached { max: 1 });
    }

    #[test]
    fn test_leave_and_rejoin_cooldown() {
        let rules = LevelingConfig::default();
        let curve = CurveSpec::Constant { value: 100 };
        let mut board = TopListAggregator::new();
        let mut player = profile(2);
        let seed = RecordSeed { level: 4, experience: 20.0, ..RecordSeed::default() };

        player.join(miner(), Some(seed), NOW, false, Leveling { curve: &curve, publisher: &mut board, rules: &rules }).unwrap();
        player.leave(&JobId::new("miner"), NOW).unwrap();
        assert_eq!(player.jobs_held(), 0);
        assert!(player.active_record(&JobId::new("miner")).is_none());
        assert!(player.record(&JobId::new("miner")).unwrap().has_left());

        let err = player
            .join(miner(), None, NOW + 30_000, false, Leveling { curve: &curve, publisher: &mut board, rules: &rules })
            .unwrap_err();
        assert_eq!(err, JobsError::RejoinCooldown { job: JobId::new("miner"), remaining_ms: 30_000 });

        player.join(miner(), None, NOW + 60_000, false, Leveling { curve: &curve, publisher: &mut board, rules: &rules }).unwrap();
        let record = player.active_record(&JobId::new("miner")).unwrap();
        assert_eq!(record.level(), 4, "progress survives a rejoin");
        assert_eq!(record.experience(), 20.0);
    }

    #[test]
    fn test_bypass_skips_cooldown() {
        let rules = LevelingConfig::default();
        let curve = CurveSpec::Constant { value: 100 };
        let mut board = TopListAggregator::new();
        let mut player = profile(2);

        player.join(miner(), None, NOW, false, Leveling { curve: &curve, publisher: &mut board, rules: &rules }).unwrap();
        player.leave(&JobId::new("miner"), NOW).unwrap();
        player.join(miner(), None, NOW + 1, true, Leveling { curve: &curve, publisher: &mut board, rules: &rules }).unwrap();
        assert_eq!(player.jobs_held(), 1);
    }

    #[test]
    fn test_job_count_change_invalidates_thresholds() {
        let rules = LevelingConfig::default();
        let curve = |_: &JobId, _: u32, held: usize| 100 * held as i64;
        let mut board = TopListAggregator::new();
        let mut player = profile(3);

        player.join(miner(), None, NOW, false, Leveling { curve: &curve, publisher: &mut board, rules: &rules }).unwrap();
        assert_eq!(player.record(&JobId::new("miner")).unwrap().max_experience(), Some(100));

        player.join(fisher(), None, NOW, false, Leveling { curve: &curve, publisher: &mut board, rules: &rules }).unwrap();
        assert_eq!(player.record(&JobId::new("miner")).unwrap().max_experience(), None);

        let leveled = player
            .mutate(&JobId::new("miner"), Leveling { curve: &curve, publisher: &mut board, rules: &rules }, |r, ctx| {
                r.add_experience(150.0, ctx)
            })
            .unwrap();
        assert!(!leveled, "threshold doubled with the second job");
        assert_eq!(player.record(&JobId::new("miner")).unwrap().max_experience(), Some(200));
    }

    #[test]
    fn test_mutate_requires_active_job() {
        let rules = LevelingConfig::default();
        let curve = CurveSpec::Constant { value: 100 };
        let mut board = TopListAggregator::new();
        let mut player = profile(3);

        let err = player
            .mutate(&JobId::new("miner"), Leveling { curve: &curve, publisher: &mut board, rules: &rules }, |r, ctx| {
                r.add_experience(1.0, ctx)
            })
            .unwrap_err();
        assert!(matches!(err, JobsError::NotInJob { .. }));
    }

    #[test]
    fn test_change_job_moves_record() {
        let rules = LevelingConfig::default();
        let curve = CurveSpec::Constant { value: 100 };
        let mut board = TopListAggregator::new();
        let mut player = profile(3);
        let seed = RecordSeed { level: 5, experience: 10.0, ..RecordSeed::default() };

        player.join(miner(), Some(seed), NOW, false, Leveling { curve: &curve, publisher: &mut board, rules: &rules }).unwrap();
        player
            .change_job(&JobId::new("miner"), fisher(), NOW, false, Leveling { curve: &curve, publisher: &mut board, rules: &rules })
            .unwrap();

        assert!(player.record(&JobId::new("miner")).is_none());
        let record = player.active_record(&JobId::new("fisher")).unwrap();
        assert_eq!(record.level(), 5);
        assert_eq!(record.job().id, JobId::new("fisher"));
    }

    #[test]
    fn test_record_mut_resets_delta() {
        let rules = LevelingConfig::default();
        let curve = CurveSpec::Constant { value: 100 };
        let mut board = TopListAggregator::new();
        let mut player = profile(3);
        let miner_id = JobId::new("miner");

        player.join(miner(), None, NOW, false, Leveling { curve: &curve, publisher: &mut board, rules: &rules }).unwrap();
        player
            .mutate(&miner_id, Leveling { curve: &curve, publisher: &mut board, rules: &rules }, |r, ctx| {
                r.add_experience(30.0, ctx)
            })
            .unwrap();
        assert_eq!(player.record(&miner_id).unwrap().last_experience_delta(), 30.0);

        player.record_mut(&miner_id).unwrap().reset_last_experience_delta();
        assert_eq!(player.record(&miner_id).unwrap().last_experience_delta(), 0.0);
        assert!(player.record_mut(&JobId::new("fisher")).is_none());
    }

    #[test]
    fn test_removed_record_does_not_linger_on_board() {
        let rules = LevelingConfig::default();
        let curve = CurveSpec::Constant { value: 100 };
        let mut board = TopListAggregator::new();
        let mut player = profile(3);
        let miner_id = JobId::new("miner");

        player.join(miner(), None, NOW, false, Leveling { curve: &curve, publisher: &mut board, rules: &rules }).unwrap();
        for _ in 0..5 {
            player
                .mutate(&miner_id, Leveling { curve: &curve, publisher: &mut board, rules: &rules }, |r, ctx| {
                    r.add_experience(150.0, ctx)
                })
                .unwrap();
        }
        assert_eq!(board.top(&miner_id, 1)[0].level, 8);

        let removed = player.remove_record(&miner_id).unwrap();
        player.join(miner(), None, NOW, false, Leveling { curve: &curve, publisher: &mut board, rules: &rules }).unwrap();

        let record = player.active_record(&miner_id).unwrap();
        assert_eq!(record.level(), 1);
        assert!(record.revision() > removed.revision());
        let top = board.top(&miner_id, 10);
        assert_eq!(top.len(), 1);
        assert_eq!((top[0].level, top[0].experience), (1, 0.0));
    }

    #[test]
    fn test_change_job_into_left_job() {
        let rules = LevelingConfig::default();
        let curve = CurveSpec::Constant { value: 100 };
        let mut board = TopListAggregator::new();
        let mut player = profile(3);
        let (miner_id, fisher_id) = (JobId::new("miner"), JobId::new("fisher"));
        let seed = RecordSeed { level: 6, ..RecordSeed::default() };

        player.join(miner(), None, NOW, false, Leveling { curve: &curve, publisher: &mut board, rules: &rules }).unwrap();
        player.leave(&miner_id, NOW).unwrap();
        player.join(fisher(), Some(seed), NOW, false, Leveling { curve: &curve, publisher: &mut board, rules: &rules }).unwrap();

        let err = player
            .change_job(&fisher_id, miner(), NOW + 20_000, false, Leveling { curve: &curve, publisher: &mut board, rules: &rules })
            .unwrap_err();
        assert_eq!(err, JobsError::RejoinCooldown { job: miner_id.clone(), remaining_ms: 40_000 });
        assert!(player.active_record(&fisher_id).is_some(), "refused change leaves state alone");

        player
            .change_job(&fisher_id, miner(), NOW + 60_000, false, Leveling { curve: &curve, publisher: &mut board, rules: &rules })
            .unwrap();
        let record = player.active_record(&miner_id).unwrap();
        assert_eq!(record.level(), 6, "moved progression replaces the left record");
        assert!(player.record(&fisher_id).is_none());
        assert_eq!(board.top(&miner_id, 1)[0].level, 6);
    }

    #[test]
    fn test_mark_saved_clears_every_flag() {
        let rules = LevelingConfig::default();
        let curve = CurveSpec::Constant { value: 100 };
        let mut board = TopListAggregator::new();
        let mut player = profile(3);

        player.join(miner(), None, NOW, false, Leveling { curve: &curve, publisher: &mut board, rules: &rules }).unwrap();
        player.mark_saved();
        assert!(!player.is_dirty());

        player
            .mutate(&JobId::new("miner"), Leveling { curve: &curve, publisher: &mut board, rules: &rules }, |r, ctx| {
                r.add_experience(1.0, ctx)
            })
            .unwrap();
        assert!(player.is_dirty());
    }
}
