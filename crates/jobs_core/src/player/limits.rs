use std::collections::HashMap;

use super::PlayerId;
use crate::config::LimitsConfig;
use crate::error::NotifyError;
use crate::job::{Job, JobId};
use crate::progression::LimitRecalculator;

/// Player-wide caps derived from the levels reached so far.
#[derive(Debug, Clone)]
pub struct PlayerLimits {
    config: LimitsConfig,
    vip: bool,
    /// Current level per active job, kept in step by `reload_limits`
    levels: HashMap<JobId, u32>,
    max_jobs: usize,
}

impl PlayerLimits {
    pub fn new(config: LimitsConfig, vip: bool) -> Self {
        let mut limits = Self { config, vip, levels: HashMap::new(), max_jobs: 0 };
        limits.recompute();
        limits
    }

    pub fn is_vip(&self) -> bool {
        self.vip
    }

    pub fn set_vip(&mut self, vip: bool) {
        self.vip = vip;
    }

    /// Simultaneous jobs this player may hold
    pub fn max_jobs(&self) -> usize {
        self.max_jobs
    }

    pub fn total_levels(&self) -> u64 {
        self.levels.values().map(|&level| level as u64).sum()
    }

    pub(crate) fn track(&mut self, job: &JobId, level: u32) {
        self.levels.insert(job.clone(), level);
        self.recompute();
    }

    pub(crate) fn untrack(&mut self, job: &JobId) {
        self.levels.remove(job);
        self.recompute();
    }

    fn recompute(&mut self) {
        let bonus = match self.config.levels_per_bonus_job {
            0 => 0,
            per => (self.total_levels() / per as u64) as usize,
        };
        self.max_jobs = self.config.base_max_jobs.saturating_add(bonus).min(self.config.max_jobs_cap);
    }
}

impl LimitRecalculator for PlayerLimits {
    fn reload_limits(&mut self, _player: &PlayerId, job: &Job, level: u32) -> Result<(), NotifyError> {
        self.track(&job.id, level);
        Ok(())
    }

    fn max_level_allowed(&self, job: &Job) -> u32 {
        job.max_level_for(self.vip).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LimitsConfig {
        LimitsConfig { base_max_jobs: 2, levels_per_bonus_job: 20, max_jobs_cap: 4 }
    }

    #[test]
    fn test_bonus_jobs_from_levels() {
        let mut limits = PlayerLimits::new(config(), false);
        assert_eq!(limits.max_jobs(), 2);

        let job = Job::new("miner", "Miner");
        limits.reload_limits(&PlayerId::new_v4(), &job, 25).unwrap();
        assert_eq!(limits.max_jobs(), 3);

        limits.track(&JobId::new("fisher"), 200);
        assert_eq!(limits.max_jobs(), 4, "capped by max_jobs_cap");

        limits.untrack(&JobId::new("fisher"));
        assert_eq!(limits.max_jobs(), 3);
    }

    #[test]
    fn test_vip_allowed_level() {
        let job = Job::new("miner", "Miner").with_max_level(50).with_vip_max_level(70);
        let mut limits = PlayerLimits::new(config(), false);
        assert_eq!(limits.max_level_allowed(&job), 50);

        limits.set_vip(true);
        assert_eq!(limits.max_level_allowed(&job), 70);
        assert_eq!(limits.max_level_allowed(&Job::new("fisher", "Fisher")), u32::MAX);
    }
}
