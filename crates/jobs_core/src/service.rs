//! Host-facing facade
//!
//! Owns the job registry, every player profile, the leaderboard aggregator
//! and its refresh queue. All calls are expected on the host's single
//! mutation context; nothing here locks.

use std::collections::HashMap;

use chrono::Duration;
use tracing::{debug, info, warn};

use crate::config::JobsConfig;
use crate::error::{JobsError, Result};
use crate::job::{JobId, JobRegistry};
use crate::player::{Leveling, PlayerId, PlayerLimits, PlayerProfile};
use crate::progression::{
    Authorization, Clock, DenyAll, ProgressionContext, ProgressionRecord, RecordSeed, SystemClock,
};
use crate::ranking::{BoardTarget, RefreshQueue, TopEntry, TopListAggregator};

pub struct JobsService<A = DenyAll, C = SystemClock> {
    config: JobsConfig,
    registry: JobRegistry,
    players: HashMap<PlayerId, PlayerProfile>,
    board: TopListAggregator,
    refresh: RefreshQueue<BoardTarget>,
    auth: A,
    clock: C,
}

impl JobsService<DenyAll, SystemClock> {
    pub fn from_config(config: JobsConfig) -> Result<Self> {
        Self::new(config, DenyAll, SystemClock)
    }
}

impl<A, C> JobsService<A, C>
where
    A: Authorization,
    C: Clock,
{
    pub fn new(config: JobsConfig, auth: A, clock: C) -> Result<Self> {
        config.validate().map_err(|e| JobsError::InvalidArgument(e.to_string()))?;
        let registry = JobRegistry::from_jobs(config.jobs.iter().cloned())?;
        let refresh = RefreshQueue::new(config.board_refresh_delay_ms);
        info!(jobs = registry.len(), "Jobs service started");

        Ok(Self {
            config,
            registry,
            players: HashMap::new(),
            board: TopListAggregator::new(),
            refresh,
            auth,
            clock,
        })
    }

    pub fn config(&self) -> &JobsConfig {
        &self.config
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    // ========================
    // Players
    // ========================

    pub fn register_player(&mut self, id: PlayerId, name: impl Into<String>) -> Result<&PlayerProfile> {
        if self.players.contains_key(&id) {
            return Err(JobsError::InvalidArgument(format!("player {} already registered", id)));
        }
        let limits = PlayerLimits::new(self.config.limits.clone(), self.auth.is_vip(&id));
        let profile = PlayerProfile::new(id.clone(), name, limits);
        debug!(player = %id, "Player registered");
        Ok(self.players.entry(id).or_insert(profile))
    }

    /// Drop a profile and its standings (e.g. on logout after a save)
    pub fn unregister_player(&mut self, id: &PlayerId) -> Option<PlayerProfile> {
        let profile = self.players.remove(id)?;
        for record in profile.records() {
            self.board.forget(&record.job().id, id);
        }
        self.schedule_refreshes();
        Some(profile)
    }

    pub fn player(&self, id: &PlayerId) -> Option<&PlayerProfile> {
        self.players.get(id)
    }

    pub fn record(&self, player: &PlayerId, job: &JobId) -> Option<&ProgressionRecord> {
        self.players.get(player)?.record(job)
    }

    /// Players with unsaved changes
    pub fn dirty_players(&self) -> Vec<PlayerId> {
        self.players.values().filter(|p| p.is_dirty()).map(|p| p.id().clone()).collect()
    }

    pub fn mark_saved(&mut self, player: &PlayerId) -> Result<()> {
        self.profile_mut(player)?.mark_saved();
        Ok(())
    }

    fn profile_mut(&mut self, player: &PlayerId) -> Result<&mut PlayerProfile> {
        self.players.get_mut(player).ok_or_else(|| JobsError::UnknownPlayer(player.clone()))
    }

    // ========================
    // Membership
    // ========================

    pub fn join_job(&mut self, player: &PlayerId, job: &JobId, seed: Option<RecordSeed>) -> Result<bool> {
        let definition = self.registry.require(job)?;
        let bypass = self.auth.can_bypass_rejoin(player, &definition);
        let now = self.clock.now_millis();

        let profile = self.players.get_mut(player).ok_or_else(|| JobsError::UnknownPlayer(player.clone()))?;
        let leveling = Leveling {
            curve: &self.registry,
            publisher: &mut self.board,
            rules: &self.config.leveling,
        };
        let result = profile.join(definition, seed, now, bypass, leveling);
        match &result {
            Ok(_) => info!(player = %player, job = %job, "Joined job"),
            Err(err) if err.is_committed() => warn!(player = %player, job = %job, %err, "Joined job with errors"),
            Err(err) => debug!(player = %player, job = %job, %err, "Join refused"),
        }
        self.schedule_refreshes();
        result
    }

    pub fn leave_job(&mut self, player: &PlayerId, job: &JobId) -> Result<()> {
        let now = self.clock.now_millis();
        self.profile_mut(player)?.leave(job, now)?;
        self.board.forget(job, player);
        self.schedule_refreshes();
        info!(player = %player, job = %job, "Left job");
        Ok(())
    }

    pub fn change_job(&mut self, player: &PlayerId, from: &JobId, to: &JobId) -> Result<bool> {
        let definition = self.registry.require(to)?;
        let bypass = self.auth.can_bypass_rejoin(player, &definition);
        let now = self.clock.now_millis();

        let profile = self.players.get_mut(player).ok_or_else(|| JobsError::UnknownPlayer(player.clone()))?;
        let leveling = Leveling {
            curve: &self.registry,
            publisher: &mut self.board,
            rules: &self.config.leveling,
        };
        let result = profile.change_job(from, definition, now, bypass, leveling);
        if result.is_ok() || result.as_ref().is_err_and(JobsError::is_committed) {
            if from != to {
                self.board.forget(from, player);
            }
            info!(player = %player, from = %from, to = %to, "Changed job");
        }
        self.schedule_refreshes();
        result
    }

    /// Delete a record outright (external expiry policy) and its standing
    pub fn remove_record(&mut self, player: &PlayerId, job: &JobId) -> Result<Option<ProgressionRecord>> {
        let removed = self.profile_mut(player)?.remove_record(job);
        if removed.is_some() {
            self.board.forget(job, player);
            self.schedule_refreshes();
            info!(player = %player, job = %job, "Removed job record");
        }
        Ok(removed)
    }

    pub fn can_rejoin(&self, player: &PlayerId, job: &JobId) -> Result<bool> {
        let definition = self.registry.require(job)?;
        let profile = self.players.get(player).ok_or_else(|| JobsError::UnknownPlayer(player.clone()))?;
        let now = self.clock.now_millis();
        Ok(match profile.record(job) {
            None => true,
            Some(record) => {
                record.can_rejoin(now, false) || self.auth.can_bypass_rejoin(player, &definition)
            }
        })
    }

    pub fn rejoin_time_remaining(&self, player: &PlayerId, job: &JobId) -> Result<Option<Duration>> {
        let profile = self.players.get(player).ok_or_else(|| JobsError::UnknownPlayer(player.clone()))?;
        Ok(profile.record(job).and_then(|r| r.rejoin_time_remaining(self.clock.now_millis())))
    }

    // ========================
    // Progression
    // ========================

    pub fn add_experience(&mut self, player: &PlayerId, job: &JobId, delta: f64) -> Result<bool> {
        self.mutate(player, job, |record, ctx| record.add_experience(delta, ctx))
    }

    pub fn take_experience(&mut self, player: &PlayerId, job: &JobId, amount: f64) -> Result<bool> {
        self.mutate(player, job, |record, ctx| record.take_experience(amount, ctx))
    }

    pub fn set_experience(&mut self, player: &PlayerId, job: &JobId, value: f64) -> Result<bool> {
        self.mutate(player, job, |record, ctx| record.set_experience(value, ctx))
    }

    pub fn set_level(&mut self, player: &PlayerId, job: &JobId, level: u32) -> Result<bool> {
        self.mutate(player, job, |record, ctx| record.set_level(level, ctx))
    }

    fn mutate<F>(&mut self, player: &PlayerId, job: &JobId, op: F) -> Result<bool>
    where
        F: FnOnce(&mut ProgressionRecord, &mut ProgressionContext<'_>) -> Result<bool>,
    {
        let profile = self.players.get_mut(player).ok_or_else(|| JobsError::UnknownPlayer(player.clone()))?;
        let leveling = Leveling {
            curve: &self.registry,
            publisher: &mut self.board,
            rules: &self.config.leveling,
        };
        let result = profile.mutate(job, leveling, op);
        if let Err(err) = &result {
            if err.is_committed() {
                warn!(player = %player, job = %job, %err, "Progression committed with errors");
            }
        }
        self.schedule_refreshes();
        result
    }

    // ========================
    // Leaderboards
    // ========================

    pub fn top(&self, job: &JobId, limit: usize) -> Vec<TopEntry> {
        self.board.top(job, limit)
    }

    pub fn global_top(&self, limit: usize) -> Vec<TopEntry> {
        self.board.global_top(limit)
    }

    pub fn rank_of(&self, job: &JobId, player: &PlayerId) -> Option<usize> {
        self.board.rank_of(job, player)
    }

    pub fn global_rank_of(&self, player: &PlayerId) -> Option<usize> {
        self.board.global_rank_of(player)
    }

    pub fn board(&self) -> &TopListAggregator {
        &self.board
    }

    fn schedule_refreshes(&mut self) {
        let now = self.clock.now_millis();
        for target in self.board.take_changed() {
            self.refresh.schedule(target, now);
        }
    }

    /// Boards whose refresh delay has elapsed, for the external renderer
    pub fn due_board_refreshes(&mut self) -> Vec<BoardTarget> {
        self.refresh.drain_due(self.clock.now_millis())
    }
}
