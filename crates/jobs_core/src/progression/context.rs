//! Collaborator seams consumed by the state machine.

use crate::config::LevelingConfig;
use crate::curve::CurveFunction;
use crate::error::NotifyError;
use crate::job::Job;
use crate::player::PlayerId;
use crate::ranking::RankPublisher;

/// Recomputes player-wide caps after a level change.
pub trait LimitRecalculator {
    fn reload_limits(&mut self, player: &PlayerId, job: &Job, level: u32)
        -> Result<(), NotifyError>;

    /// Highest level this player may reach in `job`. Only consulted when the
    /// job itself defines a maximum level.
    fn max_level_allowed(&self, job: &Job) -> u32;
}

/// Capability checks owned by the host's permission system.
pub trait Authorization {
    fn can_bypass_rejoin(&self, player: &PlayerId, job: &Job) -> bool;

    fn is_vip(&self, _player: &PlayerId) -> bool {
        false
    }
}

/// Grants nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl Authorization for DenyAll {
    fn can_bypass_rejoin(&self, _player: &PlayerId, _job: &Job) -> bool {
        false
    }
}

/// Wall clock in milliseconds since epoch
pub trait Clock {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock pinned to a given instant, for tests and replays
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0
    }
}

/// Everything a record mutation needs besides the record itself.
pub struct ProgressionContext<'a> {
    pub curve: &'a dyn CurveFunction,
    pub limits: &'a mut dyn LimitRecalculator,
    pub publisher: &'a mut dyn RankPublisher,
    pub rules: &'a LevelingConfig,
    /// Active jobs held by the owning player
    pub jobs_held: usize,
}

impl<'a> ProgressionContext<'a> {
    pub fn new(
        curve: &'a dyn CurveFunction,
        limits: &'a mut dyn LimitRecalculator,
        publisher: &'a mut dyn RankPublisher,
        rules: &'a LevelingConfig,
        jobs_held: usize,
    ) -> Self {
        Self { curve, limits, publisher, rules, jobs_held }
    }
}
