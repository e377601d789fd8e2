//! # jobs_core - Job Progression Engine
//!
//! Tracks per-player, per-job leveling for a multiplayer game server:
//! experience accrual, level-up / level-down resolution against a
//! configurable curve, per-player level caps, leave / rejoin cooldowns and
//! leaderboard aggregation.
//!
//! ## Features
//! - Deterministic leveling state machine with cascading level changes
//! - Pluggable experience curves (closures or YAML-configured specs)
//! - Incremental per-job and global top lists with debounced refreshes
//! - YAML configuration with `default`, `casual` and `hardcore` presets

// Config presets start from `Default` and override a few fields
#![allow(clippy::field_reassign_with_default)]

pub mod config;
pub mod curve;
pub mod error;
pub mod job;
pub mod player;
pub mod progression;
pub mod ranking;
pub mod service;

pub use config::{JobsConfig, LevelingConfig, LimitsConfig};
pub use curve::{CurveFunction, CurveSpec};
pub use error::{ConfigError, JobsError, NotifyError, Result};
pub use job::{Job, JobId, JobRegistry};
pub use player::{PlayerId, PlayerLimits, PlayerProfile};
pub use progression::{
    Authorization, Clock, DenyAll, FixedClock, LimitRecalculator, ProgressionContext,
    ProgressionRecord, RecordSeed, SystemClock,
};
pub use ranking::{
    BoardTarget, NullPublisher, RankPublisher, RankSnapshot, RefreshQueue, TopEntry,
    TopListAggregator,
};
pub use service::JobsService;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
