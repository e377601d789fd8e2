//! # Jobs Configuration
//!
//! Settings document for the progression core, loaded from YAML.
//!
//! ## Presets
//! - `JobsConfig::default()`: delevel off, three jobs
//! - `JobsConfig::casual()`: delevel off, more jobs, bonus slots from levels
//! - `JobsConfig::hardcore()`: delevel on, two jobs
//!
//! ```rust
//! use jobs_core::config::JobsConfig;
//!
//! let config = JobsConfig::from_yaml_str("leveling:\n  allow_delevel: true\n").unwrap();
//! assert!(config.leveling.allow_delevel);
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::job::Job;

/// State-machine rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelingConfig {
    /// Negative experience may cost levels
    pub allow_delevel: bool,
    /// Upper bound on level-ups over a zero or negative threshold in a
    /// single resolution of an uncapped job
    pub max_resolution_steps: u32,
}

impl Default for LevelingConfig {
    fn default() -> Self {
        Self { allow_delevel: false, max_resolution_steps: 10_000 }
    }
}

/// Player-wide job slot limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub base_max_jobs: usize,
    /// One extra job slot per this many total levels; 0 disables the bonus
    pub levels_per_bonus_job: u32,
    pub max_jobs_cap: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self { base_max_jobs: 3, levels_per_bonus_job: 0, max_jobs_cap: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    pub leveling: LevelingConfig,
    pub limits: LimitsConfig,
    /// Delay before a changed leaderboard is handed to the renderer
    pub board_refresh_delay_ms: i64,
    pub jobs: Vec<Job>,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            leveling: LevelingConfig::default(),
            limits: LimitsConfig::default(),
            board_refresh_delay_ms: 1_000,
            jobs: Vec::new(),
        }
    }
}

impl JobsConfig {
    pub fn casual() -> Self {
        let mut cfg = Self::default();
        cfg.limits.base_max_jobs = 5;
        cfg.limits.levels_per_bonus_job = 50;
        cfg
    }

    pub fn hardcore() -> Self {
        let mut cfg = Self::default();
        cfg.leveling.allow_delevel = true;
        cfg.limits.base_max_jobs = 2;
        cfg.limits.max_jobs_cap = 2;
        cfg
    }

    pub fn with_jobs(mut self, jobs: impl IntoIterator<Item = Job>) -> Self {
        self.jobs.extend(jobs);
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&yaml)?;
        log::info!("Loaded {} job definitions from {}", config.jobs.len(), path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.leveling.max_resolution_steps == 0 {
            return Err(ConfigError::Invalid("leveling.max_resolution_steps must be at least 1".into()));
        }
        if self.limits.max_jobs_cap < self.limits.base_max_jobs {
            return Err(ConfigError::Invalid(format!(
                "limits.max_jobs_cap ({}) is below limits.base_max_jobs ({})",
                self.limits.max_jobs_cap, self.limits.base_max_jobs
            )));
        }

        let mut seen = HashSet::new();
        for job in &self.jobs {
            if job.id.as_str().is_empty() {
                return Err(ConfigError::Invalid("job id must not be empty".into()));
            }
            if !seen.insert(job.id.clone()) {
                return Err(ConfigError::Invalid(format!("duplicate job id: {}", job.id)));
            }
            if job.max_level == Some(0) || job.vip_max_level == Some(0) {
                return Err(ConfigError::Invalid(format!("{}: max levels must be at least 1", job.id)));
            }
            if let (Some(max), Some(vip)) = (job.max_level, job.vip_max_level) {
                if vip < max {
                    return Err(ConfigError::Invalid(format!(
                        "{}: vip_max_level ({}) is below max_level ({})",
                        job.id, vip, max
                    )));
                }
            }
            if job.rejoin_cooldown_ms < 0 {
                return Err(ConfigError::Invalid(format!("{}: negative rejoin cooldown", job.id)));
            }
        }
        Ok(())
    }
}
