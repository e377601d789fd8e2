//! Job definitions and the registry the host loads them into.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::curve::{CurveFunction, CurveSpec};
use crate::error::{JobsError, Result};

/// Case-insensitive job identifier (stored lowercase)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<JobId> for String {
    fn from(value: JobId) -> Self {
        value.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A player-selectable role with its own curve and level cap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    /// Absolute level cap; `None` means uncapped
    #[serde(default)]
    pub max_level: Option<u32>,
    /// Cap granted to VIP players, never below `max_level`
    #[serde(default)]
    pub vip_max_level: Option<u32>,
    /// Minimum wait after leaving before the job can be rejoined
    #[serde(default)]
    pub rejoin_cooldown_ms: i64,
    #[serde(default)]
    pub curve: CurveSpec,
}

impl Job {
    pub fn new(id: impl AsRef<str>, name: impl Into<String>) -> Self {
        Self {
            id: JobId::new(id),
            name: name.into(),
            max_level: None,
            vip_max_level: None,
            rejoin_cooldown_ms: 0,
            curve: CurveSpec::default(),
        }
    }

    pub fn with_max_level(mut self, max_level: u32) -> Self {
        self.max_level = Some(max_level);
        self
    }

    pub fn with_vip_max_level(mut self, vip_max_level: u32) -> Self {
        self.vip_max_level = Some(vip_max_level);
        self
    }

    pub fn with_rejoin_cooldown_ms(mut self, cooldown_ms: i64) -> Self {
        self.rejoin_cooldown_ms = cooldown_ms;
        self
    }

    pub fn with_curve(mut self, curve: CurveSpec) -> Self {
        self.curve = curve;
        self
    }

    /// Either cap is set. A job with only `vip_max_level` caps everyone at it.
    pub fn has_max_level(&self) -> bool {
        self.absolute_max_level().is_some()
    }

    /// Level cap for a player, taking VIP status into account
    pub fn max_level_for(&self, vip: bool) -> Option<u32> {
        if vip {
            self.vip_max_level.or(self.max_level)
        } else {
            self.max_level.or(self.vip_max_level)
        }
    }

    /// Absolute upper bound any player can reach in this job
    pub fn absolute_max_level(&self) -> Option<u32> {
        match (self.max_level, self.vip_max_level) {
            (Some(max), Some(vip)) => Some(max.max(vip)),
            (max, vip) => max.or(vip),
        }
    }
}

/// Loaded job definitions, shared by every record through `Arc<Job>`.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: HashMap<JobId, Arc<Job>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_jobs(jobs: impl IntoIterator<Item = Job>) -> Result<Self> {
        let mut registry = Self::new();
        for job in jobs {
            registry.register(job)?;
        }
        Ok(registry)
    }

    /// Register a job definition; ids must be unique
    pub fn register(&mut self, job: Job) -> Result<Arc<Job>> {
        if job.id.as_str().is_empty() {
            return Err(JobsError::InvalidArgument("job id must not be empty".to_string()));
        }
        if self.jobs.contains_key(&job.id) {
            return Err(JobsError::InvalidArgument(format!("duplicate job id: {}", job.id)));
        }
        let job = Arc::new(job);
        self.jobs.insert(job.id.clone(), Arc::clone(&job));
        Ok(job)
    }

    pub fn get(&self, id: &JobId) -> Option<&Arc<Job>> {
        self.jobs.get(id)
    }

    /// Lookup that fails with `UnknownJob`
    pub fn require(&self, id: &JobId) -> Result<Arc<Job>> {
        self.jobs.get(id).cloned().ok_or_else(|| JobsError::UnknownJob(id.clone()))
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Job>> {
        self.jobs.values()
    }
}

impl CurveFunction for JobRegistry {
    fn max_experience(&self, job: &JobId, level: u32, jobs_held: usize) -> i64 {
        match self.jobs.get(job) {
            Some(def) => def.curve.evaluate(level, jobs_held),
            None => {
                log::warn!("No curve registered for job {}", job);
                0
            }
        }
    }
}
