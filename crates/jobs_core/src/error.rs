use thiserror::Error;

use crate::job::JobId;
use crate::player::PlayerId;

/// Failure reported by an external collaborator (rank publisher, limit recalculator).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotifyError {
    #[error("Rank publish failed: {0}")]
    Publish(String),

    #[error("Limit recalculation failed: {0}")]
    Limits(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum JobsError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown job: {0}")]
    UnknownJob(JobId),

    #[error("Unknown player: {0}")]
    UnknownPlayer(PlayerId),

    #[error("Player {player} is already in job {job}")]
    AlreadyInJob { player: PlayerId, job: JobId },

    #[error("Player {player} is not in job {job}")]
    NotInJob { player: PlayerId, job: JobId },

    #[error("Job limit reached: {max} simultaneous jobs allowed")]
    JobLimitReached { max: usize },

    #[error("Cannot rejoin {job} yet: {remaining_ms}ms remaining")]
    RejoinCooldown { job: JobId, remaining_ms: i64 },

    #[error("Experience curve misconfigured for {job} at level {level} (threshold {threshold})")]
    CurveMisconfigured { job: JobId, level: u32, threshold: i64 },

    /// The record state was committed, only the notification failed.
    #[error("Progression committed but propagation failed: {source}")]
    Propagation {
        leveled_up: bool,
        #[source]
        source: NotifyError,
    },
}

impl JobsError {
    /// Whether the record was left in its new, committed state.
    pub fn is_committed(&self) -> bool {
        matches!(self, JobsError::Propagation { .. } | JobsError::CurveMisconfigured { .. })
    }
}

pub type Result<T> = std::result::Result<T, JobsError>;

/// Settings loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
