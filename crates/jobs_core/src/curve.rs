//! Experience curves
//!
//! A curve maps `(job, level, jobs held by the player)` to the experience
//! needed to complete that level. Curves must be pure so the progression
//! record can memoize the threshold of its current level.

use serde::{Deserialize, Serialize};

use crate::job::JobId;

/// Experience threshold provider.
///
/// A result `<= 0` means the level is already capped: the record is
/// immediately eligible for the next level.
pub trait CurveFunction {
    fn max_experience(&self, job: &JobId, level: u32, jobs_held: usize) -> i64;
}

impl<F> CurveFunction for F
where
    F: Fn(&JobId, u32, usize) -> i64,
{
    fn max_experience(&self, job: &JobId, level: u32, jobs_held: usize) -> i64 {
        self(job, level, jobs_held)
    }
}

/// Configurable curve shapes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CurveSpec {
    /// Same threshold at every level
    Constant { value: i64 },
    /// `base + per_level * (level - 1)`
    Linear { base: i64, per_level: i64 },
    /// `base * level^exponent * (1 + per_job * (jobs_held - 1))`
    Polynomial {
        base: f64,
        exponent: f64,
        #[serde(default)]
        per_job: f64,
    },
}

impl Default for CurveSpec {
    fn default() -> Self {
        CurveSpec::Polynomial { base: 100.0, exponent: 1.5, per_job: 0.0 }
    }
}

impl CurveSpec {
    /// Threshold for `level` when the player holds `jobs_held` jobs.
    pub fn evaluate(&self, level: u32, jobs_held: usize) -> i64 {
        match *self {
            CurveSpec::Constant { value } => value,
            CurveSpec::Linear { base, per_level } => {
                base.saturating_add(per_level.saturating_mul(level.saturating_sub(1) as i64))
            }
            CurveSpec::Polynomial { base, exponent, per_job } => {
                let extra_jobs = jobs_held.saturating_sub(1) as f64;
                let value = base * (level as f64).powf(exponent) * (1.0 + per_job * extra_jobs);
                // `as` saturates and maps NaN to 0
                value as i64
            }
        }
    }
}

impl CurveFunction for CurveSpec {
    fn max_experience(&self, _job: &JobId, level: u32, jobs_held: usize) -> i64 {
        self.evaluate(level, jobs_held)
    }
}
