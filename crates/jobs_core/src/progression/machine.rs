//! Leveling resolution
//!
//! Runs after every mutation of a [`ProgressionRecord`]:
//! 1. level 1 with negative experience floors to zero
//! 2. negative experience walks levels down (only if delevel is enabled)
//! 3. otherwise experience at or above the threshold walks levels up until
//!    the player's allowed cap
//! 4. experience is clamped to the threshold of the final level
//! 5. one rank snapshot is published, even if nothing changed

use super::context::ProgressionContext;
use super::record::ProgressionRecord;
use crate::error::{JobsError, NotifyError, Result};

impl ProgressionRecord {
    pub(super) fn resolve(&mut self, ctx: &mut ProgressionContext<'_>) -> Result<bool> {
        let mut notify_failure: Option<NotifyError> = None;

        let outcome = if self.level <= 1 && self.experience < 0.0 {
            self.experience = 0.0;
            Ok(false)
        } else if self.experience < 0.0 {
            self.level_down(ctx, &mut notify_failure);
            Ok(false)
        } else {
            self.level_up(ctx, &mut notify_failure)
        };

        let cap = self.threshold(ctx).max(0) as f64;
        if self.experience > cap {
            self.experience = cap;
        }

        self.revision += 1;
        if let Err(err) = ctx.publisher.publish(&self.snapshot()) {
            log::warn!("Rank publish failed for {} in {}: {}", self.player, self.job.id, err);
            notify_failure.get_or_insert(err);
        }

        match (outcome, notify_failure) {
            (Err(err), _) => Err(err),
            (Ok(leveled_up), Some(source)) => Err(JobsError::Propagation { leveled_up, source }),
            (Ok(leveled_up), None) => Ok(leveled_up),
        }
    }

    fn level_down(&mut self, ctx: &mut ProgressionContext<'_>, failure: &mut Option<NotifyError>) {
        while self.experience < 0.0 {
            if self.level <= 1 || !ctx.rules.allow_delevel {
                self.experience = 0.0;
                break;
            }

            self.level -= 1;
            self.max_experience.invalidate();
            self.experience += self.threshold(ctx) as f64;

            log::debug!("{} dropped to level {} in {}", self.player, self.level, self.job.id);
            self.reload_limits(ctx, failure);
        }
    }

    fn level_up(
        &mut self,
        ctx: &mut ProgressionContext<'_>,
        failure: &mut Option<NotifyError>,
    ) -> Result<bool> {
        let mut leveled_up = false;
        let mut free_steps: u32 = 0;
        let mut previous: Option<(f64, i64)> = None;
        let capped = self.job.has_max_level();

        loop {
            let threshold = self.threshold(ctx);
            if self.experience < threshold as f64 {
                break;
            }
            if self.level == u32::MAX || (capped && self.level >= ctx.limits.max_level_allowed(&self.job)) {
                break;
            }

            // Without a cap, a step must consume experience or move the
            // threshold. Steps that consume nothing are also budgeted.
            if !capped {
                let stalled = matches!(previous, Some((exp, prev)) if self.experience >= exp && threshold == prev);
                if threshold <= 0 {
                    free_steps += 1;
                }
                if stalled || free_steps > ctx.rules.max_resolution_steps {
                    log::warn!(
                        "Experience curve for {} stopped progressing at level {} (threshold {})",
                        self.job.id,
                        self.level,
                        threshold
                    );
                    return Err(JobsError::CurveMisconfigured {
                        job: self.job.id.clone(),
                        level: self.level,
                        threshold,
                    });
                }
            }

            previous = Some((self.experience, threshold));
            self.level += 1;
            self.experience -= threshold as f64;
            self.max_experience.invalidate();
            self.threshold(ctx);
            leveled_up = true;

            log::debug!("{} reached level {} in {}", self.player, self.level, self.job.id);
            self.reload_limits(ctx, failure);
        }

        Ok(leveled_up)
    }

    fn reload_limits(&self, ctx: &mut ProgressionContext<'_>, failure: &mut Option<NotifyError>) {
        if let Err(err) = ctx.limits.reload_limits(&self.player, &self.job, self.level) {
            log::warn!("Limit reload failed for {}: {}", self.player, err);
            failure.get_or_insert(err);
        }
    }
}
