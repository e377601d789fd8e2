//! Rejoin cooldown
//!
//! Evaluated at request time only; nothing ticks in the background.

use chrono::Duration;

use super::record::ProgressionRecord;

impl ProgressionRecord {
    /// Remember when the player left. A record that has left stays around
    /// for cooldown tracking until an expiry policy removes it.
    pub fn mark_left(&mut self, now_ms: i64) {
        self.dirty = true;
        self.left_on = now_ms.max(1);
    }

    /// Bring a left record back into play
    pub fn resurrect(&mut self) {
        self.dirty = true;
        self.left_on = 0;
    }

    /// Instant (ms since epoch) after which the job can be rejoined
    pub fn rejoin_available_at(&self) -> Option<i64> {
        if self.left_on == 0 {
            None
        } else {
            Some(self.left_on.saturating_add(self.job.rejoin_cooldown_ms))
        }
    }

    pub fn can_rejoin(&self, now_ms: i64, bypass: bool) -> bool {
        match self.rejoin_available_at() {
            None => true,
            Some(at) => now_ms >= at || bypass,
        }
    }

    /// Time left on the cooldown, `None` if it does not apply or has elapsed
    pub fn rejoin_time_remaining(&self, now_ms: i64) -> Option<Duration> {
        let at = self.rejoin_available_at()?;
        let remaining = at - now_ms;
        (remaining > 0).then(|| Duration::milliseconds(remaining))
    }
}
