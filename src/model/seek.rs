//! Seek arbitration between the device clock, user scrubbing and programmatic seeks
//!
//! Device time updates only reach `elapsed_seconds` when nobody else owns the
//! position: not while the user drags the scrub control, not inside the window
//! that follows a programmatic seek, and not for changes below the throttle
//! threshold.

use std::time::{Duration, Instant};

/// Outcome of a device time update
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeUpdateDecision {
    Accept,
    UserSeeking,
    ExternallySeeking,
    BelowThreshold,
}

#[derive(Clone, Debug)]
pub struct SeekArbiter {
    debounce: Duration,
    threshold_secs: f64,
    user_seeking: bool,
    /// End of the window opened by the latest programmatic seek. A newer seek
    /// replaces it, so an older seek can never cut a newer window short.
    external_until: Option<Instant>,
}

impl SeekArbiter {
    pub fn new(debounce: Duration, threshold_secs: f64) -> Self {
        Self {
            debounce,
            threshold_secs,
            user_seeking: false,
            external_until: None,
        }
    }

    pub fn is_user_seeking(&self) -> bool {
        self.user_seeking
    }

    pub fn begin_user_seek(&mut self) {
        self.user_seeking = true;
    }

    pub fn end_user_seek(&mut self) {
        self.user_seeking = false;
    }

    /// Open the suppression window for a programmatic seek made at `now`.
    pub fn begin_external_seek(&mut self, now: Instant) {
        self.external_until = Some(now + self.debounce);
    }

    pub fn is_externally_seeking(&self, now: Instant) -> bool {
        self.external_until.is_some_and(|until| now < until)
    }

    pub fn judge(&self, reported: f64, elapsed: f64, now: Instant) -> TimeUpdateDecision {
        if self.user_seeking {
            TimeUpdateDecision::UserSeeking
        } else if self.is_externally_seeking(now) {
            TimeUpdateDecision::ExternallySeeking
        } else if (reported - elapsed).abs() <= self.threshold_secs {
            TimeUpdateDecision::BelowThreshold
        } else {
            TimeUpdateDecision::Accept
        }
    }

    /// Forget all in-flight seeks (source changed or player closed)
    pub fn reset(&mut self) {
        self.user_seeking = false;
        self.external_until = None;
    }
}
