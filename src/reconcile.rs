//! Single-shot reconciliation deadline for unconfirmed Turbo requests.
//!
//! Some firmware accepts the Turbo command but never enters Turbo mode.
//! After requesting Turbo, a deadline is armed. If the device has not reported
//! Turbo when the deadline passes, the codec pushes the real speed back to the
//! controller once.

use core::time::Duration;
use log::trace;
use tokio::time::Instant;

/// Default delay before an unconfirmed Turbo request is corrected.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(1000);

/// A rearmable single-shot deadline.
///
/// At most one deadline is pending. Arming again replaces the pending deadline.
#[derive(Debug)]
pub struct Reconciler {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Reconciler {
    /// Creates an idle reconciler firing `delay` after being armed.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Returns the configured delay.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arms the deadline, replacing any pending one.
    pub fn arm(&mut self) {
        let deadline = Instant::now() + self.delay;

        if self.deadline.replace(deadline).is_some() {
            trace!("Rearmed pending reconciliation");
        }
    }

    /// Cancels the pending deadline.
    ///
    /// Returns `true` if a deadline was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Returns the pending deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns `true` if a deadline is pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Clears the pending deadline as it fires.
    ///
    /// Returns `false` if nothing was pending, in which case the firing
    /// must not have any effect.
    pub fn fire(&mut self) -> bool {
        self.deadline.take().is_some()
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn arm_sets_deadline() {
        let mut rec = Reconciler::new(Duration::from_millis(250));
        let start = Instant::now();

        assert!(!rec.is_pending(), "new reconciler should be idle");

        rec.arm();

        assert_eq!(
            rec.deadline(),
            Some(start + Duration::from_millis(250)),
            "deadline should be one delay away"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_replaces_deadline() {
        let mut rec = Reconciler::default();

        rec.arm();
        let first = rec.deadline();

        tokio::time::advance(Duration::from_millis(400)).await;
        rec.arm();

        assert!(rec.deadline() > first, "rearm should push deadline out");
        assert!(rec.fire(), "pending deadline should fire");
        assert!(!rec.fire(), "deadline should fire only once");
    }

    #[test]
    fn cancel_clears_deadline() {
        let mut rec = Reconciler::default();

        assert!(!rec.cancel(), "nothing should be cancelled when idle");

        rec.arm();

        assert!(rec.cancel(), "pending deadline should be cancelled");
        assert!(!rec.is_pending(), "reconciler should be idle");
        assert!(!rec.fire(), "cancelled deadline should not fire");
    }
}
