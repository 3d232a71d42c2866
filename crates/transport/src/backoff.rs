// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Jittered exponential backoff for reconnect, behind a single RNG
//! capability so tests can inject a deterministic double instead of every
//! subsystem reaching for its own `rand::thread_rng()`.

use rand::Rng;
use std::time::Duration;

const INITIAL: Duration = Duration::from_secs(1);
const MAX: Duration = Duration::from_secs(60);
const JITTER_FRACTION: f64 = 0.3;

/// Supplies the uniform jitter sample `[-1.0, 1.0)` a backoff step needs.
/// Abstracted so reconnect tests can pin the jitter instead of retrying
/// flaky assertions against real randomness.
pub trait BackoffRng: Send + Sync {
    fn sample(&self) -> f64;
}

/// Default RNG backed by the thread-local generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngBackoff;

impl BackoffRng for ThreadRngBackoff {
    fn sample(&self) -> f64 {
        rand::thread_rng().gen_range(-1.0..1.0)
    }
}

/// Reconnect backoff state: doubles on every failure up to a 60s cap, resets
/// to 1s on a successful connect.
pub struct Backoff {
    current: Duration,
}

impl Backoff {
    pub fn new() -> Self {
        Self { current: INITIAL }
    }

    pub fn reset(&mut self) {
        self.current = INITIAL;
    }

    /// Returns the jittered sleep duration for the current failure streak,
    /// then doubles (capped at 60s) for the next call.
    pub fn next_delay(&mut self, rng: &dyn BackoffRng) -> Duration {
        let base = self.current;
        self.current = (self.current * 2).min(MAX);

        let jitter = base.as_secs_f64() * JITTER_FRACTION * rng.sample();
        let jittered = base.as_secs_f64() + jitter;
        Duration::from_secs_f64(jittered.max(0.0))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub struct FixedRng(pub f64);

#[cfg(test)]
impl BackoffRng for FixedRng {
    fn sample(&self) -> f64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_delay_is_one_second_with_zero_jitter() {
        let mut backoff = Backoff::new();
        let delay = backoff.next_delay(&FixedRng(0.0));
        assert_eq!(delay, Duration::from_secs(1));
    }

    #[test]
    fn delay_doubles_on_successive_failures() {
        let mut backoff = Backoff::new();
        let rng = FixedRng(0.0);
        assert_eq!(backoff.next_delay(&rng), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(&rng), Duration::from_secs(2));
        assert_eq!(backoff.next_delay(&rng), Duration::from_secs(4));
    }

    #[test]
    fn delay_is_capped_at_sixty_seconds() {
        let mut backoff = Backoff::new();
        let rng = FixedRng(0.0);
        for _ in 0..20 {
            backoff.next_delay(&rng);
        }
        let capped = backoff.next_delay(&rng);
        assert_eq!(capped, Duration::from_secs(60));
    }

    #[test]
    fn positive_jitter_extends_the_base_delay() {
        let mut backoff = Backoff::new();
        let delay = backoff.next_delay(&FixedRng(1.0));
        assert_eq!(delay, Duration::from_millis(1300));
    }

    #[test]
    fn negative_jitter_never_goes_below_zero() {
        let mut backoff = Backoff::new();
        let delay = backoff.next_delay(&FixedRng(-1.0));
        assert!(delay >= Duration::ZERO);
    }

    #[test]
    fn reset_returns_to_the_initial_delay() {
        let mut backoff = Backoff::new();
        let rng = FixedRng(0.0);
        backoff.next_delay(&rng);
        backoff.next_delay(&rng);
        backoff.reset();
        assert_eq!(backoff.next_delay(&rng), Duration::from_secs(1));
    }
}
