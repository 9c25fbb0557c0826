//! Microsecond timer sources.
//!
//! The hooks only ever see a wrapping `u32` microsecond count, matching the
//! free-running hardware timer they were designed around.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Monotonic microsecond clock, wrapping at `u32::MAX`.
pub trait MicrosecondClock {
    fn now_us(&self) -> u32;
}

/// Clock backed by [`Instant`], counting from its construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MicrosecondClock for MonotonicClock {
    fn now_us(&self) -> u32 {
        // truncation gives the same wrap behaviour as the hardware timer
        self.origin.elapsed().as_micros() as u32
    }
}

/// Manually driven clock. Clones share the same counter, so a test can keep
/// one handle while the hooks own another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU32>,
}

impl ManualClock {
    pub fn new(start_us: u32) -> Self {
        Self {
            now: Arc::new(AtomicU32::new(start_us)),
        }
    }

    pub fn set(&self, now_us: u32) {
        self.now.store(now_us, Ordering::Relaxed);
    }

    pub fn advance(&self, delta_us: u32) {
        // fetch_add wraps on overflow
        self.now.fetch_add(delta_us, Ordering::Relaxed);
    }
}

impl MicrosecondClock for ManualClock {
    fn now_us(&self) -> u32 {
        self.now.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new(10);
        let handle = clock.clone();
        handle.advance(5);
        assert_eq!(clock.now_us(), 15);
        handle.set(u32::MAX);
        handle.advance(2);
        assert_eq!(clock.now_us(), 1);
    }

    #[test]
    fn test_monotonic_clock_does_not_go_backwards() {
        let clock = MonotonicClock::new();
        let a = clock.now_us();
        let b = clock.now_us();
        assert!(b >= a);
    }
}
