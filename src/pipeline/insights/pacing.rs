//! Spacing between successive model calls of one report run.

use std::time::Duration;

/// Floor for the gap between two model calls.
pub const MIN_CALL_SPACING: Duration = Duration::from_secs(1);

/// Blocks the calling thread until the next model call may start.
pub trait CallPacer: Send + Sync {
    fn pause(&self);
}

/// Sleeps a fixed interval, never less than [`MIN_CALL_SPACING`].
pub struct FixedDelayPacer {
    delay: Duration,
}

impl FixedDelayPacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay: delay.max(MIN_CALL_SPACING),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for FixedDelayPacer {
    fn default() -> Self {
        Self::new(MIN_CALL_SPACING)
    }
}

impl CallPacer for FixedDelayPacer {
    fn pause(&self) {
        std::thread::sleep(self.delay);
    }
}

/// Records pauses without sleeping.
#[cfg(test)]
#[derive(Default)]
pub struct CountingPacer {
    pauses: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl CountingPacer {
    pub fn pauses(&self) -> usize {
        self.pauses.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl CallPacer for CountingPacer {
    fn pause(&self) {
        self.pauses.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}
