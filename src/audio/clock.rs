use std::time::{Duration, Instant};

/// Monotonic output clock that only advances while resumed.
///
/// Mirrors the device-side notion of time: suspending the output freezes the
/// clock, resuming continues from the frozen value, and a reset brings it
/// back to zero in the suspended state.
#[derive(Debug, Clone, Default)]
pub struct StreamClock {
    accumulated: Duration,
    running_since: Option<Instant>,
}

impl StreamClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    pub fn resume(&mut self) {
        self.resume_at(Instant::now());
    }

    pub fn suspend(&mut self) {
        self.suspend_at(Instant::now());
    }

    pub fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
        self.running_since = None;
    }

    /// Elapsed running time in seconds
    pub fn seconds(&self) -> f64 {
        self.elapsed_at(Instant::now()).as_secs_f64()
    }

    pub(crate) fn resume_at(&mut self, now: Instant) {
        if self.running_since.is_none() {
            self.running_since = Some(now);
        }
    }

    pub(crate) fn suspend_at(&mut self, now: Instant) {
        if let Some(since) = self.running_since.take() {
            self.accumulated += now.saturating_duration_since(since);
        }
    }

    pub(crate) fn elapsed_at(&self, now: Instant) -> Duration {
        match self.running_since {
            Some(since) => self.accumulated + now.saturating_duration_since(since),
            None => self.accumulated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_starts_suspended_at_zero() {
        let clock = StreamClock::new();
        assert!(!clock.is_running());
        assert_eq!(clock.seconds(), 0.0);
    }

    #[test]
    fn test_clock_freezes_while_suspended() {
        let base = Instant::now();
        let mut clock = StreamClock::new();

        clock.resume_at(base);
        assert_eq!(clock.elapsed_at(base + Duration::from_millis(1500)), Duration::from_millis(1500));

        clock.suspend_at(base + Duration::from_secs(2));
        assert_eq!(clock.elapsed_at(base + Duration::from_secs(10)), Duration::from_secs(2));

        clock.resume_at(base + Duration::from_secs(10));
        assert_eq!(clock.elapsed_at(base + Duration::from_secs(11)), Duration::from_secs(3));
    }

    #[test]
    fn test_repeated_resume_keeps_original_start() {
        let base = Instant::now();
        let mut clock = StreamClock::new();

        clock.resume_at(base);
        clock.resume_at(base + Duration::from_secs(5));
        assert_eq!(clock.elapsed_at(base + Duration::from_secs(6)), Duration::from_secs(6));
    }

    #[test]
    fn test_reset_returns_to_zero() {
        let base = Instant::now();
        let mut clock = StreamClock::new();

        clock.resume_at(base);
        clock.suspend_at(base + Duration::from_secs(4));
        clock.reset();

        assert!(!clock.is_running());
        assert_eq!(clock.elapsed_at(base + Duration::from_secs(9)), Duration::ZERO);
    }
}
