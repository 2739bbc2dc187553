use std::time::{Duration, Instant};

/// Quiet period after the last resize before a re-render.
pub const RESIZE_QUIESCENCE: Duration = Duration::from_millis(200);

/// Collapses a burst of updates into the last one.
///
/// The clock is passed in, so callers decide what "now" means.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self { window, pending: None }
    }

    /// Record an update, replacing any pending one and restarting the window.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    /// Release the pending value once the window has elapsed since the last push.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, at)) if now.saturating_duration_since(*at) >= self.window => {
                self.pending.take().map(|(value, _)| value)
            }
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop any pending value.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(RESIZE_QUIESCENCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_collapses_to_last() {
        let start = Instant::now();
        let mut d = Debouncer::default();
        d.push(100, start);
        d.push(200, start + Duration::from_millis(50));
        d.push(300, start + Duration::from_millis(100));

        assert_eq!(d.poll(start + Duration::from_millis(250)), None);
        assert_eq!(d.poll(start + Duration::from_millis(300)), Some(300));
        assert!(!d.is_pending());
        assert_eq!(d.poll(start + Duration::from_millis(900)), None);
    }

    #[test]
    fn test_cancel() {
        let start = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(10));
        d.push("a", start);
        d.cancel();
        assert_eq!(d.poll(start + Duration::from_secs(1)), None);
    }
}
