use std::time::Duration;

use tokio::time::Instant;

/// Idle sleep when nothing is pending.
const IDLE: Duration = Duration::from_secs(86400);

/// Pure debouncer: only tracks timing, no knowledge of what changed.
///
/// Every [`touch`](Self::touch) restarts the settle window; the debouncer is
/// ready once `delay` has passed since the most recent touch.
pub(super) struct Debouncer {
    delay: Duration,
    pub(super) last_event: Option<Instant>,
}

impl Debouncer {
    pub(super) const fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_event: None,
        }
    }

    /// Record a notification.
    pub(super) fn touch(&mut self) {
        self.last_event = Some(Instant::now());
    }

    pub(super) fn is_ready(&self) -> bool {
        self.last_event
            .is_some_and(|last| last.elapsed() >= self.delay)
    }

    /// Consume the pending notification if the window has settled.
    pub(super) fn take_if_ready(&mut self) -> bool {
        if !self.is_ready() {
            return false;
        }
        self.last_event = None;
        true
    }

    /// Precise sleep duration until the window can settle.
    pub(super) fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return IDLE;
        };

        self.delay
            .saturating_sub(last_event.elapsed())
            .max(Duration::from_millis(1))
    }
}
