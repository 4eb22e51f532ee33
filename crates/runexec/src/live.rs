//! Debounced live re-evaluation.
//!
//! Every edit reschedules a single pending evaluation; the previous one is
//! cancelled through its [`CancellationToken`]. The host drives time by
//! calling [`LiveEvaluator::poll`] with the current instant, so nothing here
//! spawns threads or sleeps.
//! 即時重新評估：每次編輯都會取消前一個排程並重新計時，由宿主以 `poll` 推進時間。

use std::time::{Duration, Instant};

pub use tokio_util::sync::CancellationToken;

/// Delay between the last edit and the evaluation it triggers.
pub const DEFAULT_LIVE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug)]
struct Pending {
    source: String,
    due: Instant,
    token: CancellationToken,
}

/// Single-slot debounce timer for live evaluation.
/// （單一排程的延遲評估計時器。）
#[derive(Debug)]
pub struct LiveEvaluator {
    delay: Duration,
    pending: Option<Pending>,
}

impl Default for LiveEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_LIVE_DELAY)
    }
}

impl LiveEvaluator {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedules `source` for evaluation at `now + delay`, cancelling whatever
    /// was pending. The returned token lets the caller cancel this one too.
    pub fn schedule(&mut self, source: impl Into<String>, now: Instant) -> CancellationToken {
        self.cancel();
        let token = CancellationToken::new();
        self.pending = Some(Pending {
            source: source.into(),
            due: now + self.delay,
            token: token.clone(),
        });
        token
    }

    /// Returns the pending source once its deadline has passed. Cancelled
    /// entries are discarded without firing.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        let pending = self.pending.take()?;
        if pending.token.is_cancelled() {
            return None;
        }
        if now < pending.due {
            self.pending = Some(pending);
            return None;
        }
        Some(pending.source)
    }

    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.token.cancel();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| !pending.token.is_cancelled())
    }

    /// Instant at which the pending evaluation fires, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending
            .as_ref()
            .filter(|pending| !pending.token.is_cancelled())
            .map(|pending| pending.due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_only_after_delay() {
        let start = Instant::now();
        let mut live = LiveEvaluator::default();
        live.schedule("a", start);
        assert_eq!(live.poll(start + Duration::from_millis(499)), None);
        assert!(live.is_pending());
        assert_eq!(live.poll(start + DEFAULT_LIVE_DELAY).as_deref(), Some("a"));
        assert!(!live.is_pending());
        assert_eq!(live.poll(start + Duration::from_secs(5)), None);
    }

    #[test]
    fn later_edit_supersedes_pending_one() {
        let start = Instant::now();
        let mut live = LiveEvaluator::new(Duration::from_millis(100));
        let first = live.schedule("first", start);
        live.schedule("second", start + Duration::from_millis(80));
        assert!(first.is_cancelled());
        assert_eq!(live.poll(start + Duration::from_millis(120)), None);
        assert_eq!(
            live.poll(start + Duration::from_millis(180)).as_deref(),
            Some("second")
        );
    }

    #[test]
    fn external_cancel_drops_evaluation() {
        let start = Instant::now();
        let mut live = LiveEvaluator::new(Duration::from_millis(10));
        let token = live.schedule("x", start);
        token.cancel();
        assert_eq!(live.deadline(), None);
        assert_eq!(live.poll(start + Duration::from_secs(1)), None);
    }

    #[test]
    fn superseding_edit_cancels_derived_tokens() {
        let start = Instant::now();
        let mut live = LiveEvaluator::default();
        let run_scope = live.schedule("first", start).child_token();
        assert!(!run_scope.is_cancelled());
        live.schedule("second", start);
        assert!(run_scope.is_cancelled());
    }
}
