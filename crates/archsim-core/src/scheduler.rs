//! Repeating chaos ticks.
//!
//! A scheduler emits [`ChaosTick`]s stamped with the [`SessionToken`] that
//! was current when it was armed. The orchestrator bumps its token on every
//! arm and disarm, so a tick that arrives after a stop, restart or mode
//! switch carries an old token and is discarded.

use std::time::Duration;

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{trace, warn};

/// Ownership stamp for one armed chaos run. Monotonic per orchestrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SessionToken(u64);

impl SessionToken {
    pub fn next(self) -> Self {
        SessionToken(self.0.wrapping_add(1))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChaosTick {
    pub token: SessionToken,
}

/// Drives the chaos repeat. At most one repeat is armed at a time; arming
/// replaces whatever was armed before.
pub trait TickScheduler {
    /// Start emitting ticks for `token` every `period`, first one after a
    /// full period.
    fn arm(&mut self, token: SessionToken, period: Duration);

    /// Stop emitting ticks. Safe to call when nothing is armed.
    fn disarm(&mut self);
}

/// Tokio-backed scheduler. Ticks are delivered over an unbounded channel;
/// the host forwards each one to the orchestrator.
pub struct TokioTickScheduler {
    tx: mpsc::UnboundedSender<ChaosTick>,
    task: Option<JoinHandle<()>>,
}

impl TokioTickScheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ChaosTick>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, task: None }, rx)
    }

    pub fn is_armed(&self) -> bool {
        self.task.is_some()
    }
}

impl TickScheduler for TokioTickScheduler {
    /// Outside a tokio runtime nothing is spawned and the scheduler stays
    /// disarmed; rounds can still be driven by hand.
    fn arm(&mut self, token: SessionToken, period: Duration) {
        self.disarm();
        let Ok(runtime) = Handle::try_current() else {
            warn!(token = token.value(), "no tokio runtime, chaos repeat not armed");
            return;
        };
        let tx = self.tx.clone();
        self.task = Some(runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                trace!(token = token.value(), "chaos tick");
                if tx.send(ChaosTick { token }).is_err() {
                    // Receiver gone, nobody left to drive.
                    return;
                }
            }
        }));
    }

    fn disarm(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for TokioTickScheduler {
    fn drop(&mut self) {
        self.disarm();
    }
}

/// Scheduler with no runtime behind it. Records what is armed; tests pull
/// ticks out of it by hand.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    armed: Option<(SessionToken, Duration)>,
    arm_count: usize,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tick for the currently armed run, if any.
    pub fn tick(&self) -> Option<ChaosTick> {
        self.armed.map(|(token, _)| ChaosTick { token })
    }

    pub fn armed_period(&self) -> Option<Duration> {
        self.armed.map(|(_, period)| period)
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Total number of `arm` calls so far.
    pub fn arm_count(&self) -> usize {
        self.arm_count
    }
}

impl TickScheduler for ManualScheduler {
    fn arm(&mut self, token: SessionToken, period: Duration) {
        self.armed = Some((token, period));
        self.arm_count += 1;
    }

    fn disarm(&mut self) {
        self.armed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_monotonic() {
        let a = SessionToken::default();
        let b = a.next();
        assert!(b > a);
        assert_eq!(b.value(), 1);
    }

    #[test]
    fn test_manual_scheduler_rearm_replaces() {
        let mut scheduler = ManualScheduler::new();
        assert!(scheduler.tick().is_none());

        let first = SessionToken::default().next();
        scheduler.arm(first, Duration::from_secs(1));
        let second = first.next();
        scheduler.arm(second, Duration::from_secs(2));

        assert_eq!(scheduler.tick(), Some(ChaosTick { token: second }));
        assert_eq!(scheduler.armed_period(), Some(Duration::from_secs(2)));
        assert_eq!(scheduler.arm_count(), 2);

        scheduler.disarm();
        scheduler.disarm();
        assert!(!scheduler.is_armed());
    }

    #[test]
    fn test_tokio_scheduler_without_runtime_stays_disarmed() {
        let (mut scheduler, mut rx) = TokioTickScheduler::new();
        scheduler.arm(SessionToken::default(), Duration::from_millis(500));
        assert!(!scheduler.is_armed());
        assert!(rx.try_recv().is_err());
        scheduler.disarm();
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_ticks_every_period() {
        let (mut scheduler, mut rx) = TokioTickScheduler::new();
        let token = SessionToken::default().next();
        let start = Instant::now();
        scheduler.arm(token, Duration::from_millis(500));

        let tick = rx.recv().await.unwrap();
        assert_eq!(tick.token, token);
        let first = start.elapsed();
        assert!(first >= Duration::from_millis(500) && first < Duration::from_millis(1000));

        rx.recv().await.unwrap();
        let second = start.elapsed();
        assert!(second >= Duration::from_millis(1000) && second < Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_disarm_stops_ticks() {
        let (mut scheduler, mut rx) = TokioTickScheduler::new();
        scheduler.arm(SessionToken::default(), Duration::from_millis(500));
        scheduler.disarm();
        assert!(!scheduler.is_armed());

        let waited = tokio::time::timeout(Duration::from_secs(10), rx.recv()).await;
        assert!(waited.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_rearm_cancels_previous() {
        let (mut scheduler, mut rx) = TokioTickScheduler::new();
        let old = SessionToken::default();
        let new = old.next();
        scheduler.arm(old, Duration::from_millis(300));
        scheduler.arm(new, Duration::from_millis(1000));

        let tick = rx.recv().await.unwrap();
        assert_eq!(tick.token, new);
    }
}
