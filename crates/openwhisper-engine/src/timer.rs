//! One-shot timers for the overlay cancel animation.
//!
//! Timers never call into the coordinator directly. A [`TimerScheduler`]
//! reports expiry by token through the application's event loop, and
//! [`CancelTimer::expire`] decides whether that token is still the armed one.

use std::collections::HashMap;
use std::io;
use std::time::Duration;

use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::Deliver;

/// Identifies one arming of a timer.
pub type TimerToken = u64;

/// Something that can fire a token after a delay.
pub trait TimerScheduler {
    /// Report `token` once `after` has elapsed.
    fn schedule(&mut self, token: TimerToken, after: Duration);
    /// Best effort: stop `token` from being reported.
    fn cancel(&mut self, token: TimerToken);
}

/// The re-armable cancel-animation timer.
#[derive(Debug)]
pub struct CancelTimer {
    duration: Duration,
    last_token: TimerToken,
    armed: Option<TimerToken>,
}

impl CancelTimer {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            last_token: 0,
            armed: None,
        }
    }

    /// Stops any armed timer and starts a fresh one.
    pub fn arm(&mut self, scheduler: &mut impl TimerScheduler) -> TimerToken {
        self.stop(scheduler);
        self.last_token += 1;
        let token = self.last_token;
        self.armed = Some(token);
        scheduler.schedule(token, self.duration);
        debug!(token, duration = ?self.duration, "Cancel timer armed");
        token
    }

    pub fn stop(&mut self, scheduler: &mut impl TimerScheduler) {
        if let Some(token) = self.armed.take() {
            scheduler.cancel(token);
        }
    }

    /// Consumes an expiry. Returns `true` only for the currently armed token;
    /// expiries from stopped or re-armed timers return `false`.
    pub fn expire(&mut self, token: TimerToken) -> bool {
        if self.armed == Some(token) {
            self.armed = None;
            true
        } else {
            debug!(token, armed = ?self.armed, "Ignoring stale cancel timer");
            false
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

/// Scheduler backed by sleeping tasks on a small tokio runtime.
pub struct TokioTimerScheduler {
    runtime: Runtime,
    on_expire: Deliver<TimerToken>,
    pending: HashMap<TimerToken, JoinHandle<()>>,
}

impl TokioTimerScheduler {
    /// Creates a scheduler that hands expired tokens to `on_expire`.
    pub fn new(on_expire: Deliver<TimerToken>) -> io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("overlay-timer")
            .enable_time()
            .build()?;

        Ok(Self {
            runtime,
            on_expire,
            pending: HashMap::new(),
        })
    }
}

impl TimerScheduler for TokioTimerScheduler {
    fn schedule(&mut self, token: TimerToken, after: Duration) {
        self.pending.retain(|_, task| !task.is_finished());

        let on_expire = self.on_expire.clone();
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(after).await;
            on_expire(token);
        });
        self.pending.insert(token, task);
    }

    fn cancel(&mut self, token: TimerToken) {
        if let Some(task) = self.pending.remove(&token) {
            task.abort();
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;
    use std::sync::mpsc;

    use super::*;

    /// Scheduler that only records what it was asked to do.
    #[derive(Debug, Default)]
    pub(crate) struct ManualScheduler {
        pub scheduled: Vec<(TimerToken, Duration)>,
        pub cancelled: Vec<TimerToken>,
    }

    impl ManualScheduler {
        /// Most recently scheduled token that has not been cancelled.
        pub fn live(&self) -> Option<TimerToken> {
            self.scheduled
                .iter()
                .rev()
                .map(|(token, _)| *token)
                .find(|token| !self.cancelled.contains(token))
        }
    }

    impl TimerScheduler for ManualScheduler {
        fn schedule(&mut self, token: TimerToken, after: Duration) {
            self.scheduled.push((token, after));
        }

        fn cancel(&mut self, token: TimerToken) {
            self.cancelled.push(token);
        }
    }

    #[test]
    fn test_rearm_cancels_previous() {
        let mut scheduler = ManualScheduler::default();
        let mut timer = CancelTimer::new(Duration::from_millis(1000));

        let first = timer.arm(&mut scheduler);
        let second = timer.arm(&mut scheduler);

        assert_ne!(first, second);
        assert_eq!(scheduler.cancelled, vec![first]);
        assert_eq!(scheduler.live(), Some(second));
        assert!(!timer.expire(first));
        assert!(timer.is_armed());
        assert!(timer.expire(second));
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_expire_once() {
        let mut scheduler = ManualScheduler::default();
        let mut timer = CancelTimer::new(Duration::from_millis(10));
        let token = timer.arm(&mut scheduler);
        assert!(timer.expire(token));
        assert!(!timer.expire(token));
    }

    #[test]
    fn test_stop_makes_expiry_stale() {
        let mut scheduler = ManualScheduler::default();
        let mut timer = CancelTimer::new(Duration::from_millis(10));
        let token = timer.arm(&mut scheduler);
        timer.stop(&mut scheduler);
        assert_eq!(scheduler.cancelled, vec![token]);
        assert!(!timer.expire(token));
    }

    #[test]
    fn test_tokio_scheduler_fires_and_cancels() {
        let (tx, rx) = mpsc::channel();
        let mut scheduler = TokioTimerScheduler::new(Arc::new(move |token: TimerToken| {
            let _ = tx.send(token);
        }))
        .unwrap();

        scheduler.schedule(1, Duration::from_millis(500));
        scheduler.schedule(2, Duration::from_millis(20));
        scheduler.cancel(1);

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(2u64));
        assert!(rx.recv_timeout(Duration::from_millis(800)).is_err());
    }
}
