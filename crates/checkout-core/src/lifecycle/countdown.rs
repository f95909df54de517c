//! Expiration countdown
//!
//! `Countdown` is the pure tick logic; `CountdownTimer` drives it from a
//! tokio interval and owns the task handle.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::clock::Clock;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);
pub const EXPIRED_LABEL: &str = "Expirado";
pub const NO_EXPIRATION_LABEL: &str = "Sin expiración";

/// `"{h}h {m}m {s}s restantes"`, dropping leading zero units
pub fn format_time_remaining(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(expires_at) = expires_at else {
        return NO_EXPIRATION_LABEL.to_string();
    };

    let millis = (expires_at - now).num_milliseconds();
    if millis <= 0 {
        return EXPIRED_LABEL.to_string();
    }

    let hours = millis / 3_600_000;
    let minutes = (millis % 3_600_000) / 60_000;
    let seconds = (millis % 60_000) / 1_000;

    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s restantes")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s restantes")
    } else {
        format!("{seconds}s restantes")
    }
}

/// Floor of remaining minutes is 5 or less. Already-past links count.
pub fn is_expiring_rapidly(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expires_at.is_some_and(|at| (at - now).num_milliseconds().div_euclid(60_000) <= 5)
}

/// Outcome of one countdown tick
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Tick {
    /// Still pending, with the refreshed label
    Running(String),
    /// Expiry observed on this tick. Reported once.
    Expired,
    /// Nothing left to do
    Idle,
}

/// Tick state machine for one expiry instant
#[derive(Clone, Debug)]
pub struct Countdown {
    expires_at: Option<DateTime<Utc>>,
    finished: bool,
}

impl Countdown {
    pub fn new(expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            expires_at,
            finished: expires_at.is_none(),
        }
    }

    pub fn label(&self, now: DateTime<Utc>) -> String {
        format_time_remaining(self.expires_at, now)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> Tick {
        if self.finished {
            return Tick::Idle;
        }
        match self.expires_at {
            Some(at) if now > at => {
                self.finished = true;
                Tick::Expired
            }
            Some(at) => Tick::Running(format_time_remaining(Some(at), now)),
            None => {
                self.finished = true;
                Tick::Idle
            }
        }
    }
}

// ============================================================================
// Timer task
// ============================================================================

/// A running countdown. The label is published on a watch channel; the
/// task is aborted on `stop()` or drop.
#[derive(Debug)]
pub struct CountdownTimer {
    label: watch::Receiver<String>,
    handle: Option<JoinHandle<()>>,
}

impl CountdownTimer {
    /// Compute the label now and, if there is an expiry, tick every second
    /// until it passes. `on_expired` runs at most once.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F>(expires_at: Option<DateTime<Utc>>, clock: Arc<dyn Clock>, on_expired: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let mut countdown = Countdown::new(expires_at);
        let (tx, label) = watch::channel(countdown.label(clock.now()));

        if countdown.is_finished() {
            return Self { label, handle: None };
        }

        tracing::debug!(expires_at = ?expires_at, "Countdown started");

        let handle = tokio::spawn(async move {
            let mut on_expired = Some(on_expired);
            let mut interval = tokio::time::interval(TICK_PERIOD);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately; the label is already set.
            interval.tick().await;

            loop {
                interval.tick().await;
                match countdown.tick(clock.now()) {
                    Tick::Running(text) => {
                        tx.send_replace(text);
                    }
                    Tick::Expired => {
                        tx.send_replace(EXPIRED_LABEL.to_string());
                        tracing::info!("Countdown reached expiry");
                        if let Some(callback) = on_expired.take() {
                            callback();
                        }
                        break;
                    }
                    Tick::Idle => break,
                }
            }
        });

        Self {
            label,
            handle: Some(handle),
        }
    }

    /// Current label
    pub fn time_remaining(&self) -> String {
        self.label.borrow().clone()
    }

    /// Observer for label changes
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.label.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel the tick. Safe to call any number of times.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!("Countdown stopped");
        }
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TokioClock;
    use chrono::Duration as ChronoDuration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_format_time_remaining() {
        let now = at("2026-05-01T10:00:00Z");
        let after = |secs| Some(now + ChronoDuration::seconds(secs));

        assert_eq!(format_time_remaining(None, now), "Sin expiración");
        assert_eq!(format_time_remaining(after(-1), now), "Expirado");
        assert_eq!(format_time_remaining(after(0), now), "Expirado");
        assert_eq!(format_time_remaining(after(42), now), "42s restantes");
        assert_eq!(format_time_remaining(after(125), now), "2m 5s restantes");
        assert_eq!(format_time_remaining(after(3_600), now), "1h 0m 0s restantes");
        assert_eq!(format_time_remaining(after(26 * 3_600 + 61), now), "26h 1m 1s restantes");
    }

    #[test]
    fn test_expiring_rapidly_threshold() {
        let now = at("2026-05-01T10:00:00Z");
        let after = |secs| Some(now + ChronoDuration::seconds(secs));

        assert!(!is_expiring_rapidly(None, now));
        assert!(is_expiring_rapidly(after(5 * 60 + 59), now));
        assert!(!is_expiring_rapidly(after(6 * 60), now));
        assert!(is_expiring_rapidly(after(-30), now));
    }

    #[test]
    fn test_expired_reported_once() {
        let now = at("2026-05-01T10:00:00Z");
        let mut countdown = Countdown::new(Some(now + ChronoDuration::seconds(1)));

        assert_eq!(countdown.tick(now), Tick::Running("1s restantes".into()));
        // Not past yet at the exact instant
        assert_eq!(countdown.tick(now + ChronoDuration::seconds(1)), Tick::Running(EXPIRED_LABEL.into()));
        assert_eq!(countdown.tick(now + ChronoDuration::seconds(2)), Tick::Expired);
        for extra in 3..10 {
            assert_eq!(countdown.tick(now + ChronoDuration::seconds(extra)), Tick::Idle);
        }
        assert!(countdown.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_on_expired_once() {
        let clock = Arc::new(TokioClock::new(at("2026-05-01T10:00:00Z")));
        let expires_at = clock.base() + ChronoDuration::seconds(1);
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        let timer = CountdownTimer::start(Some(expires_at), clock, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(timer.time_remaining(), "1s restantes");

        tokio::time::sleep(Duration::from_secs(6)).await;

        assert_eq!(timer.time_remaining(), EXPIRED_LABEL);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let clock = Arc::new(TokioClock::new(at("2026-05-01T10:00:00Z")));
        let expires_at = clock.base() + ChronoDuration::seconds(3);
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        let mut timer = CountdownTimer::start(Some(expires_at), clock, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(timer.is_running());

        timer.stop();
        timer.stop();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(!timer.is_running());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(timer.time_remaining(), "3s restantes");
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_expiration_spawns_nothing() {
        let clock = Arc::new(TokioClock::new(at("2026-05-01T10:00:00Z")));
        let timer = CountdownTimer::start(None, clock, || panic!("must not fire"));
        assert!(!timer.is_running());
        assert_eq!(timer.time_remaining(), NO_EXPIRATION_LABEL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscriber_sees_updates() {
        let clock = Arc::new(TokioClock::new(at("2026-05-01T10:00:00Z")));
        let expires_at = clock.base() + ChronoDuration::seconds(90);
        let timer = CountdownTimer::start(Some(expires_at), clock, || {});

        let mut rx = timer.subscribe();
        assert_eq!(*rx.borrow_and_update(), "1m 30s restantes");
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), "1m 29s restantes");
    }
}
