//! Claim scheduling relative to a wall-clock target.
//!
//! A claim has exactly two suspension points: one that ends `lead_time`
//! before the target so the connection can be opened outside the critical
//! window, and one that ends at the target itself. Targets at or before now
//! never sleep.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::DEFAULT_LEAD_TIME;

/// Source of wall-clock time and sleeping.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    async fn sleep(&self, duration: Duration);
}

/// Real clock backed by the system time and tokio timers.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Clock that only moves when slept on. Every requested sleep is recorded.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn advance(&self, duration: Duration) {
        if let Ok(mut now) = self.now.lock() {
            let step = chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero());
            *now += step;
        }
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|now| *now).unwrap_or_else(|_| Utc::now())
    }

    async fn sleep(&self, duration: Duration) {
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(duration);
        }
        self.advance(duration);
    }
}

/// Computes and performs the two waits of a timed claim.
#[derive(Clone)]
pub struct ClaimScheduler {
    lead_time: Duration,
    clock: Arc<dyn Clock>,
}

impl ClaimScheduler {
    pub fn new(lead_time: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { lead_time, clock }
    }

    pub fn lead_time(&self) -> Duration {
        self.lead_time
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Time left until `target`, zero if it already passed.
    pub fn fire_wait(target: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
        (target - now).to_std().unwrap_or(Duration::ZERO)
    }

    /// Time left until `lead_time` before `target`, zero if that already passed.
    pub fn connect_wait(&self, target: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
        Self::fire_wait(target, now).saturating_sub(self.lead_time)
    }

    /// First suspension point: returns once the connection should be opened.
    pub async fn wait_for_connect(&self, target: DateTime<Utc>) -> Duration {
        let wait = self.connect_wait(target, self.clock.now());
        self.suspend(wait).await;
        wait
    }

    /// Second suspension point: returns at the target instant.
    pub async fn wait_for_fire(&self, target: DateTime<Utc>) -> Duration {
        let wait = Self::fire_wait(target, self.clock.now());
        self.suspend(wait).await;
        wait
    }

    async fn suspend(&self, wait: Duration) {
        if !wait.is_zero() {
            log::debug!("sleeping {:.3}s", wait.as_secs_f64());
            self.clock.sleep(wait).await;
        }
    }
}

impl Default for ClaimScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_LEAD_TIME, Arc::new(SystemClock))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 3, 1, 12, 0, 0).unwrap()
    }

    fn scheduler(clock: Arc<ManualClock>) -> ClaimScheduler {
        ClaimScheduler::new(Duration::from_secs(20), clock)
    }

    #[tokio::test]
    async fn future_target_sleeps_twice_and_wakes_on_target() {
        let clock = Arc::new(ManualClock::new(start()));
        let scheduler = scheduler(clock.clone());
        let target = start() + chrono::Duration::seconds(90);

        scheduler.wait_for_connect(target).await;
        assert_eq!(clock.now(), target - chrono::Duration::seconds(20));

        scheduler.wait_for_fire(target).await;
        assert_eq!(clock.now(), target);
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(70), Duration::from_secs(20)]
        );
    }

    #[tokio::test]
    async fn target_inside_lead_window_connects_immediately() {
        let clock = Arc::new(ManualClock::new(start()));
        let scheduler = scheduler(clock.clone());
        let target = start() + chrono::Duration::seconds(5);

        assert_eq!(scheduler.wait_for_connect(target).await, Duration::ZERO);
        assert_eq!(scheduler.wait_for_fire(target).await, Duration::from_secs(5));
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(5)]);
        assert_eq!(clock.now(), target);
    }

    #[tokio::test]
    async fn past_target_never_sleeps() {
        let clock = Arc::new(ManualClock::new(start()));
        let scheduler = scheduler(clock.clone());

        for offset in [0, -1, -3600] {
            let target = start() + chrono::Duration::seconds(offset);
            assert_eq!(scheduler.wait_for_connect(target).await, Duration::ZERO);
            assert_eq!(scheduler.wait_for_fire(target).await, Duration::ZERO);
        }
        assert!(clock.sleeps().is_empty());
        assert_eq!(clock.now(), start());
    }

    #[test]
    fn waits_are_never_negative() {
        let now = start();
        let target = now - chrono::Duration::milliseconds(1);
        assert_eq!(ClaimScheduler::fire_wait(target, now), Duration::ZERO);
        let scheduler = ClaimScheduler::default();
        assert_eq!(scheduler.connect_wait(target, now), Duration::ZERO);
        assert_eq!(
            scheduler.connect_wait(now + chrono::Duration::seconds(21), now),
            Duration::from_secs(1)
        );
    }
}
