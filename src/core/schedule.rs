//! # Periodic report timer.
//!
//! [`Schedule`] owns at most one [`tokio::time::Interval`]. Changing the period
//! drops the old interval before arming the new one, so a stale timer can never
//! fire alongside its replacement.
//!
//! ```text
//! set_period(None)      → no timer, tick() pends forever
//! set_period(Some(p))   → first tick at now + p, then every p
//! set_period(same)      → no-op
//! restart()             → next tick at now + p (pending tick superseded)
//! ```

use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Optional repeating timer.
#[derive(Debug, Default)]
pub(crate) struct Schedule {
    period: Option<Duration>,
    ticker: Option<Interval>,
}

impl Schedule {
    /// A schedule with ticking disabled.
    pub(crate) fn disabled() -> Self {
        Self::default()
    }

    /// Current period (`None` = disabled).
    pub(crate) fn period(&self) -> Option<Duration> {
        self.period
    }

    /// Replaces the timer if `period` differs from the current one.
    ///
    /// Returns `true` if the timer was replaced.
    pub(crate) fn set_period(&mut self, period: Option<Duration>) -> bool {
        if self.period == period {
            return false;
        }
        self.ticker = None;
        self.period = period;
        self.ticker = period.map(Self::arm);
        true
    }

    /// Pushes the next tick one full period into the future.
    pub(crate) fn restart(&mut self) {
        if let Some(ticker) = self.ticker.as_mut() {
            ticker.reset();
        }
    }

    /// Releases the timer.
    pub(crate) fn stop(&mut self) {
        self.ticker = None;
        self.period = None;
    }

    /// Completes on the next tick; never completes while disabled.
    pub(crate) async fn tick(&mut self) {
        match self.ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    fn arm(period: Duration) -> Interval {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn disabled_never_ticks() {
        let mut schedule = Schedule::disabled();
        let res = time::timeout(Duration::from_secs(3600), schedule.tick()).await;
        assert!(res.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_after_one_period() {
        let mut schedule = Schedule::disabled();
        assert!(schedule.set_period(Some(Duration::from_secs(5))));
        assert!(!schedule.set_period(Some(Duration::from_secs(5))));

        let start = Instant::now();
        schedule.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(5));
        schedule.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn restart_supersedes_pending_tick() {
        let mut schedule = Schedule::disabled();
        schedule.set_period(Some(Duration::from_secs(5)));

        let start = Instant::now();
        time::sleep(Duration::from_secs(3)).await;
        schedule.restart();
        schedule.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_disables() {
        let mut schedule = Schedule::disabled();
        schedule.set_period(Some(Duration::from_secs(1)));
        schedule.stop();
        assert_eq!(schedule.period(), None);
        let res = time::timeout(Duration::from_secs(10), schedule.tick()).await;
        assert!(res.is_err());
    }
}
