use std::time::Duration;
use tokio::time::{self, Interval, MissedTickBehavior};

/// A fixed frequency (in hz) used to pace maneuvers and the setpoint stream.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rate {
    hz: f32,
}

impl Rate {
    /// Create a new rate from a frequency in hz.
    /// Non-positive frequencies are rejected by [`Config::validate`](crate::Config::validate).
    pub fn new(hz: f32) -> Self {
        Self { hz }
    }

    pub fn hz(&self) -> f32 {
        self.hz
    }

    /// The time between ticks, never shorter than one nanosecond.
    pub fn period(&self) -> Duration {
        let nanos = (1e9 / self.hz as f64).round() as u64;
        Duration::from_nanos(nanos.max(1))
    }

    /// Create an interval ticking at this rate.
    /// The first tick completes immediately and missed ticks are delayed, never burst.
    pub fn interval(&self) -> Interval {
        let mut interval = time::interval(self.period());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }
}

impl Default for Rate {
    fn default() -> Self {
        Self::new(10.)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period() {
        assert_eq!(Rate::default().period(), Duration::from_millis(100));
        assert_eq!(Rate::new(400.).period(), Duration::from_micros(2500));
    }

    #[test]
    fn period_is_never_zero() {
        for hz in [3e9, 1e12, f32::MAX, f32::INFINITY, f32::NAN, -10.] {
            assert_eq!(Rate::new(hz).period(), Duration::from_nanos(1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fast_interval_ticks() {
        let mut interval = Rate::new(1e12).interval();
        interval.tick().await;
        interval.tick().await;
    }

    #[tokio::test(start_paused = true)]
    async fn interval_is_paced() {
        let start = time::Instant::now();
        let mut interval = Rate::new(20.).interval();

        interval.tick().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        interval.tick().await;
        interval.tick().await;
        assert_eq!(start.elapsed(), Duration::from_millis(100));
    }
}
