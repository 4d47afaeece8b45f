use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::wake::{compute_lateness, format_time_of_day, Clock, Lateness, WakeUpSettings};

/// Re-evaluates lateness once per interval
pub struct LatenessTimer {
    interval: Duration,
    last_check: Option<DateTime<Utc>>,
    current: Lateness,
}

impl LatenessTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_check: None,
            current: Lateness::ON_TIME,
        }
    }

    /// Returns the new value when a check was due (the first call
    /// always checks), `None` otherwise
    pub fn poll(&mut self, clock: &dyn Clock, settings: Option<&WakeUpSettings>) -> Option<Lateness> {
        let now = clock.now();
        let due = match self.last_check {
            None => true,
            // a clock going backwards also counts as due
            Some(last) => (now - last).to_std().map_or(true, |elapsed| elapsed >= self.interval),
        };
        if !due {
            return None;
        }

        self.last_check = Some(now);
        let lateness = compute_lateness(clock.local_now(), settings);
        if lateness != self.current {
            debug!("lateness changed: {:?} -> {:?}", self.current, lateness);
        }
        self.current = lateness;
        Some(lateness)
    }

    /// Force a check on the next poll, used when the settings change
    pub fn invalidate(&mut self) {
        self.last_check = None;
    }

    pub fn current(&self) -> Lateness {
        self.current
    }
}

pub fn current_time_label(clock: &dyn Clock) -> String {
    format_time_of_day(clock.local_now().time())
}

pub fn target_time_label(settings: Option<&WakeUpSettings>) -> String {
    match settings {
        Some(settings) => format_time_of_day(settings.wake_up_time),
        None => "--:--".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wake::FixedClock;
    use chrono::{FixedOffset, NaiveDate};

    fn clock(h: u32, m: u32) -> FixedClock {
        let local = NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap();
        FixedClock::at_local(local, FixedOffset::east_opt(2 * 3600).unwrap())
    }

    #[test]
    fn test_polls_once_per_interval() {
        let settings = WakeUpSettings::new(7, 0, true).unwrap();
        let clock = clock(6, 59);
        let mut timer = LatenessTimer::new(Duration::from_secs(60));

        assert_eq!(timer.poll(&clock, Some(&settings)), Some(Lateness::ON_TIME));
        clock.advance(chrono::Duration::seconds(30));
        assert_eq!(timer.poll(&clock, Some(&settings)), None);

        clock.advance(chrono::Duration::seconds(45));
        assert_eq!(
            timer.poll(&clock, Some(&settings)),
            Some(Lateness { is_late: true, minutes_late: 0 })
        );
        assert!(timer.current().is_late);
    }

    #[test]
    fn test_invalidate_rechecks_immediately() {
        let clock = clock(7, 45);
        let mut timer = LatenessTimer::new(Duration::from_secs(60));

        assert_eq!(timer.poll(&clock, None), Some(Lateness::ON_TIME));

        let settings = WakeUpSettings::new(7, 0, true).unwrap();
        assert_eq!(timer.poll(&clock, Some(&settings)), None);
        timer.invalidate();
        assert_eq!(
            timer.poll(&clock, Some(&settings)),
            Some(Lateness { is_late: true, minutes_late: 45 })
        );
    }

    #[test]
    fn test_labels() {
        assert_eq!(current_time_label(&clock(7, 5)), "07:05");
        assert_eq!(target_time_label(None), "--:--");
        let settings = WakeUpSettings::new(6, 30, false).unwrap();
        assert_eq!(target_time_label(Some(&settings)), "06:30");
    }
}
