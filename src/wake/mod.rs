use std::fmt::{self, Display, Formatter};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use num_integer::Integer;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorType, Result};

pub use clock::{Clock, SystemClock};
#[cfg(test)]
pub use clock::FixedClock;
pub use history::{history, HistoryEntry};
pub use photo::{photo_required, PhotoFile, PhotoSubmission};
pub use timer::LatenessTimer;

pub mod clock;
pub mod history;
pub mod photo;
pub mod timer;

const MILLIS_PER_MINUTE: i64 = 60_000;

#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug)]
pub struct WakeUpSettings {
    /// Only hours and minutes are meaningful
    pub wake_up_time: NaiveTime,
    pub is_enabled: bool,
}

impl WakeUpSettings {
    pub fn new(hour: u32, minute: u32, is_enabled: bool) -> Option<Self> {
        Some(Self {
            wake_up_time: NaiveTime::from_hms_opt(hour, minute, 0)?,
            is_enabled,
        })
    }

    /// Parse "HH:MM"
    pub fn parse(time: &str, is_enabled: bool) -> Result<Self> {
        let parsed = NaiveTime::parse_from_str(time.trim(), "%H:%M")?;
        Self::new(parsed.hour(), parsed.minute(), is_enabled)
            .ok_or_else(|| ErrorType::InvalidInput(format!("bad time of day {:?}", time)).into())
    }

    /// The target on a given day, seconds are dropped
    pub fn target_on(&self, day: NaiveDate) -> NaiveDateTime {
        let time = self.wake_up_time;
        let minute_precision = NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time);
        day.and_time(minute_precision)
    }
}

impl Default for WakeUpSettings {
    fn default() -> Self {
        Self {
            wake_up_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap_or_default(),
            is_enabled: true,
        }
    }
}

impl Display for WakeUpSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_enabled {
            write!(f, "every day at {}", format_time_of_day(self.wake_up_time))
        } else {
            write!(f, "challenge disabled")
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct Lateness {
    pub is_late: bool,
    pub minutes_late: i64,
}

impl Lateness {
    pub const ON_TIME: Self = Self { is_late: false, minutes_late: 0 };
}

/// Whole minutes between `target` and `now`, rounded down
pub fn minutes_past(now: NaiveDateTime, target: NaiveDateTime) -> i64 {
    Integer::div_floor(&(now - target).num_milliseconds(), &MILLIS_PER_MINUTE)
}

/// Late means strictly after today's target, missing or disabled
/// settings are never late
pub fn compute_lateness(now: NaiveDateTime, settings: Option<&WakeUpSettings>) -> Lateness {
    let settings = match settings {
        Some(settings) if settings.is_enabled => settings,
        _ => return Lateness::ON_TIME,
    };

    let target = settings.target_on(now.date());
    if now > target {
        Lateness {
            is_late: true,
            minutes_late: minutes_past(now, target),
        }
    } else {
        Lateness::ON_TIME
    }
}

pub fn format_time_of_day(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

#[cfg(test)]
fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 17)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

#[test]
fn test_lateness() {
    let seven = WakeUpSettings::new(7, 0, true).unwrap();
    for (now, expect) in [
        (at(7, 45, 0), (true, 45)),
        (at(7, 0, 0), (false, 0)),
        (at(6, 59, 59), (false, 0)),
        (at(7, 0, 1), (true, 0)),
        (at(7, 0, 59), (true, 0)),
        (at(7, 1, 0), (true, 1)),
        (at(23, 59, 59), (true, 16 * 60 + 59)),
        (at(0, 0, 0), (false, 0)),
    ] {
        let Lateness { is_late, minutes_late } = compute_lateness(now, Some(&seven));
        assert_eq!((is_late, minutes_late), expect, "at {}", now);
    }
}

#[test]
fn test_neutral_lateness() {
    let disabled = WakeUpSettings::new(7, 0, false).unwrap();
    assert_eq!(compute_lateness(at(9, 0, 0), Some(&disabled)), Lateness::ON_TIME);
    assert_eq!(compute_lateness(at(9, 0, 0), None), Lateness::ON_TIME);
}

#[test]
fn test_target_ignores_seconds() {
    let settings = WakeUpSettings {
        wake_up_time: NaiveTime::from_hms_opt(6, 30, 42).unwrap(),
        is_enabled: true,
    };
    assert_eq!(
        compute_lateness(at(6, 30, 30), Some(&settings)),
        Lateness { is_late: true, minutes_late: 0 }
    );
}

#[test]
fn test_parse_settings() {
    let settings = WakeUpSettings::parse("07:05", true).unwrap();
    assert_eq!(format_time_of_day(settings.wake_up_time), "07:05");
    assert_eq!(settings.to_string(), "every day at 07:05");
    assert!(WakeUpSettings::parse("25:00", true).is_err());
    assert!(WakeUpSettings::parse("seven", true).is_err());
}
