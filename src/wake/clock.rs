//! Injectable time source, the system clock in the app and a
//! fixed, manually advanced one in tests

#[cfg(test)]
use std::{cell::Cell, rc::Rc};

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, Utc};

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Offset of the user's local time from UTC
    fn offset(&self) -> FixedOffset;

    /// Wall-clock time as the user sees it
    fn local_now(&self) -> NaiveDateTime {
        self.now().with_timezone(&self.offset()).naive_local()
    }

    fn today(&self) -> NaiveDate {
        self.local_now().date()
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn offset(&self) -> FixedOffset {
        *Local::now().offset()
    }
}

#[cfg(test)]
#[derive(Debug)]
pub struct FixedClock {
    now: Cell<DateTime<Utc>>,
    offset: FixedOffset,
}

#[cfg(test)]
impl FixedClock {
    pub fn new(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self { now: Cell::new(now), offset }
    }

    /// A clock showing `local` on the wall in a zone `offset` away from UTC
    pub fn at_local(local: NaiveDateTime, offset: FixedOffset) -> Self {
        use chrono::TimeZone;
        let utc = local - chrono::Duration::seconds(offset.local_minus_utc() as i64);
        Self::new(Utc.from_utc_datetime(&utc), offset)
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.now.set(self.now.get() + by);
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}

// lets tests keep a handle on a clock they gave away
#[cfg(test)]
impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn offset(&self) -> FixedOffset {
        (**self).offset()
    }
}

#[test]
fn test_fixed_clock_local_time() {
    let offset = FixedOffset::east_opt(8 * 3600).unwrap();
    let local = NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(7, 30, 0)
        .unwrap();
    let clock = FixedClock::at_local(local, offset);

    assert_eq!(clock.local_now(), local);
    assert_eq!(clock.now().naive_utc(), local - chrono::Duration::hours(8));

    // crossing midnight in UTC doesn't change the local day
    clock.advance(chrono::Duration::hours(1));
    assert_eq!(clock.today(), local.date());
}
