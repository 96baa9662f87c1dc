use chrono::{Local, NaiveDate, NaiveDateTime};

/// Source of "now" for everything date- or cutoff-related.
///
/// The cutoff gate and the notion of "today" must never read the wall clock
/// directly, otherwise the rules cannot be tested deterministically. The
/// server injects [`SystemClock`]; tests inject [`fixed::FixedClock`].
pub trait Clock: Send {
    /// Current local date and time, timezone already applied.
    fn now(&self) -> NaiveDateTime;

    /// Today's calendar date, the key for menus and orders.
    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Wall-clock implementation used by the binaries.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

pub mod fixed {
    use super::*;

    /// A clock pinned to one instant, for tests.
    pub struct FixedClock(pub NaiveDateTime);

    impl FixedClock {
        /// Shorthand for "that day at that hour", which is all the cutoff
        /// logic ever cares about.
        pub fn at(date: NaiveDate, hour: u32) -> FixedClock {
            FixedClock(date.and_hms_opt(hour, 0, 0).unwrap())
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> NaiveDateTime {
            self.0
        }
    }
}

#[cfg(test)]
mod test {
    use super::fixed::FixedClock;
    use super::*;

    #[test]
    fn test_fixed_clock_reports_its_instant() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let clock = FixedClock::at(date, 9);

        assert_eq!(clock.today(), date);
        assert_eq!(clock.now(), date.and_hms_opt(9, 0, 0).unwrap());
    }
}
