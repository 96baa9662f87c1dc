use crate::clock::Clock;
use crate::config::Config;
use crate::database::Database;
use crate::notify::Notifier;

/// The collaborators a request handler works against: storage, the
/// announcement channel, the clock, and the runtime configuration.
///
/// One instance serves the whole process, behind a mutex, because the
/// SQLite connection is single-threaded. The traffic a cafeteria sees does
/// not argue with that.
pub struct AppState {
    pub db: Box<dyn Database>,
    pub notifier: Box<dyn Notifier>,
    pub clock: Box<dyn Clock>,
    pub config: Config,
}

impl AppState {
    pub fn new(
        db: Box<dyn Database>,
        notifier: Box<dyn Notifier>,
        clock: Box<dyn Clock>,
        config: Config,
    ) -> AppState {
        AppState {
            db,
            notifier,
            clock,
            config,
        }
    }

    /// State against mocks, pinned to a weekday morning. Tests that care
    /// about the hour or the notifier build their own.
    #[cfg(test)]
    pub fn fixture() -> AppState {
        use crate::clock::fixed::FixedClock;
        use crate::database::mock::MockDb;
        use crate::notify::mock::RecordingNotifier;
        use chrono::NaiveDate;

        AppState::new(
            Box::new(MockDb::new()),
            Box::new(RecordingNotifier::recording().0),
            Box::new(FixedClock::at(
                NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
                10,
            )),
            Config::default(),
        )
    }
}
