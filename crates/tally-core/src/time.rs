use chrono::{DateTime, NaiveDate, Utc};

/// Injectable time source for the engine.
///
/// The scheduler is driven by an explicit `as_of` horizon rather than the
/// wall clock; a `Clock` only supplies audit timestamps (post events, alert
/// and statement creation) and the default horizon when the caller has none.
/// A fixed implementation makes every catch-up run replayable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar date of [`now`](Clock::now); the driver passes this as the
    /// posting horizon for an ordinary tick.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}
