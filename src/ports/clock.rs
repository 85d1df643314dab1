use chrono::{DateTime, NaiveDate, Utc};

/// Source of "now" for every date rule in the service
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar date of `now()` in UTC
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Staff control over the effective time.
///
/// The override is process-wide: every request sees the same effective time
/// until it is reset.
pub trait TimeControl: Send + Sync {
    /// Wall-clock time, ignoring any override
    fn real_now(&self) -> DateTime<Utc>;

    fn current_override(&self) -> Option<DateTime<Utc>>;

    fn set_override(&self, at: DateTime<Utc>);

    fn clear_override(&self);
}
