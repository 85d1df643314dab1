use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Default loan period for staff-created and reservation borrowings (days)
pub const LOAN_PERIOD_DAYS: i64 = 14;

/// Unpaid fines older than this many days trigger suspension
pub const SUSPENSION_GRACE_DAYS: i64 = 14;

/// Pickup window after a reservation is placed (hours)
pub const PICKUP_WINDOW_HOURS: i64 = 24;

/// Circulation rule parameters.
///
/// Every rule function takes the policy explicitly so tests can tune it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CirculationPolicy {
    /// Late fine charged per day past the due date
    pub fine_per_day: Decimal,
    /// Fixed penalty recorded when a member is suspended
    pub suspension_penalty: Decimal,
    pub suspension_grace_days: i64,
    pub pickup_window_hours: i64,
    pub loan_period_days: i64,
}

impl CirculationPolicy {
    pub fn pickup_window(&self) -> Duration {
        Duration::hours(self.pickup_window_hours)
    }

    pub fn loan_period(&self) -> Duration {
        Duration::days(self.loan_period_days)
    }
}

impl Default for CirculationPolicy {
    fn default() -> Self {
        Self {
            fine_per_day: dec!(5000),
            suspension_penalty: dec!(100000),
            suspension_grace_days: SUSPENSION_GRACE_DAYS,
            pickup_window_hours: PICKUP_WINDOW_HOURS,
            loan_period_days: LOAN_PERIOD_DAYS,
        }
    }
}
