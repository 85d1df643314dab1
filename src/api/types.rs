use crate::domain::{
    BorrowStatus, BorrowingTransaction, DamageCategory, PaymentMethod, PaymentStatus, Reservation,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Error body returned for every failed request
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

/// GET /books query parameters
#[derive(Debug, Default, Deserialize)]
pub struct BookSearchQuery {
    /// Matched against title and author
    pub q: Option<String>,
    pub category: Option<String>,
}

/// POST /borrowings/:id/return
#[derive(Debug, Default, Deserialize)]
pub struct ReturnRequest {
    pub return_date: Option<NaiveDate>,
}

/// GET /borrowings/:id/damage/preview query parameters
#[derive(Debug, Deserialize)]
pub struct DamagePreviewQuery {
    pub category: DamageCategory,
}

/// POST /borrowings/:id/damage
#[derive(Debug, Deserialize)]
pub struct DamageRequest {
    pub category: DamageCategory,
    pub notes: String,
}

/// Body of every fine and penalty payment
#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub method: PaymentMethod,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CollectResponse {
    pub reservation: Reservation,
    pub borrowing: BorrowingTransaction,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SweepResponse {
    pub affected: usize,
}

#[derive(Debug, Deserialize)]
pub struct BorrowingReportQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: Option<BorrowStatus>,
}

#[derive(Debug, Deserialize)]
pub struct DamageReportQuery {
    pub payment_status: Option<PaymentStatus>,
}

/// POST /time/set
#[derive(Debug, Deserialize)]
pub struct SetTimeRequest {
    pub at: DateTime<Utc>,
}

/// POST /time/advance. Hours and days add up; at least one is required.
#[derive(Debug, Default, Deserialize)]
pub struct AdvanceTimeRequest {
    #[serde(default)]
    pub hours: i64,
    #[serde(default)]
    pub days: i64,
}

impl AdvanceTimeRequest {
    /// `None` when the step does not fit in a duration
    pub fn duration(&self) -> Option<chrono::Duration> {
        chrono::Duration::try_days(self.days)?.checked_add(&chrono::Duration::try_hours(self.hours)?)
    }
}
