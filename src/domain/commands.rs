use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{
    BookId, BorrowId, DamageCategory, DamageId, MemberId, PaymentMethod, PenaltyId, ReturnId,
};

/// Command: lend a copy over the counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowBook {
    pub member_id: MemberId,
    pub book_id: BookId,
    /// Defaults to today on the library clock
    pub borrow_date: Option<NaiveDate>,
    /// Defaults to the borrow date plus the loan period
    pub due_date: Option<NaiveDate>,
}

/// Command: take a copy back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnBook {
    pub borrow_id: BorrowId,
    /// Defaults to today on the library clock
    pub return_date: Option<NaiveDate>,
}

/// Command: assess damage on a returned copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDamage {
    pub borrow_id: BorrowId,
    pub category: DamageCategory,
    pub notes: String,
}

/// Command: reserve a copy for pickup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveBook {
    pub book_id: BookId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayLateFine {
    pub return_id: ReturnId,
    pub method: PaymentMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayDamageFine {
    pub damage_id: DamageId,
    pub method: PaymentMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayPenalty {
    pub penalty_id: PenaltyId,
    pub method: PaymentMethod,
}
