use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    Book, BookId, BorrowError, BorrowId, CirculationPolicy, DamageCategory, DamageError, DamageId,
    Member, MemberId, PaymentError, PaymentMethod, PaymentStatus, ReservationId, ReturnError,
    ReturnId, StaffId, damage, fine,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorrowStatus {
    Borrowed,
    Returned,
}

impl BorrowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowStatus::Borrowed => "borrowed",
            BorrowStatus::Returned => "returned",
        }
    }
}

impl std::str::FromStr for BorrowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "borrowed" => Ok(BorrowStatus::Borrowed),
            "returned" => Ok(BorrowStatus::Returned),
            _ => Err(format!("Invalid borrow status: {}", s)),
        }
    }
}

/// One copy lent to one member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowingTransaction {
    pub borrow_id: BorrowId,
    pub member_id: MemberId,
    pub book_id: BookId,
    /// Set when the loan came from a collected reservation
    pub reservation_id: Option<ReservationId>,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: BorrowStatus,
}

/// Closing record of a borrowing with the late fine it produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturningTransaction {
    pub return_id: ReturnId,
    pub borrow_id: BorrowId,
    pub return_date: NaiveDate,
    pub late_days: i64,
    pub fine_amount: Decimal,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    pub payment_date: Option<DateTime<Utc>>,
    pub damage_recorded: bool,
}

/// Damage assessed on a returned copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageRecord {
    pub damage_id: DamageId,
    pub borrow_id: BorrowId,
    pub category: DamageCategory,
    pub notes: String,
    pub damage_date: NaiveDate,
    /// Replacement value at the time of the report
    pub book_value: Decimal,
    pub damage_fine: Decimal,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    pub payment_date: Option<DateTime<Utc>>,
    pub reported_by: StaffId,
}

/// Pure function: open a counter loan
///
/// Business rules:
/// - the member is active
/// - an unreserved copy is on the shelf
/// - the due date falls after the borrow date
pub fn borrow_book(
    member: &Member,
    book: &Book,
    borrow_date: NaiveDate,
    due_date: NaiveDate,
) -> Result<BorrowingTransaction, BorrowError> {
    if !member.status.is_active() {
        return Err(BorrowError::MemberSuspended);
    }
    if !book.is_available() {
        return Err(BorrowError::OutOfStock);
    }
    if due_date <= borrow_date {
        return Err(BorrowError::DueDateNotAfterBorrowDate);
    }

    Ok(BorrowingTransaction {
        borrow_id: BorrowId::new(),
        member_id: member.member_id,
        book_id: book.book_id,
        reservation_id: None,
        borrow_date,
        due_date,
        status: BorrowStatus::Borrowed,
    })
}

/// Closes a borrowing and prices any lateness.
///
/// A zero fine is recorded as already paid.
pub fn return_book(
    borrowing: &BorrowingTransaction,
    return_date: NaiveDate,
    policy: &CirculationPolicy,
) -> Result<(BorrowingTransaction, ReturningTransaction), ReturnError> {
    if borrowing.status == BorrowStatus::Returned {
        return Err(ReturnError::AlreadyReturned);
    }
    if return_date < borrowing.borrow_date {
        return Err(ReturnError::ReturnBeforeBorrow);
    }

    let late_days = fine::late_days(borrowing.due_date, return_date);
    let fine_amount = fine::calculate_fine(late_days, policy.fine_per_day);
    let payment_status = if fine_amount > Decimal::ZERO {
        PaymentStatus::Unpaid
    } else {
        PaymentStatus::Paid
    };

    let closed = BorrowingTransaction {
        status: BorrowStatus::Returned,
        ..borrowing.clone()
    };
    let returning = ReturningTransaction {
        return_id: ReturnId::new(),
        borrow_id: borrowing.borrow_id,
        return_date,
        late_days,
        fine_amount,
        payment_status,
        payment_method: None,
        payment_date: None,
        damage_recorded: false,
    };

    Ok((closed, returning))
}

/// Prices damage on a returned copy. Only one report per borrowing.
pub fn report_damage(
    returning: Option<&ReturningTransaction>,
    book: &Book,
    category: DamageCategory,
    notes: &str,
    damage_date: NaiveDate,
    reported_by: StaffId,
) -> Result<DamageRecord, DamageError> {
    let returning = returning.ok_or(DamageError::NotReturned)?;
    if returning.damage_recorded {
        return Err(DamageError::AlreadyRecorded);
    }
    let notes = notes.trim();
    if notes.is_empty() {
        return Err(DamageError::MissingNotes);
    }

    Ok(DamageRecord {
        damage_id: DamageId::new(),
        borrow_id: returning.borrow_id,
        category,
        notes: notes.to_string(),
        damage_date,
        book_value: book.book_value,
        damage_fine: damage::damage_fine(book.book_value, category),
        payment_status: PaymentStatus::Unpaid,
        payment_method: None,
        payment_date: None,
        reported_by,
    })
}

pub fn pay_late_fine(
    returning: &ReturningTransaction,
    method: PaymentMethod,
    paid_at: DateTime<Utc>,
) -> Result<ReturningTransaction, PaymentError> {
    if returning.payment_status.is_paid() {
        return Err(PaymentError::AlreadyPaid);
    }
    if returning.fine_amount <= Decimal::ZERO {
        return Err(PaymentError::NothingOwed);
    }
    Ok(ReturningTransaction {
        payment_status: PaymentStatus::Paid,
        payment_method: Some(method),
        payment_date: Some(paid_at),
        ..returning.clone()
    })
}

pub fn pay_damage_fine(
    record: &DamageRecord,
    method: PaymentMethod,
    paid_at: DateTime<Utc>,
) -> Result<DamageRecord, PaymentError> {
    if record.payment_status.is_paid() {
        return Err(PaymentError::AlreadyPaid);
    }
    Ok(DamageRecord {
        payment_status: PaymentStatus::Paid,
        payment_method: Some(method),
        payment_date: Some(paid_at),
        ..record.clone()
    })
}
