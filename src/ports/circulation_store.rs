use crate::domain::{
    BorrowId, BorrowStatus, BorrowingTransaction, DamageId, DamageRecord, MemberId,
    PaymentStatus, ReturnId, ReturningTransaction,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;

use super::Result;

/// A borrowing joined with its return (if any) and display names
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoanRecord {
    pub borrowing: BorrowingTransaction,
    pub returning: Option<ReturningTransaction>,
    pub book_title: String,
    pub member_name: String,
}

/// A damage record joined with the borrowing's member and book
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DamageEntry {
    pub record: DamageRecord,
    pub member_id: MemberId,
    pub member_name: String,
    pub book_title: String,
}

/// Borrowing, return, damage and fine persistence.
///
/// Every method that touches more than one row runs in a single
/// transaction. Methods returning `bool` report whether their guard held;
/// `false` means nothing was written.
#[async_trait]
pub trait CirculationStore: Send + Sync {
    /// Inserts the borrowing and takes one copy off the shelf.
    ///
    /// Guarded on the member being active and the book having an unreserved
    /// copy.
    async fn open_borrowing(&self, borrowing: &BorrowingTransaction) -> Result<bool>;

    /// Inserts the return, marks the borrowing returned and puts the copy
    /// back. Guarded on the borrowing still being `borrowed`.
    async fn close_borrowing(
        &self,
        borrowing: &BorrowingTransaction,
        returning: &ReturningTransaction,
    ) -> Result<bool>;

    async fn get_borrowing(&self, borrow_id: BorrowId) -> Result<Option<BorrowingTransaction>>;

    async fn get_returning_for(&self, borrow_id: BorrowId) -> Result<Option<ReturningTransaction>>;

    /// Return row together with the member who owes its fine
    async fn get_returning(
        &self,
        return_id: ReturnId,
    ) -> Result<Option<(ReturningTransaction, MemberId)>>;

    /// Inserts the damage record and flags the return. Guarded on the
    /// return having no damage recorded yet.
    async fn record_damage(&self, record: &DamageRecord) -> Result<bool>;

    /// Damage row together with the member who owes its fine
    async fn get_damage(&self, damage_id: DamageId) -> Result<Option<(DamageRecord, MemberId)>>;

    /// Guarded on the fine still being unpaid
    async fn settle_late_fine(&self, returning: &ReturningTransaction) -> Result<bool>;

    /// Guarded on the fine still being unpaid
    async fn settle_damage_fine(&self, record: &DamageRecord) -> Result<bool>;

    /// Every borrowing of a member, newest first
    async fn member_loans(&self, member_id: MemberId) -> Result<Vec<LoanRecord>>;

    /// Every damage record charged to a member, newest first
    async fn member_damages(&self, member_id: MemberId) -> Result<Vec<DamageEntry>>;

    /// Borrowings with `from <= borrow_date <= to`, newest first
    async fn loans_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        status: Option<BorrowStatus>,
    ) -> Result<Vec<LoanRecord>>;

    /// All damage records, newest first
    async fn damage_records(&self, payment_status: Option<PaymentStatus>)
    -> Result<Vec<DamageEntry>>;
}
