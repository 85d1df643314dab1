use crate::domain::{
    BookId, BorrowingTransaction, MemberId, Reservation, ReservationCode, ReservationId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Result;

/// Result of trying to place a hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldOutcome {
    Held,
    /// Every copy is already lent or held
    StockExhausted,
    /// The member already holds a pending reservation for the book
    DuplicatePending,
    /// The pickup code collided with an existing reservation
    CodeTaken,
}

/// A reservation joined with display names
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservationEntry {
    pub reservation: Reservation,
    pub book_title: String,
    pub member_name: String,
}

/// Reservation persistence.
///
/// A pending reservation always accounts for exactly one unit of its book's
/// `reserved_stock`; every method keeps the two in step within one
/// transaction.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Inserts the reservation and raises `reserved_stock` by one.
    ///
    /// The stock guard is evaluated by the database, so N free copies admit
    /// exactly N concurrent holds.
    async fn hold(&self, reservation: &Reservation) -> Result<HoldOutcome>;

    async fn has_pending(&self, member_id: MemberId, book_id: BookId) -> Result<bool>;

    async fn code_exists(&self, code: &ReservationCode) -> Result<bool>;

    async fn get_by_id(&self, reservation_id: ReservationId) -> Result<Option<Reservation>>;

    async fn get_by_code(&self, code: &ReservationCode) -> Result<Option<Reservation>>;

    /// Marks the reservation collected, inserts the borrowing and takes the
    /// held copy off the shelf (`stock` and `reserved_stock` both drop).
    /// Guarded on the reservation still being pending.
    async fn collect(
        &self,
        collected: &Reservation,
        borrowing: &BorrowingTransaction,
    ) -> Result<bool>;

    /// Writes a cancelled or expired reservation and gives its unit back.
    /// Guarded on the reservation still being pending.
    async fn release(&self, reservation: &Reservation) -> Result<bool>;

    /// Pending reservations whose pickup deadline is before `now`
    async fn find_overdue(&self, now: DateTime<Utc>) -> Result<Vec<Reservation>>;

    /// Pending reservations, earliest deadline first
    async fn list_pending(&self) -> Result<Vec<ReservationEntry>>;

    /// A member's reservations, newest first
    async fn list_for_member(&self, member_id: MemberId) -> Result<Vec<ReservationEntry>>;
}
