use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{
    Book, BookId, BorrowId, BorrowStatus, BorrowingTransaction, CirculationPolicy, Member,
    MemberId, ReservationCode, ReservationError, ReservationId,
};

/// Reservation lifecycle. `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Collected,
    Expired,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Collected => "collected",
            ReservationStatus::Expired => "expired",
            ReservationStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ReservationStatus::Pending)
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReservationStatus::Pending),
            "collected" => Ok(ReservationStatus::Collected),
            "expired" => Ok(ReservationStatus::Expired),
            "cancelled" => Ok(ReservationStatus::Cancelled),
            _ => Err(format!("Invalid reservation status: {}", s)),
        }
    }
}

/// A copy held for a member until the pickup deadline.
///
/// While `Pending` the book's `reserved_stock` carries exactly one unit for
/// this reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub reservation_id: ReservationId,
    pub code: ReservationCode,
    pub member_id: MemberId,
    pub book_id: BookId,
    pub reserved_at: DateTime<Utc>,
    pub pickup_deadline: DateTime<Utc>,
    pub status: ReservationStatus,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Pending and past its pickup deadline
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status.is_pending() && self.pickup_deadline < now
    }

    fn require_pending(&self, action: &'static str) -> Result<(), ReservationError> {
        if self.status.is_pending() {
            Ok(())
        } else {
            Err(ReservationError::NotPending(action))
        }
    }

    fn transition(&self, status: ReservationStatus, at: DateTime<Utc>) -> Reservation {
        Reservation {
            status,
            updated_at: at,
            ..self.clone()
        }
    }
}

/// Pure function: place a reservation
///
/// Business rules:
/// - the member is active
/// - the book has an unreserved copy
/// - the member holds no other pending reservation for the book
pub fn reserve_book(
    member: &Member,
    book: &Book,
    has_pending_for_book: bool,
    code: ReservationCode,
    now: DateTime<Utc>,
    policy: &CirculationPolicy,
) -> Result<Reservation, ReservationError> {
    if !member.status.is_active() {
        return Err(ReservationError::MemberSuspended);
    }
    if has_pending_for_book {
        return Err(ReservationError::DuplicatePending);
    }
    if !book.is_available() {
        return Err(ReservationError::NoStockAvailable);
    }

    let pickup_deadline = now
        .checked_add_signed(policy.pickup_window())
        .ok_or(ReservationError::DateOutOfRange)?;

    Ok(Reservation {
        reservation_id: ReservationId::new(),
        code,
        member_id: member.member_id,
        book_id: book.book_id,
        reserved_at: now,
        pickup_deadline,
        status: ReservationStatus::Pending,
        updated_at: now,
    })
}

/// Pending -> Collected, producing the borrowing that replaces the hold.
pub fn collect_reservation(
    reservation: &Reservation,
    now: DateTime<Utc>,
    today: NaiveDate,
    policy: &CirculationPolicy,
) -> Result<(Reservation, BorrowingTransaction), ReservationError> {
    reservation.require_pending("collect")?;
    let due_date = today
        .checked_add_signed(policy.loan_period())
        .ok_or(ReservationError::DateOutOfRange)?;

    let borrowing = BorrowingTransaction {
        borrow_id: BorrowId::new(),
        member_id: reservation.member_id,
        book_id: reservation.book_id,
        reservation_id: Some(reservation.reservation_id),
        borrow_date: today,
        due_date,
        status: BorrowStatus::Borrowed,
    };

    Ok((
        reservation.transition(ReservationStatus::Collected, now),
        borrowing,
    ))
}

/// Pending -> Cancelled
pub fn cancel_reservation(
    reservation: &Reservation,
    now: DateTime<Utc>,
) -> Result<Reservation, ReservationError> {
    reservation.require_pending("cancel")?;
    Ok(reservation.transition(ReservationStatus::Cancelled, now))
}

/// Pending -> Expired, only once the pickup deadline has passed
pub fn expire_reservation(
    reservation: &Reservation,
    now: DateTime<Utc>,
) -> Result<Reservation, ReservationError> {
    reservation.require_pending("expire")?;
    if !reservation.is_overdue(now) {
        return Err(ReservationError::DeadlineNotReached);
    }
    Ok(reservation.transition(ReservationStatus::Expired, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BookDetails, MemberDetails, MemberStatus, add_book, register_member};
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn member() -> Member {
        register_member(
            MemberDetails {
                name: "Dewi".to_string(),
                email: "dewi@example.com".to_string(),
                phone: None,
                address: None,
                status: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn book(stock: i32, reserved: i32) -> Book {
        let mut book = add_book(
            BookDetails {
                title: "Cantik Itu Luka".to_string(),
                author: "Eka Kurniawan".to_string(),
                category: "Fiction".to_string(),
                isbn: None,
                book_value: dec!(120000),
                stock,
            },
            Utc::now(),
        )
        .unwrap();
        book.reserved_stock = reserved;
        book
    }

    fn code() -> ReservationCode {
        ReservationCode::parse("AB12").unwrap()
    }

    fn pending(now: DateTime<Utc>) -> Reservation {
        reserve_book(
            &member(),
            &book(1, 0),
            false,
            code(),
            now,
            &CirculationPolicy::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_reserve_sets_pickup_deadline() {
        let now = Utc::now();
        let r = pending(now);
        assert_eq!(r.status, ReservationStatus::Pending);
        assert_eq!(r.pickup_deadline, now + Duration::hours(24));
    }

    #[test]
    fn test_reserve_at_end_of_time_is_rejected() {
        let result = reserve_book(
            &member(),
            &book(1, 0),
            false,
            code(),
            DateTime::<Utc>::MAX_UTC,
            &CirculationPolicy::default(),
        );
        assert_eq!(result, Err(ReservationError::DateOutOfRange));
    }

    #[test]
    fn test_collect_on_last_calendar_day_is_rejected() {
        let now = Utc::now();
        let result = collect_reservation(
            &pending(now),
            now,
            NaiveDate::MAX,
            &CirculationPolicy::default(),
        );
        assert_eq!(result, Err(ReservationError::DateOutOfRange));
    }

    #[test]
    fn test_reserve_guards() {
        let policy = CirculationPolicy::default();
        let now = Utc::now();
        assert_eq!(
            reserve_book(&member(), &book(2, 2), false, code(), now, &policy),
            Err(ReservationError::NoStockAvailable)
        );
        assert_eq!(
            reserve_book(&member(), &book(2, 0), true, code(), now, &policy),
            Err(ReservationError::DuplicatePending)
        );
        let mut suspended = member();
        suspended.status = MemberStatus::Suspended;
        assert_eq!(
            reserve_book(&suspended, &book(2, 0), false, code(), now, &policy),
            Err(ReservationError::MemberSuspended)
        );
    }

    #[test]
    fn test_collect_creates_linked_borrowing() {
        let now = Utc::now();
        let today = now.date_naive();
        let r = pending(now);
        let (collected, borrowing) =
            collect_reservation(&r, now, today, &CirculationPolicy::default()).unwrap();
        assert_eq!(collected.status, ReservationStatus::Collected);
        assert_eq!(borrowing.reservation_id, Some(r.reservation_id));
        assert_eq!(borrowing.due_date, today + Duration::days(14));
        assert_eq!(borrowing.member_id, r.member_id);
    }

    #[test]
    fn test_terminal_states_reject_transitions() {
        let now = Utc::now();
        let cancelled = cancel_reservation(&pending(now), now).unwrap();
        assert_eq!(
            cancel_reservation(&cancelled, now),
            Err(ReservationError::NotPending("cancel"))
        );
        assert_eq!(
            collect_reservation(&cancelled, now, now.date_naive(), &CirculationPolicy::default()),
            Err(ReservationError::NotPending("collect"))
        );
        assert_eq!(
            expire_reservation(&cancelled, now + Duration::days(2)),
            Err(ReservationError::NotPending("expire"))
        );
    }

    #[test]
    fn test_expire_waits_for_deadline() {
        let now = Utc::now();
        let r = pending(now);
        assert_eq!(
            expire_reservation(&r, now + Duration::hours(24)),
            Err(ReservationError::DeadlineNotReached)
        );
        let expired = expire_reservation(&r, now + Duration::hours(25)).unwrap();
        assert_eq!(expired.status, ReservationStatus::Expired);
    }
}
