use crate::domain::{
    self, BorrowingTransaction, MemberId, Principal, Reservation, ReservationCode,
    ReservationError, ReservationId, commands::*,
};
use crate::ports::{HoldOutcome, ReservationEntry};

use super::{LibraryError, Result, ServiceDependencies, load_book, load_member};

/// Attempts at drawing a code that no stored reservation uses
const CODE_ATTEMPTS: usize = 32;

fn draw_code() -> ReservationCode {
    ReservationCode::generate(&mut rand::thread_rng())
}

async fn load_reservation(
    deps: &ServiceDependencies,
    reservation_id: ReservationId,
) -> Result<Reservation> {
    deps.reservations
        .get_by_id(reservation_id)
        .await
        .map_err(LibraryError::Storage)?
        .ok_or(LibraryError::ReservationNotFound)
}

async fn unused_code(deps: &ServiceDependencies) -> Result<ReservationCode> {
    for _ in 0..CODE_ATTEMPTS {
        let code = draw_code();
        let taken = deps
            .reservations
            .code_exists(&code)
            .await
            .map_err(LibraryError::Storage)?;
        if !taken {
            return Ok(code);
        }
    }
    Err(LibraryError::InvalidState(
        "could not allocate a reservation code".to_string(),
    ))
}

/// Reserves a copy for pickup (members only)
///
/// Business rules:
/// - the member is active
/// - an unreserved copy exists
/// - no other pending reservation by this member for this book
///
/// The hold is placed atomically with the stock guard; a code collision
/// between the existence check and the insert just draws again.
pub async fn reserve_book(
    deps: &ServiceDependencies,
    principal: &Principal,
    cmd: ReserveBook,
) -> Result<Reservation> {
    let member_id = principal.require_member()?;

    let member = load_member(deps, member_id).await?;
    let book = load_book(deps, cmd.book_id).await?;
    let has_pending = deps
        .reservations
        .has_pending(member_id, cmd.book_id)
        .await
        .map_err(LibraryError::Storage)?;

    for _ in 0..CODE_ATTEMPTS {
        let code = unused_code(deps).await?;
        let reservation = domain::reserve_book(
            &member,
            &book,
            has_pending,
            code,
            deps.clock.now(),
            &deps.policy,
        )?;

        match deps
            .reservations
            .hold(&reservation)
            .await
            .map_err(LibraryError::Storage)?
        {
            HoldOutcome::Held => {
                tracing::info!(
                    reservation_id = %reservation.reservation_id,
                    code = reservation.code.as_str(),
                    member_id = %member_id,
                    book_id = %reservation.book_id,
                    pickup_deadline = %reservation.pickup_deadline,
                    "book reserved"
                );
                return Ok(reservation);
            }
            HoldOutcome::StockExhausted => return Err(ReservationError::NoStockAvailable.into()),
            HoldOutcome::DuplicatePending => {
                return Err(ReservationError::DuplicatePending.into());
            }
            HoldOutcome::CodeTaken => {
                tracing::debug!(code = reservation.code.as_str(), "reservation code collided");
            }
        }
    }

    Err(LibraryError::InvalidState(
        "could not allocate a reservation code".to_string(),
    ))
}

/// Hands a reserved copy over and opens its borrowing (staff only)
pub async fn collect_reservation(
    deps: &ServiceDependencies,
    principal: &Principal,
    reservation_id: ReservationId,
) -> Result<(Reservation, BorrowingTransaction)> {
    principal.require_staff()?;

    let reservation = load_reservation(deps, reservation_id).await?;
    let (collected, borrowing) = domain::collect_reservation(
        &reservation,
        deps.clock.now(),
        deps.clock.today(),
        &deps.policy,
    )?;

    let saved = deps
        .reservations
        .collect(&collected, &borrowing)
        .await
        .map_err(LibraryError::Storage)?;
    if !saved {
        return Err(ReservationError::NotPending("collect").into());
    }

    tracing::info!(
        reservation_id = %reservation_id,
        borrow_id = %borrowing.borrow_id,
        due_date = %borrowing.due_date,
        "reservation collected"
    );
    Ok((collected, borrowing))
}

/// Cancels a pending reservation. Members cancel their own; staff any.
pub async fn cancel_reservation(
    deps: &ServiceDependencies,
    principal: &Principal,
    reservation_id: ReservationId,
) -> Result<Reservation> {
    let reservation = load_reservation(deps, reservation_id).await?;
    principal.require_access_to(reservation.member_id)?;

    let cancelled = domain::cancel_reservation(&reservation, deps.clock.now())?;
    let saved = deps
        .reservations
        .release(&cancelled)
        .await
        .map_err(LibraryError::Storage)?;
    if !saved {
        return Err(ReservationError::NotPending("cancel").into());
    }

    tracing::info!(reservation_id = %reservation_id, "reservation cancelled");
    Ok(cancelled)
}

/// Looks a reservation up by its pickup code (staff only)
pub async fn find_by_code(
    deps: &ServiceDependencies,
    principal: &Principal,
    raw_code: &str,
) -> Result<Reservation> {
    principal.require_staff()?;

    let code = ReservationCode::parse(raw_code).map_err(LibraryError::InvalidInput)?;
    deps.reservations
        .get_by_code(&code)
        .await
        .map_err(LibraryError::Storage)?
        .ok_or(LibraryError::ReservationNotFound)
}

/// Expires every pending reservation past its pickup deadline and gives the
/// held copies back. Returns how many were expired.
///
/// Safe to run concurrently: each release is guarded on the reservation
/// still being pending, so a unit is never returned twice.
pub async fn expire_overdue_reservations(deps: &ServiceDependencies) -> Result<usize> {
    let now = deps.clock.now();
    let overdue = deps
        .reservations
        .find_overdue(now)
        .await
        .map_err(LibraryError::Storage)?;

    let mut expired = 0;
    for reservation in &overdue {
        let Ok(expired_reservation) = domain::expire_reservation(reservation, now) else {
            continue;
        };
        let released = deps
            .reservations
            .release(&expired_reservation)
            .await
            .map_err(LibraryError::Storage)?;
        if released {
            expired += 1;
            tracing::info!(
                reservation_id = %reservation.reservation_id,
                book_id = %reservation.book_id,
                "reservation expired"
            );
        }
    }

    tracing::debug!(candidates = overdue.len(), expired, "reservation expiry sweep finished");
    Ok(expired)
}

/// Pending pickups, earliest deadline first (staff only)
pub async fn list_pending(
    deps: &ServiceDependencies,
    principal: &Principal,
) -> Result<Vec<ReservationEntry>> {
    principal.require_staff()?;
    deps.reservations
        .list_pending()
        .await
        .map_err(LibraryError::Storage)
}

pub async fn list_member_reservations(
    deps: &ServiceDependencies,
    principal: &Principal,
    member_id: MemberId,
) -> Result<Vec<ReservationEntry>> {
    principal.require_access_to(member_id)?;
    deps.reservations
        .list_for_member(member_id)
        .await
        .map_err(LibraryError::Storage)
}

/// Manual expiry sweep (staff only)
pub async fn trigger_expiry_sweep(
    deps: &ServiceDependencies,
    principal: &Principal,
) -> Result<usize> {
    principal.require_staff()?;
    expire_overdue_reservations(deps).await
}
