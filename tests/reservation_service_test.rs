use chrono::{DateTime, Duration, Utc};
use library_circulation::application::{LibraryError, members, reservations, time_control};
use library_circulation::domain::{
    Book, BorrowStatus, MemberStatus, Principal, ReservationStatus, commands::*,
};
use rust_decimal_macros::dec;

mod common;

use common::{TestLibrary, as_member, at, member_details};

fn reserve(book: &Book) -> ReserveBook {
    ReserveBook {
        book_id: book.book_id,
    }
}

// ============================================================================
// Placing holds
// ============================================================================

#[tokio::test]
async fn test_reservation_holds_one_unit() {
    let lib = TestLibrary::new(at(2024, 3, 1, 10));
    let book = lib.add_book("Dune", 2, dec!(100000)).await;
    let member = lib.add_member("Ana").await;

    let reservation = reservations::reserve_book(&lib.deps, &as_member(&member), reserve(&book))
        .await
        .unwrap();

    assert_eq!(reservation.status, ReservationStatus::Pending);
    assert_eq!(reservation.code.as_str().len(), 4);
    assert_eq!(reservation.pickup_deadline, at(2024, 3, 2, 10));

    let stored = lib.book(&book).await;
    assert_eq!(stored.stock, 2);
    assert_eq!(stored.reserved_stock, 1);
    assert_eq!(stored.available(), 1);
}

#[tokio::test]
async fn test_second_pending_reservation_for_same_book_is_rejected() {
    let lib = TestLibrary::new(at(2024, 3, 1, 10));
    let book = lib.add_book("Dune", 5, dec!(100000)).await;
    let member = lib.add_member("Ana").await;

    reservations::reserve_book(&lib.deps, &as_member(&member), reserve(&book))
        .await
        .unwrap();
    let again = reservations::reserve_book(&lib.deps, &as_member(&member), reserve(&book)).await;

    assert!(matches!(again, Err(LibraryError::DuplicateReservation)));
    assert_eq!(lib.book(&book).await.reserved_stock, 1);
}

#[tokio::test]
async fn test_reservation_requires_available_copy() {
    let lib = TestLibrary::new(at(2024, 3, 1, 10));
    let book = lib.add_book("Dune", 1, dec!(100000)).await;
    let first = lib.add_member("Ana").await;
    let second = lib.add_member("Budi").await;

    reservations::reserve_book(&lib.deps, &as_member(&first), reserve(&book))
        .await
        .unwrap();
    let result = reservations::reserve_book(&lib.deps, &as_member(&second), reserve(&book)).await;

    assert!(matches!(result, Err(LibraryError::OutOfStock)));
}

#[tokio::test]
async fn test_suspended_member_cannot_reserve() {
    let lib = TestLibrary::new(at(2024, 3, 1, 10));
    let book = lib.add_book("Dune", 1, dec!(100000)).await;
    let member = lib.add_member("Ana").await;

    let mut details = member_details("Ana");
    details.status = Some(MemberStatus::Suspended);
    members::edit_member(&lib.deps, &lib.staff, member.member_id, details)
        .await
        .unwrap();

    let result = reservations::reserve_book(&lib.deps, &as_member(&member), reserve(&book)).await;
    assert!(matches!(result, Err(LibraryError::MemberSuspended)));
}

#[tokio::test]
async fn test_staff_cannot_reserve() {
    let lib = TestLibrary::new(at(2024, 3, 1, 10));
    let book = lib.add_book("Dune", 1, dec!(100000)).await;

    let result = reservations::reserve_book(&lib.deps, &lib.staff, reserve(&book)).await;
    assert!(matches!(result, Err(LibraryError::AccessDenied(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reservations_never_oversell() {
    let lib = TestLibrary::new(at(2024, 3, 1, 10));
    let book = lib.add_book("Dune", 3, dec!(100000)).await;

    let mut callers = Vec::new();
    for i in 0..10 {
        callers.push(as_member(&lib.add_member(&format!("Reader {}", i)).await));
    }

    let attempts = callers.into_iter().map(|caller| {
        let deps = lib.deps.clone();
        let cmd = reserve(&book);
        tokio::spawn(async move { reservations::reserve_book(&deps, &caller, cmd).await })
    });
    let results = futures::future::join_all(attempts).await;

    let mut succeeded = 0;
    for result in results {
        match result.unwrap() {
            Ok(_) => succeeded += 1,
            Err(LibraryError::OutOfStock) => {}
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }

    assert_eq!(succeeded, 3);
    let stored = lib.book(&book).await;
    assert_eq!(stored.reserved_stock, 3);
    assert_eq!(stored.available(), 0);
}

// ============================================================================
// Collect and cancel
// ============================================================================

#[tokio::test]
async fn test_collect_turns_hold_into_borrowing() {
    let lib = TestLibrary::new(at(2024, 3, 1, 10));
    let book = lib.add_book("Dune", 2, dec!(100000)).await;
    let member = lib.add_member("Ana").await;
    let reservation = reservations::reserve_book(&lib.deps, &as_member(&member), reserve(&book))
        .await
        .unwrap();

    let found = reservations::find_by_code(
        &lib.deps,
        &lib.staff,
        &reservation.code.as_str().to_lowercase(),
    )
    .await
    .unwrap();
    assert_eq!(found.reservation_id, reservation.reservation_id);

    let (collected, borrowing) =
        reservations::collect_reservation(&lib.deps, &lib.staff, reservation.reservation_id)
            .await
            .unwrap();

    assert_eq!(collected.status, ReservationStatus::Collected);
    assert_eq!(borrowing.reservation_id, Some(reservation.reservation_id));
    assert_eq!(borrowing.status, BorrowStatus::Borrowed);
    assert_eq!(borrowing.due_date - borrowing.borrow_date, Duration::days(14));

    let stored = lib.book(&book).await;
    assert_eq!(stored.stock, 1);
    assert_eq!(stored.reserved_stock, 0);

    let again =
        reservations::collect_reservation(&lib.deps, &lib.staff, reservation.reservation_id).await;
    assert!(matches!(again, Err(LibraryError::InvalidState(_))));
}

#[tokio::test]
async fn test_code_lookup_errors() {
    let lib = TestLibrary::new(at(2024, 3, 1, 10));
    let book = lib.add_book("Dune", 1, dec!(100000)).await;
    let member = lib.add_member("Ana").await;
    let reservation = reservations::reserve_book(&lib.deps, &as_member(&member), reserve(&book))
        .await
        .unwrap();

    let malformed = reservations::find_by_code(&lib.deps, &lib.staff, "AB-1").await;
    assert!(matches!(malformed, Err(LibraryError::InvalidInput(_))));

    let other = if reservation.code.as_str() == "ZZZZ" { "YYYY" } else { "ZZZZ" };
    let unknown = reservations::find_by_code(&lib.deps, &lib.staff, other).await;
    assert!(matches!(unknown, Err(LibraryError::ReservationNotFound)));

    let by_member = reservations::find_by_code(
        &lib.deps,
        &as_member(&member),
        reservation.code.as_str(),
    )
    .await;
    assert!(matches!(by_member, Err(LibraryError::AccessDenied(_))));
}

#[tokio::test]
async fn test_only_owner_or_staff_may_cancel() {
    let lib = TestLibrary::new(at(2024, 3, 1, 10));
    let book = lib.add_book("Dune", 1, dec!(100000)).await;
    let owner = lib.add_member("Ana").await;
    let stranger = lib.add_member("Budi").await;
    let reservation = reservations::reserve_book(&lib.deps, &as_member(&owner), reserve(&book))
        .await
        .unwrap();

    let denied = reservations::cancel_reservation(
        &lib.deps,
        &as_member(&stranger),
        reservation.reservation_id,
    )
    .await;
    assert!(matches!(denied, Err(LibraryError::AccessDenied(_))));

    let cancelled =
        reservations::cancel_reservation(&lib.deps, &as_member(&owner), reservation.reservation_id)
            .await
            .unwrap();
    assert_eq!(cancelled.status, ReservationStatus::Cancelled);
    assert_eq!(lib.book(&book).await.reserved_stock, 0);

    let twice =
        reservations::cancel_reservation(&lib.deps, &lib.staff, reservation.reservation_id).await;
    assert!(matches!(twice, Err(LibraryError::InvalidState(_))));
}

// ============================================================================
// Expiry sweep
// ============================================================================

#[tokio::test]
async fn test_expiry_sweep_releases_overdue_holds() {
    let lib = TestLibrary::new(at(2024, 3, 1, 10));
    let book = lib.add_book("Dune", 3, dec!(100000)).await;
    let ana = lib.add_member("Ana").await;
    let budi = lib.add_member("Budi").await;

    let first = reservations::reserve_book(&lib.deps, &as_member(&ana), reserve(&book))
        .await
        .unwrap();
    lib.wall.advance(Duration::hours(12));
    reservations::reserve_book(&lib.deps, &as_member(&budi), reserve(&book))
        .await
        .unwrap();
    assert_eq!(lib.book(&book).await.reserved_stock, 2);

    // Only the first hold is past its deadline
    lib.wall.advance(Duration::hours(13));
    assert_eq!(
        reservations::expire_overdue_reservations(&lib.deps)
            .await
            .unwrap(),
        1
    );
    assert_eq!(lib.book(&book).await.reserved_stock, 1);

    let late_pickup =
        reservations::collect_reservation(&lib.deps, &lib.staff, first.reservation_id).await;
    assert!(matches!(late_pickup, Err(LibraryError::InvalidState(_))));

    lib.wall.advance(Duration::hours(12));
    assert_eq!(
        reservations::expire_overdue_reservations(&lib.deps)
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        reservations::expire_overdue_reservations(&lib.deps)
            .await
            .unwrap(),
        0
    );
    assert_eq!(lib.book(&book).await.reserved_stock, 0);

    let history = reservations::list_member_reservations(&lib.deps, &lib.staff, ana.member_id)
        .await
        .unwrap();
    assert_eq!(history[0].reservation.status, ReservationStatus::Expired);
}

#[tokio::test]
async fn test_time_override_drives_expiry() {
    let lib = TestLibrary::new(at(2024, 3, 1, 10));
    let book = lib.add_book("Dune", 1, dec!(100000)).await;
    let member = lib.add_member("Ana").await;
    reservations::reserve_book(&lib.deps, &as_member(&member), reserve(&book))
        .await
        .unwrap();

    let status = time_control::advance_time(&lib.deps, &lib.staff, Duration::days(2)).unwrap();
    assert!(status.overridden);
    assert_eq!(status.effective_now, at(2024, 3, 3, 10));
    assert_eq!(status.real_now, at(2024, 3, 1, 10));

    let expired = reservations::trigger_expiry_sweep(&lib.deps, &lib.staff)
        .await
        .unwrap();
    assert_eq!(expired, 1);

    let reset = time_control::reset_time(&lib.deps, &lib.staff).unwrap();
    assert!(!reset.overridden);
    assert_eq!(reset.effective_now, at(2024, 3, 1, 10));
}

#[tokio::test]
async fn test_time_cannot_move_past_end_of_calendar() {
    let lib = TestLibrary::new(at(2024, 3, 1, 10));
    let book = lib.add_book("Dune", 1, dec!(100000)).await;
    let member = lib.add_member("Ana").await;

    time_control::set_time(&lib.deps, &lib.staff, DateTime::<Utc>::MAX_UTC).unwrap();

    let advanced = time_control::advance_time(&lib.deps, &lib.staff, Duration::hours(1));
    assert!(matches!(advanced, Err(LibraryError::InvalidInput(_))));

    // No pickup deadline fits after the last instant
    let result = reservations::reserve_book(&lib.deps, &as_member(&member), reserve(&book)).await;
    assert!(matches!(result, Err(LibraryError::InvalidInput(_))));
    assert_eq!(lib.book(&book).await.reserved_stock, 0);
}

#[tokio::test]
async fn test_members_cannot_control_time() {
    let lib = TestLibrary::new(at(2024, 3, 1, 10));
    let member = lib.add_member("Ana").await;
    let caller: Principal = as_member(&member);

    assert!(matches!(
        time_control::set_time(&lib.deps, &caller, at(2030, 1, 1, 0)),
        Err(LibraryError::AccessDenied(_))
    ));
    assert!(matches!(
        time_control::advance_time(&lib.deps, &lib.staff, Duration::hours(-1)),
        Err(LibraryError::InvalidInput(_))
    ));
}
