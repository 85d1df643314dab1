use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, NaiveDate};
use library_circulation::api::handlers::AppState;
use library_circulation::api::principal::{MEMBER_HEADER, STAFF_HEADER};
use library_circulation::api::router::create_router;
use library_circulation::api::types::*;
use library_circulation::application::circulation;
use library_circulation::domain::{
    Book, Member, MemberStatus, Principal, Reservation, ReturningTransaction, commands::*,
};
use rust_decimal_macros::dec;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

mod common;

use common::{TestLibrary, at, book_details, member_details};

// ============================================================================
// Helpers
// ============================================================================

fn setup_app(lib: &TestLibrary) -> axum::Router {
    create_router(Arc::new(AppState {
        service_deps: lib.deps.clone(),
    }))
}

fn identity(principal: &Principal) -> (&'static str, String) {
    match principal {
        Principal::Staff(id) => (STAFF_HEADER, id.to_string()),
        Principal::Member(id) => (MEMBER_HEADER, id.to_string()),
    }
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    caller: Option<&Principal>,
    body: Option<serde_json::Value>,
) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(principal) = caller {
        let (name, value) = identity(principal);
        builder = builder.header(name, value);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let lib = TestLibrary::new(at(2024, 3, 1, 10));
    let app = setup_app(&lib);

    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let lib = TestLibrary::new(at(2024, 3, 1, 10));
    let app = setup_app(&lib);

    let payload = serde_json::to_value(book_details("Dune", 1, dec!(100000))).unwrap();
    let (status, body) = send(&app, "POST", "/books", None, Some(payload)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.error, "UNAUTHENTICATED");
}

#[tokio::test]
async fn test_catalogue_crud_and_search() {
    let lib = TestLibrary::new(at(2024, 3, 1, 10));
    let app = setup_app(&lib);

    let payload = serde_json::to_value(book_details("Dune", 2, dec!(100000))).unwrap();
    let (status, body) = send(&app, "POST", "/books", Some(&lib.staff), Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED);
    let book: Book = serde_json::from_slice(&body).unwrap();
    assert_eq!(book.stock, 2);

    // Browsing needs no identity
    let (status, body) = send(&app, "GET", "/books?q=dune", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let found: Vec<Book> = serde_json::from_slice(&body).unwrap();
    assert_eq!(found.len(), 1);

    let (_, body) = send(&app, "GET", "/categories", None, None).await;
    let categories: Vec<String> = serde_json::from_slice(&body).unwrap();
    assert_eq!(categories, vec!["Science Fiction".to_string()]);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/books/{}", book.book_id),
        Some(&lib.staff),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "GET", &format!("/books/{}", book.book_id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.error, "BOOK_NOT_FOUND");
}

#[tokio::test]
async fn test_member_cannot_add_books() {
    let lib = TestLibrary::new(at(2024, 3, 1, 10));
    let app = setup_app(&lib);
    let member = lib.add_member("Ana").await;

    let payload = serde_json::to_value(book_details("Dune", 1, dec!(100000))).unwrap();
    let (status, _) = send(
        &app,
        "POST",
        "/books",
        Some(&Principal::Member(member.member_id)),
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_reserve_and_collect_over_http() {
    let lib = TestLibrary::new(at(2024, 3, 1, 10));
    let app = setup_app(&lib);
    let book = lib.add_book("Dune", 1, dec!(100000)).await;

    let (status, body) = send(
        &app,
        "POST",
        "/members",
        Some(&lib.staff),
        Some(serde_json::to_value(member_details("Ana")).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let member: Member = serde_json::from_slice(&body).unwrap();
    let caller = Principal::Member(member.member_id);

    let (status, body) = send(
        &app,
        "POST",
        "/reservations",
        Some(&caller),
        Some(json!({ "book_id": book.book_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let reservation: Reservation = serde_json::from_slice(&body).unwrap();

    // Second attempt conflicts
    let (status, body) = send(
        &app,
        "POST",
        "/reservations",
        Some(&caller),
        Some(json!({ "book_id": book.book_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.error, "DUPLICATE_RESERVATION");

    let (status, _) = send(&app, "GET", "/reservations", Some(&caller), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/reservation-codes/{}", reservation.code.as_str()),
        Some(&lib.staff),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let found: Reservation = serde_json::from_slice(&body).unwrap();
    assert_eq!(found.reservation_id, reservation.reservation_id);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/reservations/{}/collect", reservation.reservation_id),
        Some(&lib.staff),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let collected: CollectResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(collected.borrowing.member_id, member.member_id);

    // Return without a body defaults to today
    let (status, body) = send(
        &app,
        "POST",
        &format!("/borrowings/{}/return", collected.borrowing.borrow_id),
        Some(&lib.staff),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let returning: ReturningTransaction = serde_json::from_slice(&body).unwrap();
    assert_eq!(returning.late_days, 0);
}

#[tokio::test]
async fn test_browsing_runs_expiry_sweep() {
    let lib = TestLibrary::new(at(2024, 3, 1, 10));
    let app = setup_app(&lib);
    let book = lib.add_book("Dune", 1, dec!(100000)).await;
    let member = lib.add_member("Ana").await;
    let caller = Principal::Member(member.member_id);

    let (status, _) = send(
        &app,
        "POST",
        "/reservations",
        Some(&caller),
        Some(json!({ "book_id": book.book_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(lib.book(&book).await.reserved_stock, 1);

    lib.wall.advance(Duration::hours(25));

    let (status, body) = send(&app, "GET", &format!("/books/{}", book.book_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    let fresh: Book = serde_json::from_slice(&body).unwrap();
    assert_eq!(fresh.reserved_stock, 0);
}

/// Leaves `member` with a 25,000 late fine dated 2024-01-20
async fn overdue_fine(lib: &TestLibrary, member: &Member, book: &Book) {
    let borrowing = circulation::borrow_book(
        &lib.deps,
        &lib.staff,
        BorrowBook {
            member_id: member.member_id,
            book_id: book.book_id,
            borrow_date: Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            due_date: Some(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()),
        },
    )
    .await
    .unwrap();
    circulation::return_book(
        &lib.deps,
        &lib.staff,
        ReturnBook {
            borrow_id: borrowing.borrow_id,
            return_date: Some(NaiveDate::from_ymd_opt(2024, 1, 20).unwrap()),
        },
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_member_with_overdue_fine_cannot_reserve() {
    let lib = TestLibrary::new(at(2024, 1, 1, 9));
    let app = setup_app(&lib);
    let book = lib.add_book("Dune", 2, dec!(100000)).await;
    let member = lib.add_member("Ana").await;
    overdue_fine(&lib, &member, &book).await;

    lib.wall.set(at(2024, 3, 1, 9));
    let caller = Principal::Member(member.member_id);

    let (status, body) = send(
        &app,
        "POST",
        "/reservations",
        Some(&caller),
        Some(json!({ "book_id": book.book_id })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.error, "MEMBER_SUSPENDED");

    assert_eq!(lib.member(member.member_id).await.status, MemberStatus::Suspended);
    assert_eq!(lib.book(&book).await.reserved_stock, 0);
}

#[tokio::test]
async fn test_browsing_suspends_member_with_overdue_fine() {
    let lib = TestLibrary::new(at(2024, 1, 1, 9));
    let app = setup_app(&lib);
    let book = lib.add_book("Dune", 1, dec!(100000)).await;
    let member = lib.add_member("Ana").await;
    overdue_fine(&lib, &member, &book).await;

    lib.wall.set(at(2024, 3, 1, 9));
    let (status, _) = send(&app, "GET", "/books", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lib.member(member.member_id).await.status, MemberStatus::Suspended);
}

#[tokio::test]
async fn test_account_view_suspends_once() {
    let lib = TestLibrary::new(at(2024, 1, 1, 9));
    let app = setup_app(&lib);
    let book = lib.add_book("Dune", 1, dec!(100000)).await;
    let member = lib.add_member("Ana").await;
    overdue_fine(&lib, &member, &book).await;
    let caller = Principal::Member(member.member_id);
    let uri = format!("/members/{}/account", member.member_id);

    // 13 days after the fine nothing happens yet
    lib.wall.set(at(2024, 2, 2, 9));
    let (status, body) = send(&app, "GET", &uri, Some(&caller), None).await;
    assert_eq!(status, StatusCode::OK);
    let account: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(account["member"]["status"], json!("active"));
    assert_eq!(account["penalties"].as_array().unwrap().len(), 0);

    lib.wall.set(at(2024, 3, 1, 9));
    for _ in 0..2 {
        let (status, body) = send(&app, "GET", &uri, Some(&caller), None).await;
        assert_eq!(status, StatusCode::OK);
        let account: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(account["member"]["status"], json!("suspended"));
        assert_eq!(account["penalties"].as_array().unwrap().len(), 1);
    }
}

#[tokio::test]
async fn test_advance_past_end_of_calendar_is_bad_request() {
    let lib = TestLibrary::new(at(2024, 3, 1, 10));
    let app = setup_app(&lib);

    let (status, body) = send(
        &app,
        "POST",
        "/time/advance",
        Some(&lib.staff),
        Some(json!({ "days": 100_000_000 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.error, "INVALID_INPUT");
}

#[tokio::test]
async fn test_time_control_endpoints() {
    let lib = TestLibrary::new(at(2024, 3, 1, 10));
    let app = setup_app(&lib);

    let (status, body) = send(
        &app,
        "POST",
        "/time/advance",
        Some(&lib.staff),
        Some(json!({ "days": 1, "hours": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let time: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(time["overridden"], json!(true));
    assert_eq!(time["effective_now"], json!("2024-03-02T12:00:00Z"));

    let (status, body) = send(&app, "POST", "/time/reset", Some(&lib.staff), None).await;
    assert_eq!(status, StatusCode::OK);
    let time: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(time["overridden"], json!(false));
}
