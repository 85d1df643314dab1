//! Runs the use cases against PostgreSQL.
//!
//! Needs `DATABASE_URL`; run with `cargo test -- --ignored`.

use chrono::{Duration, NaiveDate};
use library_circulation::adapters::clock::{FixedClock, OverridableClock};
use library_circulation::adapters::postgres::{
    PostgresBookRepository, PostgresCirculationStore, PostgresMemberRepository,
    PostgresReservationStore, PostgresSuspensionStore,
};
use library_circulation::application::{
    LibraryError, ServiceDependencies, account, catalog, circulation, members, payments,
    reservations, suspension,
};
use library_circulation::domain::{
    Book, BorrowStatus, CirculationPolicy, DamageCategory, Member, MemberStatus, PaymentMethod,
    PaymentStatus, Principal, ReservationStatus, StaffId, commands::*,
};
use rust_decimal_macros::dec;
use serial_test::serial;
use sqlx::PgPool;
use std::sync::Arc;

mod common;

use common::{at, book_details, member_details};

struct PgLibrary {
    deps: ServiceDependencies,
    wall: Arc<FixedClock>,
    staff: Principal,
}

async fn setup(pool: &PgPool) -> PgLibrary {
    common::cleanup_database(pool).await;

    let wall = Arc::new(FixedClock::new(at(2024, 1, 1, 9)));
    let clock = Arc::new(OverridableClock::new(wall.clone()));
    let deps = ServiceDependencies {
        clock: clock.clone(),
        time_control: clock,
        policy: CirculationPolicy::default(),
        books: Arc::new(PostgresBookRepository::new(pool.clone())),
        members: Arc::new(PostgresMemberRepository::new(pool.clone())),
        circulation: Arc::new(PostgresCirculationStore::new(pool.clone())),
        reservations: Arc::new(PostgresReservationStore::new(pool.clone())),
        suspensions: Arc::new(PostgresSuspensionStore::new(pool.clone())),
    };

    PgLibrary {
        deps,
        wall,
        staff: Principal::Staff(StaffId::new()),
    }
}

impl PgLibrary {
    async fn book(&self, title: &str, stock: i32) -> Book {
        catalog::add_book(&self.deps, &self.staff, book_details(title, stock, dec!(100000)))
            .await
            .unwrap()
    }

    async fn member(&self, name: &str) -> Member {
        members::add_member(&self.deps, &self.staff, member_details(name))
            .await
            .unwrap()
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_postgres_circulation_cycle() {
    let pool = common::create_test_pool().await;
    let lib = setup(&pool).await;
    let book = lib.book("Dune", 1).await;
    let member = lib.member("Ana").await;

    let borrowing = circulation::borrow_book(
        &lib.deps,
        &lib.staff,
        BorrowBook {
            member_id: member.member_id,
            book_id: book.book_id,
            borrow_date: None,
            due_date: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(
        catalog::get_book(&lib.deps, book.book_id).await.unwrap().stock,
        0
    );

    lib.wall.set(at(2024, 1, 20, 9));
    let returning = circulation::return_book(
        &lib.deps,
        &lib.staff,
        ReturnBook {
            borrow_id: borrowing.borrow_id,
            return_date: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(returning.return_date, date(2024, 1, 20));
    assert_eq!(returning.fine_amount, dec!(25000));

    let damage = circulation::report_damage(
        &lib.deps,
        &lib.staff,
        ReportDamage {
            borrow_id: borrowing.borrow_id,
            category: DamageCategory::TornPages,
            notes: "pages torn".to_string(),
        },
    )
    .await
    .unwrap();
    assert_eq!(damage.damage_fine, dec!(20000));

    lib.wall.set(at(2024, 2, 10, 9));
    assert_eq!(suspension::run_suspension_sweep(&lib.deps).await.unwrap(), 1);
    assert_eq!(suspension::run_suspension_sweep(&lib.deps).await.unwrap(), 0);

    let summary = account::account_summary(&lib.deps, &lib.staff, member.member_id)
        .await
        .unwrap();
    assert_eq!(summary.member.status, MemberStatus::Suspended);
    assert_eq!(summary.history.len(), 1);
    assert_eq!(summary.history[0].borrowing.status, BorrowStatus::Returned);
    assert_eq!(summary.penalties.len(), 1);
    assert_eq!(summary.penalties[0].total_unpaid_fines, dec!(25000));
    assert_eq!(summary.penalties[0].total_damage_fines, dec!(20000));

    let caller = Principal::Member(member.member_id);
    payments::pay_late_fine(
        &lib.deps,
        &caller,
        PayLateFine {
            return_id: returning.return_id,
            method: PaymentMethod::Cash,
        },
    )
    .await
    .unwrap();
    payments::pay_damage_fine(
        &lib.deps,
        &caller,
        PayDamageFine {
            damage_id: damage.damage_id,
            method: PaymentMethod::Transfer,
        },
    )
    .await
    .unwrap();
    let paid = payments::pay_penalty(
        &lib.deps,
        &caller,
        PayPenalty {
            penalty_id: summary.penalties[0].penalty_id,
            method: PaymentMethod::EWallet,
        },
    )
    .await
    .unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);

    let member = members::get_member(&lib.deps, &lib.staff, member.member_id)
        .await
        .unwrap();
    assert_eq!(member.status, MemberStatus::Active);
    assert_eq!(suspension::run_suspension_sweep(&lib.deps).await.unwrap(), 0);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_postgres_concurrent_reservations() {
    let pool = common::create_test_pool().await;
    let lib = setup(&pool).await;
    let book = lib.book("Dune", 2).await;

    let mut callers = Vec::new();
    for i in 0..6 {
        callers.push(Principal::Member(
            lib.member(&format!("Reader {}", i)).await.member_id,
        ));
    }

    let attempts = callers.into_iter().map(|caller| {
        let deps = lib.deps.clone();
        let cmd = ReserveBook {
            book_id: book.book_id,
        };
        tokio::spawn(async move { reservations::reserve_book(&deps, &caller, cmd).await })
    });
    let results = futures::future::join_all(attempts).await;

    let succeeded = results
        .into_iter()
        .map(|r| r.unwrap())
        .filter(|r| r.is_ok())
        .count();
    assert_eq!(succeeded, 2);

    let stored = catalog::get_book(&lib.deps, book.book_id).await.unwrap();
    assert_eq!(stored.reserved_stock, 2);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_postgres_expiry_and_delete_guards() {
    let pool = common::create_test_pool().await;
    let lib = setup(&pool).await;
    let book = lib.book("Dune", 1).await;
    let member = lib.member("Ana").await;
    let caller = Principal::Member(member.member_id);

    let reservation = reservations::reserve_book(
        &lib.deps,
        &caller,
        ReserveBook {
            book_id: book.book_id,
        },
    )
    .await
    .unwrap();

    let blocked = members::delete_member(&lib.deps, &lib.staff, member.member_id).await;
    assert!(matches!(blocked, Err(LibraryError::InUse(_))));

    lib.wall.advance(Duration::hours(25));
    assert_eq!(
        reservations::expire_overdue_reservations(&lib.deps)
            .await
            .unwrap(),
        1
    );

    let entries = reservations::list_member_reservations(&lib.deps, &caller, member.member_id)
        .await
        .unwrap();
    assert_eq!(entries[0].reservation.reservation_id, reservation.reservation_id);
    assert_eq!(entries[0].reservation.status, ReservationStatus::Expired);
    assert_eq!(
        catalog::get_book(&lib.deps, book.book_id)
            .await
            .unwrap()
            .reserved_stock,
        0
    );

    members::delete_member(&lib.deps, &lib.staff, member.member_id)
        .await
        .unwrap();
    catalog::delete_book(&lib.deps, &lib.staff, book.book_id)
        .await
        .unwrap();
}
