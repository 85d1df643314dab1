use crate::domain::{
    BookId, BorrowingTransaction, MemberId, Reservation, ReservationCode, ReservationId,
};
use crate::ports::{
    HoldOutcome, ReservationEntry, ReservationStore as ReservationStoreTrait, Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

use super::{invalid_data, parse_column, violates};

const CODE_KEY: &str = "reservations_code_key";
const ONE_PENDING_KEY: &str = "reservations_one_pending_key";

const RESERVATION_COLUMNS: &str = r#"
    r.reservation_id,
    r.code,
    r.member_id,
    r.book_id,
    r.reserved_at,
    r.pickup_deadline,
    r.status,
    r.updated_at
"#;

fn map_row_to_reservation(row: &PgRow) -> Result<Reservation> {
    let code: String = row.try_get("code")?;
    Ok(Reservation {
        reservation_id: ReservationId::from_uuid(row.try_get("reservation_id")?),
        code: ReservationCode::parse(&code).map_err(invalid_data)?,
        member_id: MemberId::from_uuid(row.try_get("member_id")?),
        book_id: BookId::from_uuid(row.try_get("book_id")?),
        reserved_at: row.try_get("reserved_at")?,
        pickup_deadline: row.try_get("pickup_deadline")?,
        status: parse_column(row, "status")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn map_row_to_entry(row: &PgRow) -> Result<ReservationEntry> {
    Ok(ReservationEntry {
        reservation: map_row_to_reservation(row)?,
        book_title: row.try_get("book_title")?,
        member_name: row.try_get("member_name")?,
    })
}

/// PostgreSQL reservations with their share of `books.reserved_stock`
pub struct ReservationStore {
    pool: PgPool,
}

impl ReservationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReservationStoreTrait for ReservationStore {
    /// The stock UPDATE runs first so concurrent holds on one book queue on
    /// its row lock and each sees the previous hold.
    async fn hold(&self, reservation: &Reservation) -> Result<HoldOutcome> {
        let mut tx = self.pool.begin().await?;

        let held = sqlx::query(
            r#"
            UPDATE books
            SET reserved_stock = reserved_stock + 1
            WHERE book_id = $1 AND stock - reserved_stock > 0
            "#,
        )
        .bind(reservation.book_id.value())
        .execute(&mut *tx)
        .await?;
        if held.rows_affected() != 1 {
            return Ok(HoldOutcome::StockExhausted);
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO reservations (
                reservation_id,
                code,
                member_id,
                book_id,
                reserved_at,
                pickup_deadline,
                status,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(reservation.reservation_id.value())
        .bind(reservation.code.as_str())
        .bind(reservation.member_id.value())
        .bind(reservation.book_id.value())
        .bind(reservation.reserved_at)
        .bind(reservation.pickup_deadline)
        .bind(reservation.status.as_str())
        .bind(reservation.updated_at)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {
                tx.commit().await?;
                Ok(HoldOutcome::Held)
            }
            Err(e) if violates(&e, ONE_PENDING_KEY) => Ok(HoldOutcome::DuplicatePending),
            Err(e) if violates(&e, CODE_KEY) => Ok(HoldOutcome::CodeTaken),
            Err(e) => Err(e.into()),
        }
    }

    async fn has_pending(&self, member_id: MemberId, book_id: BookId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM reservations
                WHERE member_id = $1 AND book_id = $2 AND status = 'pending'
            )
            "#,
        )
        .bind(member_id.value())
        .bind(book_id.value())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn code_exists(&self, code: &ReservationCode) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM reservations WHERE code = $1)")
                .bind(code.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn get_by_id(&self, reservation_id: ReservationId) -> Result<Option<Reservation>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM reservations r WHERE r.reservation_id = $1",
            RESERVATION_COLUMNS
        ))
        .bind(reservation_id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_reservation).transpose()
    }

    async fn get_by_code(&self, code: &ReservationCode) -> Result<Option<Reservation>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM reservations r WHERE r.code = $1",
            RESERVATION_COLUMNS
        ))
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_reservation).transpose()
    }

    async fn collect(
        &self,
        collected: &Reservation,
        borrowing: &BorrowingTransaction,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let flipped = sqlx::query(
            r#"
            UPDATE reservations
            SET status = $2, updated_at = $3
            WHERE reservation_id = $1 AND status = 'pending'
            "#,
        )
        .bind(collected.reservation_id.value())
        .bind(collected.status.as_str())
        .bind(collected.updated_at)
        .execute(&mut *tx)
        .await?;
        if flipped.rows_affected() != 1 {
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO borrowing_transactions (
                borrow_id,
                member_id,
                book_id,
                reservation_id,
                borrow_date,
                due_date,
                status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(borrowing.borrow_id.value())
        .bind(borrowing.member_id.value())
        .bind(borrowing.book_id.value())
        .bind(borrowing.reservation_id.map(|id| id.value()))
        .bind(borrowing.borrow_date)
        .bind(borrowing.due_date)
        .bind(borrowing.status.as_str())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE books
            SET stock = stock - 1, reserved_stock = reserved_stock - 1
            WHERE book_id = $1
            "#,
        )
        .bind(collected.book_id.value())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn release(&self, reservation: &Reservation) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let flipped = sqlx::query(
            r#"
            UPDATE reservations
            SET status = $2, updated_at = $3
            WHERE reservation_id = $1 AND status = 'pending'
            "#,
        )
        .bind(reservation.reservation_id.value())
        .bind(reservation.status.as_str())
        .bind(reservation.updated_at)
        .execute(&mut *tx)
        .await?;
        if flipped.rows_affected() != 1 {
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE books
            SET reserved_stock = GREATEST(reserved_stock - 1, 0)
            WHERE book_id = $1
            "#,
        )
        .bind(reservation.book_id.value())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn find_overdue(&self, now: DateTime<Utc>) -> Result<Vec<Reservation>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM reservations r
            WHERE r.status = 'pending' AND r.pickup_deadline < $1
            ORDER BY r.pickup_deadline ASC
            "#,
            RESERVATION_COLUMNS
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_reservation).collect()
    }

    async fn list_pending(&self) -> Result<Vec<ReservationEntry>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}, b.title AS book_title, m.name AS member_name
            FROM reservations r
            JOIN books b ON b.book_id = r.book_id
            JOIN members m ON m.member_id = r.member_id
            WHERE r.status = 'pending'
            ORDER BY r.pickup_deadline ASC
            "#,
            RESERVATION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_entry).collect()
    }

    async fn list_for_member(&self, member_id: MemberId) -> Result<Vec<ReservationEntry>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}, b.title AS book_title, m.name AS member_name
            FROM reservations r
            JOIN books b ON b.book_id = r.book_id
            JOIN members m ON m.member_id = r.member_id
            WHERE r.member_id = $1
            ORDER BY r.reserved_at DESC
            "#,
            RESERVATION_COLUMNS
        ))
        .bind(member_id.value())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_entry).collect()
    }
}
