use crate::domain::{
    BookId, BorrowId, BorrowStatus, BorrowingTransaction, DamageId, DamageRecord, MemberId,
    PaymentStatus, ReservationId, ReturnId, ReturningTransaction, StaffId,
};
use crate::ports::{
    CirculationStore as CirculationStoreTrait, DamageEntry, LoanRecord, Result,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use super::{parse_column, parse_optional_column};

const LOAN_SELECT: &str = r#"
    SELECT
        bt.borrow_id,
        bt.member_id,
        bt.book_id,
        bt.reservation_id,
        bt.borrow_date,
        bt.due_date,
        bt.status,
        rt.return_id,
        rt.return_date,
        rt.late_days,
        rt.fine_amount,
        rt.payment_status,
        rt.payment_method,
        rt.payment_date,
        rt.damage_recorded,
        b.title AS book_title,
        m.name AS member_name
    FROM borrowing_transactions bt
    JOIN books b ON b.book_id = bt.book_id
    JOIN members m ON m.member_id = bt.member_id
    LEFT JOIN returning_transactions rt ON rt.borrow_id = bt.borrow_id
"#;

const DAMAGE_SELECT: &str = r#"
    SELECT
        d.damage_id,
        d.borrow_id,
        d.category,
        d.notes,
        d.damage_date,
        d.book_value,
        d.damage_fine,
        d.payment_status,
        d.payment_method,
        d.payment_date,
        d.reported_by,
        bt.member_id,
        m.name AS member_name,
        b.title AS book_title
    FROM book_damage_records d
    JOIN borrowing_transactions bt ON bt.borrow_id = d.borrow_id
    JOIN members m ON m.member_id = bt.member_id
    JOIN books b ON b.book_id = bt.book_id
"#;

fn map_row_to_borrowing(row: &PgRow) -> Result<BorrowingTransaction> {
    let reservation_id: Option<Uuid> = row.try_get("reservation_id")?;
    Ok(BorrowingTransaction {
        borrow_id: BorrowId::from_uuid(row.try_get("borrow_id")?),
        member_id: MemberId::from_uuid(row.try_get("member_id")?),
        book_id: BookId::from_uuid(row.try_get("book_id")?),
        reservation_id: reservation_id.map(ReservationId::from_uuid),
        borrow_date: row.try_get("borrow_date")?,
        due_date: row.try_get("due_date")?,
        status: parse_column(row, "status")?,
    })
}

/// Works on plain `returning_transactions` rows and on `LOAN_SELECT` rows;
/// yields `None` when the left join found no return.
fn map_row_to_returning(row: &PgRow) -> Result<Option<ReturningTransaction>> {
    let Some(return_id) = row.try_get::<Option<Uuid>, _>("return_id")? else {
        return Ok(None);
    };
    Ok(Some(ReturningTransaction {
        return_id: ReturnId::from_uuid(return_id),
        borrow_id: BorrowId::from_uuid(row.try_get("borrow_id")?),
        return_date: row.try_get("return_date")?,
        late_days: row.try_get("late_days")?,
        fine_amount: row.try_get("fine_amount")?,
        payment_status: parse_column(row, "payment_status")?,
        payment_method: parse_optional_column(row, "payment_method")?,
        payment_date: row.try_get("payment_date")?,
        damage_recorded: row.try_get("damage_recorded")?,
    }))
}

fn map_row_to_loan_record(row: &PgRow) -> Result<LoanRecord> {
    Ok(LoanRecord {
        borrowing: map_row_to_borrowing(row)?,
        returning: map_row_to_returning(row)?,
        book_title: row.try_get("book_title")?,
        member_name: row.try_get("member_name")?,
    })
}

fn map_row_to_damage(row: &PgRow) -> Result<DamageRecord> {
    Ok(DamageRecord {
        damage_id: DamageId::from_uuid(row.try_get("damage_id")?),
        borrow_id: BorrowId::from_uuid(row.try_get("borrow_id")?),
        category: parse_column(row, "category")?,
        notes: row.try_get("notes")?,
        damage_date: row.try_get("damage_date")?,
        book_value: row.try_get("book_value")?,
        damage_fine: row.try_get("damage_fine")?,
        payment_status: parse_column(row, "payment_status")?,
        payment_method: parse_optional_column(row, "payment_method")?,
        payment_date: row.try_get("payment_date")?,
        reported_by: StaffId::from_uuid(row.try_get("reported_by")?),
    })
}

fn map_row_to_damage_entry(row: &PgRow) -> Result<DamageEntry> {
    Ok(DamageEntry {
        record: map_row_to_damage(row)?,
        member_id: MemberId::from_uuid(row.try_get("member_id")?),
        member_name: row.try_get("member_name")?,
        book_title: row.try_get("book_title")?,
    })
}

/// PostgreSQL borrowing, return and fine records
pub struct CirculationStore {
    pool: PgPool,
}

impl CirculationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CirculationStoreTrait for CirculationStore {
    async fn open_borrowing(&self, borrowing: &BorrowingTransaction) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let taken = sqlx::query(
            r#"
            UPDATE books
            SET stock = stock - 1
            WHERE book_id = $1
              AND stock - reserved_stock > 0
              AND EXISTS (
                  SELECT 1 FROM members WHERE member_id = $2 AND status = 'active'
              )
            "#,
        )
        .bind(borrowing.book_id.value())
        .bind(borrowing.member_id.value())
        .execute(&mut *tx)
        .await?;
        if taken.rows_affected() != 1 {
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

        tx.commit().await?;
        Ok(true)
    }

    async fn close_borrowing(
        &self,
        borrowing: &BorrowingTransaction,
        returning: &ReturningTransaction,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let closed = sqlx::query(
            r#"
            UPDATE borrowing_transactions
            SET status = 'returned'
            WHERE borrow_id = $1 AND status = 'borrowed'
            "#,
        )
        .bind(borrowing.borrow_id.value())
        .execute(&mut *tx)
        .await?;
        if closed.rows_affected() != 1 {
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO returning_transactions (
                return_id,
                borrow_id,
                return_date,
                late_days,
                fine_amount,
                payment_status,
                payment_method,
                payment_date,
                damage_recorded
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(returning.return_id.value())
        .bind(returning.borrow_id.value())
        .bind(returning.return_date)
        .bind(returning.late_days)
        .bind(returning.fine_amount)
        .bind(returning.payment_status.as_str())
        .bind(returning.payment_method.map(|m| m.as_str()))
        .bind(returning.payment_date)
        .bind(returning.damage_recorded)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE books SET stock = stock + 1 WHERE book_id = $1")
            .bind(borrowing.book_id.value())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn get_borrowing(&self, borrow_id: BorrowId) -> Result<Option<BorrowingTransaction>> {
        let row = sqlx::query(
            r#"
            SELECT borrow_id, member_id, book_id, reservation_id, borrow_date, due_date, status
            FROM borrowing_transactions
            WHERE borrow_id = $1
            "#,
        )
        .bind(borrow_id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_borrowing).transpose()
    }

    async fn get_returning_for(&self, borrow_id: BorrowId) -> Result<Option<ReturningTransaction>> {
        let row = sqlx::query(
            r#"
            SELECT return_id, borrow_id, return_date, late_days, fine_amount,
                   payment_status, payment_method, payment_date, damage_recorded
            FROM returning_transactions
            WHERE borrow_id = $1
            "#,
        )
        .bind(borrow_id.value())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => map_row_to_returning(&row),
            None => Ok(None),
        }
    }

    async fn get_returning(
        &self,
        return_id: ReturnId,
    ) -> Result<Option<(ReturningTransaction, MemberId)>> {
        let row = sqlx::query(
            r#"
            SELECT rt.return_id, rt.borrow_id, rt.return_date, rt.late_days, rt.fine_amount,
                   rt.payment_status, rt.payment_method, rt.payment_date, rt.damage_recorded,
                   bt.member_id
            FROM returning_transactions rt
            JOIN borrowing_transactions bt ON bt.borrow_id = rt.borrow_id
            WHERE rt.return_id = $1
            "#,
        )
        .bind(return_id.value())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let member_id = MemberId::from_uuid(row.try_get("member_id")?);
        Ok(map_row_to_returning(&row)?.map(|r| (r, member_id)))
    }

    async fn record_damage(&self, record: &DamageRecord) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let flagged = sqlx::query(
            r#"
            UPDATE returning_transactions
            SET damage_recorded = TRUE
            WHERE borrow_id = $1 AND damage_recorded = FALSE
            "#,
        )
        .bind(record.borrow_id.value())
        .execute(&mut *tx)
        .await?;
        if flagged.rows_affected() != 1 {
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO book_damage_records (
                damage_id,
                borrow_id,
                category,
                notes,
                damage_date,
                book_value,
                damage_fine,
                payment_status,
                payment_method,
                payment_date,
                reported_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(record.damage_id.value())
        .bind(record.borrow_id.value())
        .bind(record.category.code())
        .bind(&record.notes)
        .bind(record.damage_date)
        .bind(record.book_value)
        .bind(record.damage_fine)
        .bind(record.payment_status.as_str())
        .bind(record.payment_method.map(|m| m.as_str()))
        .bind(record.payment_date)
        .bind(record.reported_by.value())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn get_damage(&self, damage_id: DamageId) -> Result<Option<(DamageRecord, MemberId)>> {
        let row = sqlx::query(&format!("{} WHERE d.damage_id = $1", DAMAGE_SELECT))
            .bind(damage_id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref()
            .map(map_row_to_damage_entry)
            .transpose()
            .map(|entry| entry.map(|e| (e.record, e.member_id)))
    }

    async fn settle_late_fine(&self, returning: &ReturningTransaction) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE returning_transactions
            SET payment_status = $2, payment_method = $3, payment_date = $4
            WHERE return_id = $1 AND payment_status = 'unpaid'
            "#,
        )
        .bind(returning.return_id.value())
        .bind(returning.payment_status.as_str())
        .bind(returning.payment_method.map(|m| m.as_str()))
        .bind(returning.payment_date)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn settle_damage_fine(&self, record: &DamageRecord) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE book_damage_records
            SET payment_status = $2, payment_method = $3, payment_date = $4
            WHERE damage_id = $1 AND payment_status = 'unpaid'
            "#,
        )
        .bind(record.damage_id.value())
        .bind(record.payment_status.as_str())
        .bind(record.payment_method.map(|m| m.as_str()))
        .bind(record.payment_date)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn member_loans(&self, member_id: MemberId) -> Result<Vec<LoanRecord>> {
        let rows = sqlx::query(&format!(
            "{} WHERE bt.member_id = $1 ORDER BY bt.borrow_date DESC",
            LOAN_SELECT
        ))
        .bind(member_id.value())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_loan_record).collect()
    }

    async fn member_damages(&self, member_id: MemberId) -> Result<Vec<DamageEntry>> {
        let rows = sqlx::query(&format!(
            "{} WHERE bt.member_id = $1 ORDER BY d.damage_date DESC",
            DAMAGE_SELECT
        ))
        .bind(member_id.value())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_damage_entry).collect()
    }

    async fn loans_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        status: Option<BorrowStatus>,
    ) -> Result<Vec<LoanRecord>> {
        let rows = sqlx::query(&format!(
            r#"
            {}
            WHERE bt.borrow_date BETWEEN $1 AND $2
              AND ($3::text IS NULL OR bt.status = $3)
            ORDER BY bt.borrow_date DESC
            "#,
            LOAN_SELECT
        ))
        .bind(from)
        .bind(to)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_loan_record).collect()
    }

    async fn damage_records(
        &self,
        payment_status: Option<PaymentStatus>,
    ) -> Result<Vec<DamageEntry>> {
        let rows = sqlx::query(&format!(
            r#"
            {}
            WHERE ($1::text IS NULL OR d.payment_status = $1)
            ORDER BY d.damage_date DESC
            "#,
            DAMAGE_SELECT
        ))
        .bind(payment_status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_damage_entry).collect()
    }
}
