use crate::domain::{FineExposure, MemberId, PenaltyId, SuspensionPenalty};
use crate::ports::{ExposureEntry, Result, SuspensionStore as SuspensionStoreTrait};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Row, postgres::PgRow};

use super::{parse_column, parse_optional_column};

/// Per-member unpaid sums. `$1` is the cutoff date; NULL counts every fine.
///
/// Late fines and damage fines are summed in separate subqueries so a
/// borrowing with both never counts either one twice.
const EXPOSURE_SELECT: &str = r#"
    SELECT
        m.member_id,
        m.name,
        m.email,
        m.status,
        COALESCE((
            SELECT SUM(rt.fine_amount)
            FROM returning_transactions rt
            JOIN borrowing_transactions bt ON bt.borrow_id = rt.borrow_id
            WHERE bt.member_id = m.member_id
              AND rt.payment_status = 'unpaid'
              AND rt.fine_amount > 0
              AND ($1::date IS NULL OR rt.return_date <= $1)
        ), 0) AS late_fines,
        COALESCE((
            SELECT SUM(d.damage_fine)
            FROM book_damage_records d
            JOIN borrowing_transactions bt ON bt.borrow_id = d.borrow_id
            WHERE bt.member_id = m.member_id
              AND d.payment_status = 'unpaid'
              AND ($1::date IS NULL OR d.damage_date <= $1)
        ), 0) AS damage_fines,
        LEAST((
            SELECT MIN(rt.return_date)
            FROM returning_transactions rt
            JOIN borrowing_transactions bt ON bt.borrow_id = rt.borrow_id
            WHERE bt.member_id = m.member_id
              AND rt.payment_status = 'unpaid'
              AND rt.fine_amount > 0
        ), (
            SELECT MIN(d.damage_date)
            FROM book_damage_records d
            JOIN borrowing_transactions bt ON bt.borrow_id = d.borrow_id
            WHERE bt.member_id = m.member_id
              AND d.payment_status = 'unpaid'
        )) AS oldest_unpaid
    FROM members m
"#;

fn map_row_to_exposure(row: &PgRow) -> Result<FineExposure> {
    Ok(FineExposure {
        member_id: MemberId::from_uuid(row.try_get("member_id")?),
        member_status: parse_column(row, "status")?,
        late_fines: row.try_get("late_fines")?,
        damage_fines: row.try_get("damage_fines")?,
    })
}

fn map_row_to_penalty(row: &PgRow) -> Result<SuspensionPenalty> {
    Ok(SuspensionPenalty {
        penalty_id: PenaltyId::from_uuid(row.try_get("penalty_id")?),
        member_id: MemberId::from_uuid(row.try_get("member_id")?),
        total_unpaid_fines: row.try_get("total_unpaid_fines")?,
        total_damage_fines: row.try_get("total_damage_fines")?,
        suspension_date: row.try_get("suspension_date")?,
        penalty_amount: row.try_get("penalty_amount")?,
        payment_status: parse_column(row, "payment_status")?,
        payment_method: parse_optional_column(row, "payment_method")?,
        payment_date: row.try_get("payment_date")?,
        unsuspension_date: row.try_get("unsuspension_date")?,
    })
}

const PENALTY_COLUMNS: &str = r#"
    penalty_id,
    member_id,
    total_unpaid_fines,
    total_damage_fines,
    suspension_date,
    penalty_amount,
    payment_status,
    payment_method,
    payment_date,
    unsuspension_date
"#;

/// PostgreSQL suspension penalties and member standing
pub struct SuspensionStore {
    pool: PgPool,
}

impl SuspensionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SuspensionStoreTrait for SuspensionStore {
    async fn find_candidates(&self, cutoff: NaiveDate) -> Result<Vec<FineExposure>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT * FROM ({}) exposure
            WHERE exposure.status = 'active'
              AND exposure.late_fines + exposure.damage_fines > 0
            ORDER BY exposure.member_id
            "#,
            EXPOSURE_SELECT
        ))
        .bind(Some(cutoff))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_exposure).collect()
    }

    async fn outstanding_exposures(&self) -> Result<Vec<ExposureEntry>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT * FROM ({}) exposure
            WHERE exposure.oldest_unpaid IS NOT NULL
            ORDER BY exposure.oldest_unpaid ASC
            "#,
            EXPOSURE_SELECT
        ))
        .bind(None::<NaiveDate>)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(ExposureEntry {
                    exposure: map_row_to_exposure(row)?,
                    member_name: row.try_get("name")?,
                    member_email: row.try_get("email")?,
                    oldest_unpaid: row.try_get("oldest_unpaid")?,
                })
            })
            .collect()
    }

    async fn suspend(&self, penalty: &SuspensionPenalty) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let flipped = sqlx::query(
            r#"
            UPDATE members
            SET status = 'suspended', updated_at = $2
            WHERE member_id = $1 AND status = 'active'
            "#,
        )
        .bind(penalty.member_id.value())
        .bind(penalty.suspension_date)
        .execute(&mut *tx)
        .await?;
        if flipped.rows_affected() != 1 {
            return Ok(false);
        }

        sqlx::query(&format!(
            r#"
            INSERT INTO suspension_penalties ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
            PENALTY_COLUMNS
        ))
        .bind(penalty.penalty_id.value())
        .bind(penalty.member_id.value())
        .bind(penalty.total_unpaid_fines)
        .bind(penalty.total_damage_fines)
        .bind(penalty.suspension_date)
        .bind(penalty.penalty_amount)
        .bind(penalty.payment_status.as_str())
        .bind(penalty.payment_method.map(|m| m.as_str()))
        .bind(penalty.payment_date)
        .bind(penalty.unsuspension_date)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn get_penalty(&self, penalty_id: PenaltyId) -> Result<Option<SuspensionPenalty>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM suspension_penalties WHERE penalty_id = $1",
            PENALTY_COLUMNS
        ))
        .bind(penalty_id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_penalty).transpose()
    }

    async fn penalties_for(&self, member_id: MemberId) -> Result<Vec<SuspensionPenalty>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM suspension_penalties
            WHERE member_id = $1
            ORDER BY suspension_date DESC
            "#,
            PENALTY_COLUMNS
        ))
        .bind(member_id.value())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_penalty).collect()
    }

    async fn settle_penalty(&self, penalty: &SuspensionPenalty) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let settled = sqlx::query(
            r#"
            UPDATE suspension_penalties
            SET payment_status = $2,
                payment_method = $3,
                payment_date = $4,
                unsuspension_date = $5
            WHERE penalty_id = $1 AND payment_status = 'unpaid'
            "#,
        )
        .bind(penalty.penalty_id.value())
        .bind(penalty.payment_status.as_str())
        .bind(penalty.payment_method.map(|m| m.as_str()))
        .bind(penalty.payment_date)
        .bind(penalty.unsuspension_date)
        .execute(&mut *tx)
        .await?;
        if settled.rows_affected() != 1 {
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE members
            SET status = 'active', updated_at = COALESCE($2, updated_at)
            WHERE member_id = $1
            "#,
        )
        .bind(penalty.member_id.value())
        .bind(penalty.unsuspension_date)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}
