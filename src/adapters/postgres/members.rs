use crate::domain::{Member, MemberId};
use crate::ports::{DeleteOutcome, MemberRepository as MemberRepositoryTrait, Result, SaveOutcome};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use super::{parse_column, violates};

const EMAIL_KEY: &str = "members_email_key";

pub(super) fn map_row_to_member(row: &PgRow) -> Result<Member> {
    Ok(Member {
        member_id: MemberId::from_uuid(row.try_get("member_id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        address: row.try_get("address")?,
        status: parse_column(row, "status")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// PostgreSQL member registry
pub struct MemberRepository {
    pool: PgPool,
}

impl MemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MemberRepositoryTrait for MemberRepository {
    async fn insert(&self, member: &Member) -> Result<SaveOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO members (
                member_id,
                name,
                email,
                phone,
                address,
                status,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(member.member_id.value())
        .bind(&member.name)
        .bind(&member.email)
        .bind(&member.phone)
        .bind(&member.address)
        .bind(member.status.as_str())
        .bind(member.created_at)
        .bind(member.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(SaveOutcome::Saved),
            Err(e) if violates(&e, EMAIL_KEY) => Ok(SaveOutcome::DuplicateEmail),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, member: &Member) -> Result<SaveOutcome> {
        let result = sqlx::query(
            r#"
            UPDATE members
            SET name = $2,
                email = $3,
                phone = $4,
                address = $5,
                status = $6,
                updated_at = $7
            WHERE member_id = $1
            "#,
        )
        .bind(member.member_id.value())
        .bind(&member.name)
        .bind(&member.email)
        .bind(&member.phone)
        .bind(&member.address)
        .bind(member.status.as_str())
        .bind(member.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 1 => Ok(SaveOutcome::Saved),
            Ok(_) => Ok(SaveOutcome::NotFound),
            Err(e) if violates(&e, EMAIL_KEY) => Ok(SaveOutcome::DuplicateEmail),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, member_id: MemberId) -> Result<DeleteOutcome> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i32> =
            sqlx::query_scalar("SELECT 1 FROM members WHERE member_id = $1 FOR UPDATE")
                .bind(member_id.value())
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Ok(DeleteOutcome::NotFound);
        }

        let in_use: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM borrowing_transactions
                WHERE member_id = $1 AND status = 'borrowed'
            ) OR EXISTS (
                SELECT 1 FROM reservations
                WHERE member_id = $1 AND status = 'pending'
            )
            "#,
        )
        .bind(member_id.value())
        .fetch_one(&mut *tx)
        .await?;
        if in_use {
            return Ok(DeleteOutcome::InUse);
        }

        sqlx::query("DELETE FROM members WHERE member_id = $1")
            .bind(member_id.value())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(DeleteOutcome::Deleted)
    }

    async fn get_by_id(&self, member_id: MemberId) -> Result<Option<Member>> {
        let row = sqlx::query(
            r#"
            SELECT member_id, name, email, phone, address, status, created_at, updated_at
            FROM members
            WHERE member_id = $1
            "#,
        )
        .bind(member_id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_member).transpose()
    }

    async fn list(&self) -> Result<Vec<Member>> {
        let rows = sqlx::query(
            r#"
            SELECT member_id, name, email, phone, address, status, created_at, updated_at
            FROM members
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_member).collect()
    }
}
