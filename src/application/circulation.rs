use crate::domain::{
    self, BorrowId, BorrowingTransaction, DamageCategory, DamageRecord, Principal,
    ReturningTransaction, commands::*,
};
use rust_decimal::Decimal;
use serde::Serialize;

use super::{LibraryError, Result, ServiceDependencies, load_book, load_member};

/// Priced damage before it is recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DamagePreview {
    pub borrow_id: BorrowId,
    pub category: DamageCategory,
    pub fine_percentage: Decimal,
    pub book_value: Decimal,
    pub damage_fine: Decimal,
}

async fn load_borrowing(
    deps: &ServiceDependencies,
    borrow_id: BorrowId,
) -> Result<BorrowingTransaction> {
    deps.circulation
        .get_borrowing(borrow_id)
        .await
        .map_err(LibraryError::Storage)?
        .ok_or(LibraryError::BorrowingNotFound)
}

/// Lends a copy over the counter (staff only)
///
/// Business rules:
/// - the member exists and is active
/// - the book has an unreserved copy on the shelf
/// - the due date falls after the borrow date
///
/// Dates default to today and today plus the loan period. The store
/// re-checks member standing and stock inside its transaction.
pub async fn borrow_book(
    deps: &ServiceDependencies,
    principal: &Principal,
    cmd: BorrowBook,
) -> Result<BorrowingTransaction> {
    principal.require_staff()?;

    let member = load_member(deps, cmd.member_id).await?;
    let book = load_book(deps, cmd.book_id).await?;

    let borrow_date = cmd.borrow_date.unwrap_or_else(|| deps.clock.today());
    let due_date = match cmd.due_date {
        Some(due_date) => due_date,
        None => borrow_date
            .checked_add_signed(deps.policy.loan_period())
            .ok_or_else(|| {
                LibraryError::InvalidInput("borrow date is out of range".to_string())
            })?,
    };

    let borrowing = domain::borrow_book(&member, &book, borrow_date, due_date)?;

    let opened = deps
        .circulation
        .open_borrowing(&borrowing)
        .await
        .map_err(LibraryError::Storage)?;
    if !opened {
        // Lost a race; report whichever guard failed
        let member = load_member(deps, cmd.member_id).await?;
        return Err(if member.status.is_active() {
            LibraryError::OutOfStock
        } else {
            LibraryError::MemberSuspended
        });
    }

    tracing::info!(
        borrow_id = %borrowing.borrow_id,
        member_id = %borrowing.member_id,
        book_id = %borrowing.book_id,
        due_date = %borrowing.due_date,
        "book borrowed"
    );
    Ok(borrowing)
}

/// Takes a copy back and prices lateness (staff only)
pub async fn return_book(
    deps: &ServiceDependencies,
    principal: &Principal,
    cmd: ReturnBook,
) -> Result<ReturningTransaction> {
    principal.require_staff()?;

    let borrowing = load_borrowing(deps, cmd.borrow_id).await?;
    let return_date = cmd.return_date.unwrap_or_else(|| deps.clock.today());

    let (closed, returning) = domain::return_book(&borrowing, return_date, &deps.policy)?;

    let saved = deps
        .circulation
        .close_borrowing(&closed, &returning)
        .await
        .map_err(LibraryError::Storage)?;
    if !saved {
        return Err(domain::ReturnError::AlreadyReturned.into());
    }

    tracing::info!(
        borrow_id = %borrowing.borrow_id,
        late_days = returning.late_days,
        fine = %returning.fine_amount,
        "book returned"
    );
    Ok(returning)
}

/// Prices damage without recording it (staff only)
pub async fn preview_damage(
    deps: &ServiceDependencies,
    principal: &Principal,
    borrow_id: BorrowId,
    category: DamageCategory,
) -> Result<DamagePreview> {
    principal.require_staff()?;

    let borrowing = load_borrowing(deps, borrow_id).await?;
    let book = load_book(deps, borrowing.book_id).await?;

    Ok(DamagePreview {
        borrow_id,
        category,
        fine_percentage: category.fine_percentage(),
        book_value: book.book_value,
        damage_fine: domain::damage_fine(book.book_value, category),
    })
}

/// Records damage on a returned copy (staff only).
///
/// At most one report per borrowing; the fine starts unpaid.
pub async fn report_damage(
    deps: &ServiceDependencies,
    principal: &Principal,
    cmd: ReportDamage,
) -> Result<DamageRecord> {
    let staff_id = principal.require_staff()?;

    let borrowing = load_borrowing(deps, cmd.borrow_id).await?;
    let returning = deps
        .circulation
        .get_returning_for(cmd.borrow_id)
        .await
        .map_err(LibraryError::Storage)?;
    let book = load_book(deps, borrowing.book_id).await?;

    let record = domain::report_damage(
        returning.as_ref(),
        &book,
        cmd.category,
        &cmd.notes,
        deps.clock.today(),
        staff_id,
    )?;

    let saved = deps
        .circulation
        .record_damage(&record)
        .await
        .map_err(LibraryError::Storage)?;
    if !saved {
        return Err(domain::DamageError::AlreadyRecorded.into());
    }

    tracing::info!(
        damage_id = %record.damage_id,
        borrow_id = %record.borrow_id,
        category = record.category.code(),
        fine = %record.damage_fine,
        "damage recorded"
    );
    Ok(record)
}
