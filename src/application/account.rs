use crate::domain::{
    BorrowStatus, Member, MemberId, Principal, SuspensionPenalty, calculate_fine, late_days,
};
use crate::ports::{DamageEntry, LoanRecord, ReservationEntry};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::{LibraryError, Result, ServiceDependencies, load_member};

/// An open loan with what it would cost if returned today
#[derive(Debug, Clone, Serialize)]
pub struct ActiveLoan {
    #[serde(flatten)]
    pub loan: LoanRecord,
    pub days_overdue: i64,
    pub estimated_fine: Decimal,
}

/// Everything a member sees on their account page
#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    pub member: Member,
    pub active_loans: Vec<ActiveLoan>,
    pub history: Vec<LoanRecord>,
    /// Returns whose late fine is still unpaid
    pub unpaid_late_fines: Vec<LoanRecord>,
    pub unpaid_damage_fines: Vec<DamageEntry>,
    pub penalties: Vec<SuspensionPenalty>,
    pub reservations: Vec<ReservationEntry>,
    /// Unpaid late fines, damage fines and penalties together
    pub total_outstanding: Decimal,
}

fn has_unpaid_fine(loan: &LoanRecord) -> bool {
    loan.returning
        .as_ref()
        .is_some_and(|r| !r.payment_status.is_paid() && r.fine_amount > Decimal::ZERO)
}

fn split_loans(
    loans: Vec<LoanRecord>,
    today: NaiveDate,
    fine_per_day: Decimal,
) -> (Vec<ActiveLoan>, Vec<LoanRecord>) {
    let mut active = Vec::new();
    let mut history = Vec::new();
    for loan in loans {
        match loan.borrowing.status {
            BorrowStatus::Borrowed => {
                let days_overdue = late_days(loan.borrowing.due_date, today);
                active.push(ActiveLoan {
                    estimated_fine: calculate_fine(days_overdue, fine_per_day),
                    days_overdue,
                    loan,
                });
            }
            BorrowStatus::Returned => history.push(loan),
        }
    }
    (active, history)
}

/// Account overview for one member. Members see their own; staff anyone's.
pub async fn account_summary(
    deps: &ServiceDependencies,
    principal: &Principal,
    member_id: MemberId,
) -> Result<AccountSummary> {
    principal.require_access_to(member_id)?;

    let member = load_member(deps, member_id).await?;
    let loans = deps
        .circulation
        .member_loans(member_id)
        .await
        .map_err(LibraryError::Storage)?;
    let damages = deps
        .circulation
        .member_damages(member_id)
        .await
        .map_err(LibraryError::Storage)?;
    let penalties = deps
        .suspensions
        .penalties_for(member_id)
        .await
        .map_err(LibraryError::Storage)?;
    let reservations = deps
        .reservations
        .list_for_member(member_id)
        .await
        .map_err(LibraryError::Storage)?;

    let (active_loans, history) = split_loans(loans, deps.clock.today(), deps.policy.fine_per_day);
    let unpaid_late_fines: Vec<LoanRecord> =
        history.iter().filter(|l| has_unpaid_fine(l)).cloned().collect();
    let unpaid_damage_fines: Vec<DamageEntry> = damages
        .into_iter()
        .filter(|d| !d.record.payment_status.is_paid())
        .collect();

    let late_total: Decimal = unpaid_late_fines
        .iter()
        .filter_map(|l| l.returning.as_ref())
        .map(|r| r.fine_amount)
        .sum();
    let damage_total: Decimal = unpaid_damage_fines.iter().map(|d| d.record.damage_fine).sum();
    let penalty_total: Decimal = penalties
        .iter()
        .filter(|p| !p.payment_status.is_paid())
        .map(|p| p.penalty_amount)
        .sum();

    Ok(AccountSummary {
        member,
        active_loans,
        history,
        unpaid_late_fines,
        unpaid_damage_fines,
        penalties,
        reservations,
        total_outstanding: late_total + damage_total + penalty_total,
    })
}
