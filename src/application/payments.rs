use crate::domain::{
    self, DamageRecord, PaymentError, Principal, ReturningTransaction, SuspensionPenalty,
    commands::*,
};

use super::{LibraryError, Result, ServiceDependencies};

/// Pays one late fine. Members pay their own; staff may record any payment.
pub async fn pay_late_fine(
    deps: &ServiceDependencies,
    principal: &Principal,
    cmd: PayLateFine,
) -> Result<ReturningTransaction> {
    let (returning, owner) = deps
        .circulation
        .get_returning(cmd.return_id)
        .await
        .map_err(LibraryError::Storage)?
        .ok_or(LibraryError::FineNotFound)?;
    principal.require_access_to(owner)?;

    let paid = domain::pay_late_fine(&returning, cmd.method, deps.clock.now())?;
    let settled = deps
        .circulation
        .settle_late_fine(&paid)
        .await
        .map_err(LibraryError::Storage)?;
    if !settled {
        return Err(PaymentError::AlreadyPaid.into());
    }

    tracing::info!(
        return_id = %paid.return_id,
        member_id = %owner,
        amount = %paid.fine_amount,
        method = cmd.method.as_str(),
        "late fine paid"
    );
    Ok(paid)
}

/// Pays one damage fine
pub async fn pay_damage_fine(
    deps: &ServiceDependencies,
    principal: &Principal,
    cmd: PayDamageFine,
) -> Result<DamageRecord> {
    let (record, owner) = deps
        .circulation
        .get_damage(cmd.damage_id)
        .await
        .map_err(LibraryError::Storage)?
        .ok_or(LibraryError::FineNotFound)?;
    principal.require_access_to(owner)?;

    let paid = domain::pay_damage_fine(&record, cmd.method, deps.clock.now())?;
    let settled = deps
        .circulation
        .settle_damage_fine(&paid)
        .await
        .map_err(LibraryError::Storage)?;
    if !settled {
        return Err(PaymentError::AlreadyPaid.into());
    }

    tracing::info!(
        damage_id = %paid.damage_id,
        member_id = %owner,
        amount = %paid.damage_fine,
        method = cmd.method.as_str(),
        "damage fine paid"
    );
    Ok(paid)
}

/// Pays a suspension penalty and reactivates the member in the same unit.
///
/// Fines frozen on the penalty are not settled by this payment; if they
/// stay unpaid a later sweep suspends the member again.
pub async fn pay_penalty(
    deps: &ServiceDependencies,
    principal: &Principal,
    cmd: PayPenalty,
) -> Result<SuspensionPenalty> {
    let penalty = deps
        .suspensions
        .get_penalty(cmd.penalty_id)
        .await
        .map_err(LibraryError::Storage)?
        .ok_or(LibraryError::PenaltyNotFound)?;
    principal.require_access_to(penalty.member_id)?;

    let paid = domain::pay_penalty(&penalty, cmd.method, deps.clock.now())?;
    let settled = deps
        .suspensions
        .settle_penalty(&paid)
        .await
        .map_err(LibraryError::Storage)?;
    if !settled {
        return Err(PaymentError::AlreadyPaid.into());
    }

    tracing::info!(
        penalty_id = %paid.penalty_id,
        member_id = %paid.member_id,
        amount = %paid.penalty_amount,
        "penalty paid, member reactivated"
    );
    Ok(paid)
}
