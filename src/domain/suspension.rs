use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    CirculationPolicy, MemberId, MemberStatus, PaymentError, PaymentMethod, PaymentStatus,
    PenaltyId,
};

/// A member's unpaid fines that are already past the grace period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FineExposure {
    pub member_id: MemberId,
    pub member_status: MemberStatus,
    pub late_fines: Decimal,
    pub damage_fines: Decimal,
}

impl FineExposure {
    pub fn total(&self) -> Decimal {
        self.late_fines + self.damage_fines
    }
}

/// Penalty recorded when a member is suspended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspensionPenalty {
    pub penalty_id: PenaltyId,
    pub member_id: MemberId,
    /// Unpaid late fines at suspension time
    pub total_unpaid_fines: Decimal,
    /// Unpaid damage fines at suspension time
    pub total_damage_fines: Decimal,
    pub suspension_date: DateTime<Utc>,
    pub penalty_amount: Decimal,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    pub payment_date: Option<DateTime<Utc>>,
    pub unsuspension_date: Option<DateTime<Utc>>,
}

impl SuspensionPenalty {
    /// Fines frozen on the penalty plus the penalty itself
    pub fn total_due(&self) -> Decimal {
        self.total_unpaid_fines + self.total_damage_fines + self.penalty_amount
    }
}

/// Last date a fine may carry and still count toward suspension.
///
/// Fines dated on or before the cutoff are overdue for payment.
pub fn suspension_cutoff(today: NaiveDate, policy: &CirculationPolicy) -> NaiveDate {
    today
        .checked_sub_signed(Duration::days(policy.suspension_grace_days))
        .unwrap_or(NaiveDate::MIN)
}

/// Decides whether an exposure suspends its member.
///
/// Only active members with a positive overdue balance are suspended, which
/// keeps repeated sweeps from stacking penalties.
pub fn assess_suspension(
    exposure: &FineExposure,
    now: DateTime<Utc>,
    policy: &CirculationPolicy,
) -> Option<SuspensionPenalty> {
    if !exposure.member_status.is_active() || exposure.total() <= Decimal::ZERO {
        return None;
    }

    Some(SuspensionPenalty {
        penalty_id: PenaltyId::new(),
        member_id: exposure.member_id,
        total_unpaid_fines: exposure.late_fines,
        total_damage_fines: exposure.damage_fines,
        suspension_date: now,
        penalty_amount: policy.suspension_penalty,
        payment_status: PaymentStatus::Unpaid,
        payment_method: None,
        payment_date: None,
        unsuspension_date: None,
    })
}

/// Settles a penalty; the store reactivates the member in the same unit.
pub fn pay_penalty(
    penalty: &SuspensionPenalty,
    method: PaymentMethod,
    paid_at: DateTime<Utc>,
) -> Result<SuspensionPenalty, PaymentError> {
    if penalty.payment_status.is_paid() {
        return Err(PaymentError::AlreadyPaid);
    }
    Ok(SuspensionPenalty {
        payment_status: PaymentStatus::Paid,
        payment_method: Some(method),
        payment_date: Some(paid_at),
        unsuspension_date: Some(paid_at),
        ..penalty.clone()
    })
}
