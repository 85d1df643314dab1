use crate::domain::{self, Principal, suspension_cutoff};
use crate::ports::ExposureEntry;
use serde::Serialize;

use super::{LibraryError, Result, ServiceDependencies};

/// A member with unpaid fines and how close they are to suspension
#[derive(Debug, Clone, Serialize)]
pub struct SuspensionRisk {
    #[serde(flatten)]
    pub entry: ExposureEntry,
    pub days_unpaid: i64,
    /// Active member whose oldest unpaid fine is past the grace period
    pub due_for_suspension: bool,
}

/// Suspends every active member carrying fines older than the grace period.
/// Returns how many members were suspended.
///
/// Idempotent: the store only suspends members that are still active, so a
/// second run finds nothing to do.
pub async fn run_suspension_sweep(deps: &ServiceDependencies) -> Result<usize> {
    let now = deps.clock.now();
    let cutoff = suspension_cutoff(deps.clock.today(), &deps.policy);

    let candidates = deps
        .suspensions
        .find_candidates(cutoff)
        .await
        .map_err(LibraryError::Storage)?;

    let mut suspended = 0;
    for exposure in &candidates {
        let Some(penalty) = domain::assess_suspension(exposure, now, &deps.policy) else {
            continue;
        };
        let applied = deps
            .suspensions
            .suspend(&penalty)
            .await
            .map_err(LibraryError::Storage)?;
        if applied {
            suspended += 1;
            tracing::info!(
                member_id = %penalty.member_id,
                penalty_id = %penalty.penalty_id,
                late_fines = %penalty.total_unpaid_fines,
                damage_fines = %penalty.total_damage_fines,
                "member suspended"
            );
        }
    }

    tracing::debug!(%cutoff, candidates = candidates.len(), suspended, "suspension sweep finished");
    Ok(suspended)
}

/// Manual suspension sweep (staff only)
pub async fn trigger_suspension_sweep(
    deps: &ServiceDependencies,
    principal: &Principal,
) -> Result<usize> {
    principal.require_staff()?;
    run_suspension_sweep(deps).await
}

/// Members with any unpaid fine, most overdue first (staff only)
pub async fn suspension_risk(
    deps: &ServiceDependencies,
    principal: &Principal,
) -> Result<Vec<SuspensionRisk>> {
    principal.require_staff()?;

    let today = deps.clock.today();
    let cutoff = suspension_cutoff(today, &deps.policy);

    let mut risks: Vec<SuspensionRisk> = deps
        .suspensions
        .outstanding_exposures()
        .await
        .map_err(LibraryError::Storage)?
        .into_iter()
        .map(|entry| SuspensionRisk {
            days_unpaid: (today - entry.oldest_unpaid).num_days().max(0),
            due_for_suspension: entry.exposure.member_status.is_active()
                && entry.oldest_unpaid <= cutoff,
            entry,
        })
        .collect();

    risks.sort_by(|a, b| b.days_unpaid.cmp(&a.days_unpaid));
    Ok(risks)
}
