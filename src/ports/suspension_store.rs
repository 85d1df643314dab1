use crate::domain::{FineExposure, MemberId, PenaltyId, SuspensionPenalty};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;

use super::Result;

/// Exposure of a member together with the name shown on reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExposureEntry {
    pub exposure: FineExposure,
    pub member_name: String,
    pub member_email: String,
    /// Date of the oldest unpaid fine
    pub oldest_unpaid: NaiveDate,
}

/// Suspension and penalty persistence
#[async_trait]
pub trait SuspensionStore: Send + Sync {
    /// Active members whose unpaid fines dated on or before `cutoff` sum to
    /// more than zero.
    ///
    /// Late fines count by return date, damage fines by damage date. The
    /// two sums are computed independently.
    async fn find_candidates(&self, cutoff: NaiveDate) -> Result<Vec<FineExposure>>;

    /// Members of any status with at least one unpaid fine, regardless of
    /// age. Exposure sums cover every unpaid fine.
    async fn outstanding_exposures(&self) -> Result<Vec<ExposureEntry>>;

    /// Flips the member to suspended and inserts the penalty.
    /// Guarded on the member still being active.
    async fn suspend(&self, penalty: &SuspensionPenalty) -> Result<bool>;

    async fn get_penalty(&self, penalty_id: PenaltyId) -> Result<Option<SuspensionPenalty>>;

    /// Newest first
    async fn penalties_for(&self, member_id: MemberId) -> Result<Vec<SuspensionPenalty>>;

    /// Marks the penalty paid and reactivates the member.
    /// Guarded on the penalty still being unpaid.
    async fn settle_penalty(&self, penalty: &SuspensionPenalty) -> Result<bool>;
}
