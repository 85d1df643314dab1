use serde::{Deserialize, Serialize};

use super::{AccessDenied, MemberId, StaffId};

/// Authenticated caller of a use case.
///
/// Passed explicitly into every application function instead of being
/// looked up from ambient session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "snake_case")]
pub enum Principal {
    Staff(StaffId),
    Member(MemberId),
}

impl Principal {
    pub fn is_staff(&self) -> bool {
        matches!(self, Principal::Staff(_))
    }

    pub fn require_staff(&self) -> Result<StaffId, AccessDenied> {
        match self {
            Principal::Staff(id) => Ok(*id),
            Principal::Member(_) => Err(AccessDenied::StaffOnly),
        }
    }

    pub fn require_member(&self) -> Result<MemberId, AccessDenied> {
        match self {
            Principal::Member(id) => Ok(*id),
            Principal::Staff(_) => Err(AccessDenied::MembersOnly),
        }
    }

    /// Staff may act on any member's behalf; members only on their own.
    pub fn require_access_to(&self, member_id: MemberId) -> Result<(), AccessDenied> {
        match self {
            Principal::Staff(_) => Ok(()),
            Principal::Member(id) if *id == member_id => Ok(()),
            Principal::Member(_) => Err(AccessDenied::NotOwner),
        }
    }
}
