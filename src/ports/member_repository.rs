use crate::domain::{Member, MemberId};
use async_trait::async_trait;

use super::{DeleteOutcome, Result};

/// Result of writing a member row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    NotFound,
    /// Another member already uses the email address
    DuplicateEmail,
}

/// Member registry persistence port
#[async_trait]
pub trait MemberRepository: Send + Sync {
    async fn insert(&self, member: &Member) -> Result<SaveOutcome>;

    async fn update(&self, member: &Member) -> Result<SaveOutcome>;

    /// Refused with `InUse` while the member has open borrowings
    async fn delete(&self, member_id: MemberId) -> Result<DeleteOutcome>;

    async fn get_by_id(&self, member_id: MemberId) -> Result<Option<Member>>;

    /// Ordered by name
    async fn list(&self) -> Result<Vec<Member>>;
}
