use crate::domain::{self, Member, MemberDetails, MemberId, Principal};
use crate::ports::{DeleteOutcome, SaveOutcome};

use super::{LibraryError, Result, ServiceDependencies, load_member};

fn check_saved(outcome: SaveOutcome) -> Result<()> {
    match outcome {
        SaveOutcome::Saved => Ok(()),
        SaveOutcome::NotFound => Err(LibraryError::MemberNotFound),
        SaveOutcome::DuplicateEmail => Err(LibraryError::DuplicateEmail),
    }
}

/// Registers a member (staff only)
pub async fn add_member(
    deps: &ServiceDependencies,
    principal: &Principal,
    details: MemberDetails,
) -> Result<Member> {
    principal.require_staff()?;

    let member = domain::register_member(details, deps.clock.now())?;
    let outcome = deps
        .members
        .insert(&member)
        .await
        .map_err(LibraryError::Storage)?;
    check_saved(outcome)?;

    tracing::info!(member_id = %member.member_id, "member registered");
    Ok(member)
}

/// Edits member details (staff only).
///
/// Staff may also flip the status by hand; the suspension sweep and
/// penalty payment remain the regular paths.
pub async fn edit_member(
    deps: &ServiceDependencies,
    principal: &Principal,
    member_id: MemberId,
    details: MemberDetails,
) -> Result<Member> {
    principal.require_staff()?;

    let current = load_member(deps, member_id).await?;
    let edited = domain::edit_member(&current, details, deps.clock.now())?;
    let outcome = deps
        .members
        .update(&edited)
        .await
        .map_err(LibraryError::Storage)?;
    check_saved(outcome)?;

    tracing::info!(member_id = %member_id, status = edited.status.as_str(), "member updated");
    Ok(edited)
}

/// Deletes a member with no open borrowings or pending reservations (staff only)
pub async fn delete_member(
    deps: &ServiceDependencies,
    principal: &Principal,
    member_id: MemberId,
) -> Result<()> {
    principal.require_staff()?;

    match deps
        .members
        .delete(member_id)
        .await
        .map_err(LibraryError::Storage)?
    {
        DeleteOutcome::Deleted => {
            tracing::info!(member_id = %member_id, "member deleted");
            Ok(())
        }
        DeleteOutcome::NotFound => Err(LibraryError::MemberNotFound),
        DeleteOutcome::InUse => Err(LibraryError::InUse(
            "member has open borrowings or pending reservations".to_string(),
        )),
    }
}

/// Staff see anyone; members see themselves
pub async fn get_member(
    deps: &ServiceDependencies,
    principal: &Principal,
    member_id: MemberId,
) -> Result<Member> {
    principal.require_access_to(member_id)?;
    load_member(deps, member_id).await
}

pub async fn list_members(deps: &ServiceDependencies, principal: &Principal) -> Result<Vec<Member>> {
    principal.require_staff()?;
    deps.members.list().await.map_err(LibraryError::Storage)
}
