use crate::domain::Principal;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::{LibraryError, Result, ServiceDependencies};

/// Wall-clock time next to the time the rules currently run on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeStatus {
    pub real_now: DateTime<Utc>,
    pub effective_now: DateTime<Utc>,
    pub overridden: bool,
}

fn status(deps: &ServiceDependencies) -> TimeStatus {
    let real_now = deps.time_control.real_now();
    match deps.time_control.current_override() {
        Some(at) => TimeStatus {
            real_now,
            effective_now: at,
            overridden: true,
        },
        None => TimeStatus {
            real_now,
            effective_now: real_now,
            overridden: false,
        },
    }
}

pub fn time_status(deps: &ServiceDependencies, principal: &Principal) -> Result<TimeStatus> {
    principal.require_staff()?;
    Ok(status(deps))
}

/// Freezes the effective time at an absolute instant (staff only)
pub fn set_time(
    deps: &ServiceDependencies,
    principal: &Principal,
    at: DateTime<Utc>,
) -> Result<TimeStatus> {
    principal.require_staff()?;
    deps.time_control.set_override(at);
    tracing::info!(effective_now = %at, "time override set");
    Ok(status(deps))
}

/// Moves the effective time forward from wherever it currently is.
/// Negative steps are rejected.
pub fn advance_time(
    deps: &ServiceDependencies,
    principal: &Principal,
    by: Duration,
) -> Result<TimeStatus> {
    principal.require_staff()?;
    if by <= Duration::zero() {
        return Err(LibraryError::InvalidInput(
            "time can only be advanced by a positive amount".to_string(),
        ));
    }

    let from = status(deps).effective_now;
    let to = from.checked_add_signed(by).ok_or_else(|| {
        LibraryError::InvalidInput("advanced time is out of range".to_string())
    })?;
    deps.time_control.set_override(to);
    tracing::info!(from = %from, to = %to, "time advanced");
    Ok(status(deps))
}

/// Returns to real time (staff only)
pub fn reset_time(deps: &ServiceDependencies, principal: &Principal) -> Result<TimeStatus> {
    principal.require_staff()?;
    deps.time_control.clear_override();
    tracing::info!("time override cleared");
    Ok(status(deps))
}
