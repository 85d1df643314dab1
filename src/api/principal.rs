use crate::domain::{MemberId, Principal, StaffId};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use uuid::Uuid;

use super::error::ApiError;

/// Staff identity asserted by the authenticating front end
pub const STAFF_HEADER: &str = "x-staff-id";
/// Member identity asserted by the authenticating front end
pub const MEMBER_HEADER: &str = "x-member-id";

fn header_uuid(headers: &HeaderMap, name: &str) -> Result<Option<Uuid>, ApiError> {
    let Some(value) = headers.get(name) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .map(Some)
        .ok_or(ApiError::Unauthenticated("identity header is not a valid id"))
}

/// Resolves the caller from identity headers.
///
/// Exactly one of the staff and member headers must be present.
pub fn principal_from_headers(headers: &HeaderMap) -> Result<Principal, ApiError> {
    match (
        header_uuid(headers, STAFF_HEADER)?,
        header_uuid(headers, MEMBER_HEADER)?,
    ) {
        (Some(staff), None) => Ok(Principal::Staff(StaffId::from_uuid(staff))),
        (None, Some(member)) => Ok(Principal::Member(MemberId::from_uuid(member))),
        (Some(_), Some(_)) => Err(ApiError::Unauthenticated(
            "send either a staff or a member identity, not both",
        )),
        (None, None) => Err(ApiError::Unauthenticated("missing identity header")),
    }
}

/// Extractor for the authenticated caller
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        principal_from_headers(&parts.headers).map(Caller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_staff_header() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(STAFF_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
        assert_eq!(
            principal_from_headers(&headers).unwrap(),
            Principal::Staff(StaffId::from_uuid(id))
        );
    }

    #[test]
    fn test_missing_or_ambiguous_identity_is_rejected() {
        assert!(principal_from_headers(&HeaderMap::new()).is_err());

        let mut headers = HeaderMap::new();
        headers.insert(STAFF_HEADER, HeaderValue::from_static("not-a-uuid"));
        assert!(principal_from_headers(&headers).is_err());

        let id = Uuid::new_v4().to_string();
        let mut both = HeaderMap::new();
        both.insert(STAFF_HEADER, HeaderValue::from_str(&id).unwrap());
        both.insert(MEMBER_HEADER, HeaderValue::from_str(&id).unwrap());
        assert!(principal_from_headers(&both).is_err());
    }
}
