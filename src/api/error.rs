use crate::application::LibraryError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::ErrorResponse;

/// API-layer error.
///
/// Wraps application errors and maps them onto HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    Library(LibraryError),
    /// No usable identity header on the request
    Unauthenticated(&'static str),
    BadRequest(String),
}

impl From<LibraryError> for ApiError {
    fn from(err: LibraryError) -> Self {
        ApiError::Library(err)
    }
}

fn library_error_parts(err: &LibraryError) -> (StatusCode, &'static str) {
    match err {
        LibraryError::AccessDenied(_) => (StatusCode::FORBIDDEN, "ACCESS_DENIED"),

        LibraryError::BookNotFound => (StatusCode::NOT_FOUND, "BOOK_NOT_FOUND"),
        LibraryError::MemberNotFound => (StatusCode::NOT_FOUND, "MEMBER_NOT_FOUND"),
        LibraryError::BorrowingNotFound => (StatusCode::NOT_FOUND, "BORROWING_NOT_FOUND"),
        LibraryError::ReservationNotFound => (StatusCode::NOT_FOUND, "RESERVATION_NOT_FOUND"),
        LibraryError::FineNotFound => (StatusCode::NOT_FOUND, "FINE_NOT_FOUND"),
        LibraryError::PenaltyNotFound => (StatusCode::NOT_FOUND, "PENALTY_NOT_FOUND"),

        LibraryError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),

        LibraryError::DuplicateReservation => (StatusCode::CONFLICT, "DUPLICATE_RESERVATION"),
        LibraryError::DuplicateEmail => (StatusCode::CONFLICT, "DUPLICATE_EMAIL"),
        LibraryError::InUse(_) => (StatusCode::CONFLICT, "IN_USE"),

        // Business rule violations
        LibraryError::MemberSuspended => (StatusCode::UNPROCESSABLE_ENTITY, "MEMBER_SUSPENDED"),
        LibraryError::OutOfStock => (StatusCode::UNPROCESSABLE_ENTITY, "OUT_OF_STOCK"),
        LibraryError::InvalidState(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_STATE"),

        LibraryError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::Unauthenticated(message) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", message.to_string())
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, "INVALID_INPUT", message),
            // Internal details go to the log, the client gets a generic message
            ApiError::Library(LibraryError::Storage(e)) => {
                tracing::error!(error = %e, "storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "The operation failed and was rolled back".to_string(),
                )
            }
            ApiError::Library(err) => {
                let (status, error_type) = library_error_parts(&err);
                (status, error_type, err.to_string())
            }
        };

        let body = Json(ErrorResponse::new(error_type, message));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (LibraryError::AccessDenied("staff only"), StatusCode::FORBIDDEN),
            (LibraryError::BookNotFound, StatusCode::NOT_FOUND),
            (LibraryError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (LibraryError::DuplicateReservation, StatusCode::CONFLICT),
            (LibraryError::OutOfStock, StatusCode::UNPROCESSABLE_ENTITY),
            (
                LibraryError::Storage("connection reset".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), expected);
        }
    }

    #[test]
    fn test_unauthenticated_is_401() {
        let response = ApiError::Unauthenticated("missing identity").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
