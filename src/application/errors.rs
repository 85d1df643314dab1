use crate::domain::{
    AccessDenied, BookError, BorrowError, DamageError, MemberError, PaymentError,
    ReservationError, ReturnError,
};
use thiserror::Error;

/// Application-layer errors shared by every use case
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Access denied: {0}")]
    AccessDenied(&'static str),

    #[error("Book not found")]
    BookNotFound,

    #[error("Member not found")]
    MemberNotFound,

    #[error("Borrowing not found")]
    BorrowingNotFound,

    #[error("Reservation not found")]
    ReservationNotFound,

    #[error("Fine not found")]
    FineNotFound,

    #[error("Penalty not found")]
    PenaltyNotFound,

    /// Request data failed validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Member is suspended")]
    MemberSuspended,

    #[error("No copies available")]
    OutOfStock,

    #[error("Member already has a pending reservation for this book")]
    DuplicateReservation,

    #[error("Email address is already registered")]
    DuplicateEmail,

    /// The target exists but its current state forbids the operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Delete refused because dependent records are still open
    #[error("In use: {0}")]
    InUse(String),

    #[error("Storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, LibraryError>;

impl From<AccessDenied> for LibraryError {
    fn from(err: AccessDenied) -> Self {
        LibraryError::AccessDenied(match err {
            AccessDenied::StaffOnly => "staff only",
            AccessDenied::MembersOnly => "members only",
            AccessDenied::NotOwner => "record belongs to another member",
        })
    }
}

impl From<BookError> for LibraryError {
    fn from(err: BookError) -> Self {
        match err {
            BookError::MissingField(field) => {
                LibraryError::InvalidInput(format!("{} is required", field))
            }
            BookError::NegativeStock => {
                LibraryError::InvalidInput("stock cannot be negative".to_string())
            }
            BookError::NegativeValue => {
                LibraryError::InvalidInput("book value cannot be negative".to_string())
            }
            BookError::StockBelowReserved { stock, reserved } => LibraryError::InvalidState(
                format!("stock {} is below the {} copies held for reservations", stock, reserved),
            ),
        }
    }
}

impl From<MemberError> for LibraryError {
    fn from(err: MemberError) -> Self {
        match err {
            MemberError::MissingField(field) => {
                LibraryError::InvalidInput(format!("{} is required", field))
            }
            MemberError::InvalidEmail => {
                LibraryError::InvalidInput("email address is malformed".to_string())
            }
        }
    }
}

impl From<BorrowError> for LibraryError {
    fn from(err: BorrowError) -> Self {
        match err {
            BorrowError::MemberSuspended => LibraryError::MemberSuspended,
            BorrowError::OutOfStock => LibraryError::OutOfStock,
            BorrowError::DueDateNotAfterBorrowDate => {
                LibraryError::InvalidInput("due date must be after the borrow date".to_string())
            }
        }
    }
}

impl From<ReturnError> for LibraryError {
    fn from(err: ReturnError) -> Self {
        match err {
            ReturnError::AlreadyReturned => {
                LibraryError::InvalidState("book has already been returned".to_string())
            }
            ReturnError::ReturnBeforeBorrow => LibraryError::InvalidInput(
                "return date cannot be before the borrow date".to_string(),
            ),
        }
    }
}

impl From<DamageError> for LibraryError {
    fn from(err: DamageError) -> Self {
        match err {
            DamageError::NotReturned => {
                LibraryError::InvalidState("book has not been returned yet".to_string())
            }
            DamageError::AlreadyRecorded => {
                LibraryError::InvalidState("damage already recorded for this borrowing".to_string())
            }
            DamageError::MissingNotes => {
                LibraryError::InvalidInput("damage notes are required".to_string())
            }
        }
    }
}

impl From<PaymentError> for LibraryError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::AlreadyPaid => LibraryError::InvalidState("already paid".to_string()),
            PaymentError::NothingOwed => {
                LibraryError::InvalidState("nothing is owed on this record".to_string())
            }
        }
    }
}

impl From<ReservationError> for LibraryError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::MemberSuspended => LibraryError::MemberSuspended,
            ReservationError::NoStockAvailable => LibraryError::OutOfStock,
            ReservationError::DuplicatePending => LibraryError::DuplicateReservation,
            ReservationError::NotPending(action) => LibraryError::InvalidState(format!(
                "reservation is no longer pending and cannot {}",
                action
            )),
            ReservationError::DeadlineNotReached => {
                LibraryError::InvalidState("pickup deadline has not passed".to_string())
            }
            ReservationError::DateOutOfRange => {
                LibraryError::InvalidInput("current time is out of range".to_string())
            }
        }
    }
}
