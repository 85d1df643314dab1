/// Catalogue edit errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookError {
    /// Required text field left empty
    MissingField(&'static str),
    NegativeStock,
    NegativeValue,
    /// New stock would drop below the units held by pending reservations
    StockBelowReserved { stock: i32, reserved: i32 },
}

/// Member registration errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberError {
    MissingField(&'static str),
    InvalidEmail,
}

/// Borrowing errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BorrowError {
    MemberSuspended,
    /// No unreserved copy left on the shelf
    OutOfStock,
    DueDateNotAfterBorrowDate,
}

/// Return errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnError {
    AlreadyReturned,
    ReturnBeforeBorrow,
}

/// Damage report errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DamageError {
    /// Damage can only be assessed once the book is back
    NotReturned,
    AlreadyRecorded,
    MissingNotes,
}

/// Payment errors for fines and penalties
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    AlreadyPaid,
    NothingOwed,
}

/// Reservation state machine errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationError {
    MemberSuspended,
    NoStockAvailable,
    DuplicatePending,
    /// Transition attempted from a terminal state
    NotPending(&'static str),
    /// Expiry requested before the pickup deadline
    DeadlineNotReached,
    /// Deadline or due date falls outside the representable calendar
    DateOutOfRange,
}

/// Capability check failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDenied {
    StaffOnly,
    MembersOnly,
    NotOwner,
}
