pub mod book_repository;
pub mod circulation_store;
pub mod clock;
pub mod member_repository;
pub mod reservation_store;
pub mod suspension_store;

pub use book_repository::*;
pub use circulation_store::*;
pub use clock::*;
pub use member_repository::*;
pub use reservation_store::*;
pub use suspension_store::*;

/// Result returned by every persistence port.
///
/// Adapters box their native error so the application layer stays free of
/// driver types.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Outcome of a delete guarded by dependent records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    /// Rows that must outlive the target still reference it
    InUse,
}
