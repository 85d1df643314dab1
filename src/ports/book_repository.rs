use crate::domain::{Book, BookId};
use async_trait::async_trait;

use super::{DeleteOutcome, Result};

/// Catalogue search filter. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookQuery {
    /// Case-insensitive match on title or author
    pub text: Option<String>,
    pub category: Option<String>,
}

/// Catalogue persistence port
#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn insert(&self, book: &Book) -> Result<()>;

    /// Writes catalogue fields and stock.
    ///
    /// Guarded on `stock >= reserved_stock` at write time; returns `false`
    /// when the row is gone or a concurrent reservation raised the hold
    /// count above the new stock.
    async fn update(&self, book: &Book) -> Result<bool>;

    /// Refused with `InUse` while borrowings are open or reservations are
    /// pending for the book.
    async fn delete(&self, book_id: BookId) -> Result<DeleteOutcome>;

    async fn get_by_id(&self, book_id: BookId) -> Result<Option<Book>>;

    /// Ordered by title
    async fn search(&self, query: &BookQuery) -> Result<Vec<Book>>;

    /// Distinct categories in alphabetical order
    async fn categories(&self) -> Result<Vec<String>>;
}
