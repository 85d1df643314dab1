use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{BookError, BookId};

/// Catalogue entry with its shelf stock.
///
/// Invariant: `0 <= reserved_stock <= stock`. `stock` counts copies on the
/// shelf; `reserved_stock` of those are held for pending reservations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub category: String,
    pub isbn: Option<String>,
    /// Replacement value used to price damage
    pub book_value: Decimal,
    pub stock: i32,
    pub reserved_stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Copies that can still be reserved or lent over the counter
    pub fn available(&self) -> i32 {
        (self.stock - self.reserved_stock).max(0)
    }

    pub fn is_available(&self) -> bool {
        self.available() > 0
    }
}

/// Editable catalogue fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDetails {
    pub title: String,
    pub author: String,
    pub category: String,
    pub isbn: Option<String>,
    pub book_value: Decimal,
    pub stock: i32,
}

impl BookDetails {
    fn validate(&self) -> Result<(), BookError> {
        if self.title.trim().is_empty() {
            return Err(BookError::MissingField("title"));
        }
        if self.author.trim().is_empty() {
            return Err(BookError::MissingField("author"));
        }
        if self.category.trim().is_empty() {
            return Err(BookError::MissingField("category"));
        }
        if self.stock < 0 {
            return Err(BookError::NegativeStock);
        }
        if self.book_value < Decimal::ZERO {
            return Err(BookError::NegativeValue);
        }
        Ok(())
    }

    fn normalized_isbn(&self) -> Option<String> {
        self.isbn
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// Pure function: register a new title
pub fn add_book(details: BookDetails, now: DateTime<Utc>) -> Result<Book, BookError> {
    details.validate()?;
    let isbn = details.normalized_isbn();

    Ok(Book {
        book_id: BookId::new(),
        title: details.title.trim().to_string(),
        author: details.author.trim().to_string(),
        category: details.category.trim().to_string(),
        isbn,
        book_value: details.book_value,
        stock: details.stock,
        reserved_stock: 0,
        created_at: now,
        updated_at: now,
    })
}

/// Pure function: apply catalogue edits
///
/// Stock may not drop below the copies already held for reservations.
pub fn edit_book(book: &Book, details: BookDetails, now: DateTime<Utc>) -> Result<Book, BookError> {
    details.validate()?;
    if details.stock < book.reserved_stock {
        return Err(BookError::StockBelowReserved {
            stock: details.stock,
            reserved: book.reserved_stock,
        });
    }
    let isbn = details.normalized_isbn();

    Ok(Book {
        title: details.title.trim().to_string(),
        author: details.author.trim().to_string(),
        category: details.category.trim().to_string(),
        isbn,
        book_value: details.book_value,
        stock: details.stock,
        updated_at: now,
        ..book.clone()
    })
}
