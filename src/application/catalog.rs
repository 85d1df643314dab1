use crate::domain::{self, Book, BookDetails, BookId, Principal};
use crate::ports::{BookQuery, DeleteOutcome};

use super::{LibraryError, Result, ServiceDependencies, load_book};

/// Registers a new title (staff only)
pub async fn add_book(
    deps: &ServiceDependencies,
    principal: &Principal,
    details: BookDetails,
) -> Result<Book> {
    principal.require_staff()?;

    let book = domain::add_book(details, deps.clock.now())?;
    deps.books
        .insert(&book)
        .await
        .map_err(LibraryError::Storage)?;

    tracing::info!(book_id = %book.book_id, title = %book.title, "book added");
    Ok(book)
}

/// Applies catalogue edits (staff only).
///
/// Stock may not go below the copies currently held for reservations; the
/// repository re-checks this against the live hold count.
pub async fn edit_book(
    deps: &ServiceDependencies,
    principal: &Principal,
    book_id: BookId,
    details: BookDetails,
) -> Result<Book> {
    principal.require_staff()?;

    let current = load_book(deps, book_id).await?;
    let edited = domain::edit_book(&current, details, deps.clock.now())?;

    let saved = deps
        .books
        .update(&edited)
        .await
        .map_err(LibraryError::Storage)?;
    if !saved {
        // Either deleted meanwhile or a hold raced in
        let latest = load_book(deps, book_id).await?;
        return Err(domain::BookError::StockBelowReserved {
            stock: edited.stock,
            reserved: latest.reserved_stock,
        }
        .into());
    }

    tracing::info!(book_id = %book_id, stock = edited.stock, "book updated");
    load_book(deps, book_id).await
}

/// Deletes a title with no open borrowings or pending reservations (staff only)
pub async fn delete_book(
    deps: &ServiceDependencies,
    principal: &Principal,
    book_id: BookId,
) -> Result<()> {
    principal.require_staff()?;

    match deps
        .books
        .delete(book_id)
        .await
        .map_err(LibraryError::Storage)?
    {
        DeleteOutcome::Deleted => {
            tracing::info!(book_id = %book_id, "book deleted");
            Ok(())
        }
        DeleteOutcome::NotFound => Err(LibraryError::BookNotFound),
        DeleteOutcome::InUse => Err(LibraryError::InUse(
            "book has open borrowings or pending reservations".to_string(),
        )),
    }
}

pub async fn get_book(deps: &ServiceDependencies, book_id: BookId) -> Result<Book> {
    load_book(deps, book_id).await
}

/// Catalogue search. Blank filters are ignored.
pub async fn search_books(deps: &ServiceDependencies, query: BookQuery) -> Result<Vec<Book>> {
    let query = BookQuery {
        text: query.text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
        category: query
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()),
    };

    deps.books
        .search(&query)
        .await
        .map_err(LibraryError::Storage)
}

pub async fn list_categories(deps: &ServiceDependencies) -> Result<Vec<String>> {
    deps.books
        .categories()
        .await
        .map_err(LibraryError::Storage)
}
