use crate::domain::{Book, BookId};
use crate::ports::{BookQuery, BookRepository as BookRepositoryTrait, DeleteOutcome, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

const BOOK_COLUMNS: &str = r#"
    book_id,
    title,
    author,
    category,
    isbn,
    book_value,
    stock,
    reserved_stock,
    created_at,
    updated_at
"#;

/// Maps a `books` row onto the domain entity
pub(super) fn map_row_to_book(row: &PgRow) -> Result<Book> {
    Ok(Book {
        book_id: BookId::from_uuid(row.try_get("book_id")?),
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        category: row.try_get("category")?,
        isbn: row.try_get("isbn")?,
        book_value: row.try_get("book_value")?,
        stock: row.try_get("stock")?,
        reserved_stock: row.try_get("reserved_stock")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// PostgreSQL catalogue
pub struct BookRepository {
    pool: PgPool,
}

impl BookRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepositoryTrait for BookRepository {
    async fn insert(&self, book: &Book) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO books (
                book_id,
                title,
                author,
                category,
                isbn,
                book_value,
                stock,
                reserved_stock,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(book.book_id.value())
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.category)
        .bind(&book.isbn)
        .bind(book.book_value)
        .bind(book.stock)
        .bind(book.reserved_stock)
        .bind(book.created_at)
        .bind(book.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// `reserved_stock` is never written here; the guard compares the new
    /// stock against the live hold count.
    async fn update(&self, book: &Book) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET title = $2,
                author = $3,
                category = $4,
                isbn = $5,
                book_value = $6,
                stock = $7,
                updated_at = $8
            WHERE book_id = $1 AND $7 >= reserved_stock
            "#,
        )
        .bind(book.book_id.value())
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.category)
        .bind(&book.isbn)
        .bind(book.book_value)
        .bind(book.stock)
        .bind(book.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, book_id: BookId) -> Result<DeleteOutcome> {
        let mut tx = self.pool.begin().await?;

        // Row lock keeps new borrowings and holds out until the delete commits
        let exists: Option<i32> =
            sqlx::query_scalar("SELECT 1 FROM books WHERE book_id = $1 FOR UPDATE")
                .bind(book_id.value())
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Ok(DeleteOutcome::NotFound);
        }

        let in_use: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM borrowing_transactions
                WHERE book_id = $1 AND status = 'borrowed'
            ) OR EXISTS (
                SELECT 1 FROM reservations
                WHERE book_id = $1 AND status = 'pending'
            )
            "#,
        )
        .bind(book_id.value())
        .fetch_one(&mut *tx)
        .await?;
        if in_use {
            return Ok(DeleteOutcome::InUse);
        }

        sqlx::query("DELETE FROM books WHERE book_id = $1")
            .bind(book_id.value())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(DeleteOutcome::Deleted)
    }

    async fn get_by_id(&self, book_id: BookId) -> Result<Option<Book>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM books WHERE book_id = $1",
            BOOK_COLUMNS
        ))
        .bind(book_id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_book).transpose()
    }

    /// Unset filters are passed as NULL and short-circuit in SQL
    async fn search(&self, query: &BookQuery) -> Result<Vec<Book>> {
        let pattern = query
            .text
            .as_deref()
            .map(|t| format!("%{}%", t.replace('%', "\\%").replace('_', "\\_")));

        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM books
            WHERE ($1::text IS NULL OR title ILIKE $1 OR author ILIKE $1)
              AND ($2::text IS NULL OR category = $2)
            ORDER BY title ASC
            "#,
            BOOK_COLUMNS
        ))
        .bind(pattern)
        .bind(&query.category)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_book).collect()
    }

    async fn categories(&self) -> Result<Vec<String>> {
        let categories: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT category FROM books ORDER BY category ASC")
                .fetch_all(&self.pool)
                .await?;

        Ok(categories)
    }
}
