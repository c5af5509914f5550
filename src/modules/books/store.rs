//! Persistence for [`Book`] records.
//!
//! Every operation is a single SQL statement on a pooled connection, so the
//! connection goes back to the pool on every exit path and no operation can
//! leave a partial record behind.

use async_trait::async_trait;
use bookshelf_db::DbPool;
use thiserror::Error;

use super::models::Book;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("a book with this isbn already exists")]
    AlreadyExists,

    #[error("no book with this isbn")]
    NotFound,

    #[error("database failure: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait BookStore: Send + Sync {
    /// Exact key lookup; a miss is `Ok(None)`
    async fn get_by_isbn(&self, isbn: &str) -> Result<Option<Book>, StoreError>;

    async fn get_all(&self) -> Result<Vec<Book>, StoreError>;

    /// Case-insensitive substring match on the title
    async fn search_by_title(&self, term: &str) -> Result<Vec<Book>, StoreError>;

    /// Insert `book` unless its isbn is taken, in which case nothing is
    /// written and [`StoreError::AlreadyExists`] is returned
    async fn create(&self, book: &Book) -> Result<(), StoreError>;

    /// Replace every field of the stored record with the same isbn
    async fn update(&self, book: &Book) -> Result<(), StoreError>;

    async fn delete(&self, isbn: &str) -> Result<(), StoreError>;
}

const SELECT_BOOK: &str = r#"
    SELECT isbn, title, author, short_description, page_count, release_date
    FROM books
"#;

/// [`BookStore`] backed by the `books` table.
#[derive(Clone)]
pub struct SqlBookStore {
    pool: DbPool,
}

impl SqlBookStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookStore for SqlBookStore {
    #[tracing::instrument(skip(self))]
    async fn get_by_isbn(&self, isbn: &str) -> Result<Option<Book>, StoreError> {
        let book = sqlx::query_as::<_, Book>(&format!("{SELECT_BOOK} WHERE isbn = ?1"))
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await?;

        Ok(book)
    }

    #[tracing::instrument(skip(self))]
    async fn get_all(&self) -> Result<Vec<Book>, StoreError> {
        let books = sqlx::query_as::<_, Book>(&format!("{SELECT_BOOK} ORDER BY isbn"))
            .fetch_all(&self.pool)
            .await?;

        Ok(books)
    }

    #[tracing::instrument(skip(self))]
    async fn search_by_title(&self, term: &str) -> Result<Vec<Book>, StoreError> {
        // SQLite's lower() only folds ASCII, so titles are folded here.
        let needle = term.to_lowercase();
        let books: Vec<Book> = self
            .get_all()
            .await?
            .into_iter()
            .filter(|book| book.title.to_lowercase().contains(&needle))
            .collect();

        tracing::debug!(matches = books.len(), "title search finished");
        Ok(books)
    }

    #[tracing::instrument(skip(self, book), fields(isbn = %book.isbn))]
    async fn create(&self, book: &Book) -> Result<(), StoreError> {
        // The primary key decides the race; losers see zero affected rows.
        let result = sqlx::query(
            r#"
            INSERT INTO books (isbn, title, author, short_description, page_count, release_date)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (isbn) DO NOTHING
            "#,
        )
        .bind(&book.isbn)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.short_description)
        .bind(book.page_count)
        .bind(book.release_date)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e
                .as_database_error()
                .is_some_and(|db_err| db_err.is_unique_violation())
            {
                StoreError::AlreadyExists
            } else {
                StoreError::Database(e)
            }
        })?;

        if result.rows_affected() == 0 {
            tracing::debug!("create skipped, isbn already present");
            return Err(StoreError::AlreadyExists);
        }

        tracing::info!("book created");
        Ok(())
    }

    #[tracing::instrument(skip(self, book), fields(isbn = %book.isbn))]
    async fn update(&self, book: &Book) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET title = ?2,
                author = ?3,
                short_description = ?4,
                page_count = ?5,
                release_date = ?6
            WHERE isbn = ?1
            "#,
        )
        .bind(&book.isbn)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.short_description)
        .bind(book.page_count)
        .bind(book.release_date)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        tracing::info!("book updated");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, isbn: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM books WHERE isbn = ?1")
            .bind(isbn)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        tracing::info!("book deleted");
        Ok(())
    }
}
