//! HTTP handlers for the books resource.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use bookshelf_authz::ApiKeyGuard;
use bookshelf_http::error::{AppError, FieldError};

use super::models::{Book, BookQuery};
use super::store::{BookStore, StoreError};
use super::validation;

#[derive(Clone)]
struct BooksState {
    store: Arc<dyn BookStore>,
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists => {
                AppError::validation(vec![FieldError::new("isbn", "Already exists")])
            }
            StoreError::NotFound => AppError::not_found("Book not found"),
            StoreError::Database(e) => AppError::Internal(anyhow::Error::new(e)),
        }
    }
}

/// Routes relative to the module mount point. Mutating routes are wrapped by
/// `guard` according to its configured policy.
pub fn router(store: Arc<dyn BookStore>, guard: &ApiKeyGuard) -> Router {
    Router::new()
        .route(
            "/",
            get(list_books).merge(guard.protect("create", post(create_book))),
        )
        .route(
            "/{isbn}",
            get(get_book)
                .merge(guard.protect("update", put(update_book)))
                .merge(guard.protect("delete", delete(delete_book))),
        )
        .with_state(BooksState { store })
}

fn parse_body(payload: Result<Json<Book>, JsonRejection>) -> Result<Book, AppError> {
    payload
        .map(|Json(book)| book)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

fn ensure_valid(book: &Book) -> Result<(), AppError> {
    let errors = validation::validate(book);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation(errors))
    }
}

async fn list_books(
    State(state): State<BooksState>,
    Query(query): Query<BookQuery>,
) -> Result<Json<Vec<Book>>, AppError> {
    let books = match query.term() {
        Some(term) => state.store.search_by_title(term).await?,
        None => state.store.get_all().await?,
    };
    Ok(Json(books))
}

async fn get_book(
    State(state): State<BooksState>,
    Path(isbn): Path<String>,
) -> Result<Json<Book>, AppError> {
    state
        .store
        .get_by_isbn(&isbn)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Book not found"))
}

async fn create_book(
    State(state): State<BooksState>,
    payload: Result<Json<Book>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let book = parse_body(payload)?;
    ensure_valid(&book)?;

    state.store.create(&book).await?;

    let location = format!("/{}/{}", super::MODULE_NAME, book.isbn);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(book)))
}

async fn update_book(
    State(state): State<BooksState>,
    Path(isbn): Path<String>,
    payload: Result<Json<Book>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let mut book = parse_body(payload)?;
    // The path names the record; a different isbn in the body is ignored.
    book.isbn = isbn;
    ensure_valid(&book)?;

    state.store.update(&book).await?;
    Ok(Json(book))
}

async fn delete_book(
    State(state): State<BooksState>,
    Path(isbn): Path<String>,
) -> Result<StatusCode, AppError> {
    state.store.delete(&isbn).await?;
    Ok(StatusCode::NO_CONTENT)
}
