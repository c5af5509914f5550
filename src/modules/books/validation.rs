//! Field rules for [`Book`] payloads.

use bookshelf_http::error::FieldError;
use once_cell::sync::Lazy;
use regex::Regex;

use super::models::Book;

static ISBN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{3}-[1-9][0-9]{9}$").expect("ISBN pattern is valid"));

pub const INVALID_ISBN: &str = "Invalid ISBN-13 value";
pub const MUST_NOT_BE_EMPTY: &str = "must not be empty";
pub const MUST_BE_POSITIVE: &str = "must be greater than 0";

/// Check every rule and collect all violations; an empty list means valid.
pub fn validate(book: &Book) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if !ISBN_PATTERN.is_match(&book.isbn) {
        errors.push(FieldError::new("isbn", INVALID_ISBN));
    }

    if book.title.is_empty() {
        errors.push(FieldError::new("title", MUST_NOT_BE_EMPTY));
    }

    if is_blank(&book.short_description) {
        errors.push(FieldError::new("shortDescription", MUST_NOT_BE_EMPTY));
    }

    if is_blank(&book.author) {
        errors.push(FieldError::new("author", MUST_NOT_BE_EMPTY));
    }

    if !book.page_count.is_some_and(|count| count > 0) {
        errors.push(FieldError::new("pageCount", MUST_BE_POSITIVE));
    }

    errors
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}
