use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A catalog entry, keyed by its ISBN.
///
/// Missing or `null` JSON fields deserialize to empty values so the validator
/// reports them as field violations instead of failing body extraction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Natural key, `ddd-Ddddddddd` with a non-zero leading digit in the
    /// second block
    #[serde(default, deserialize_with = "null_as_empty")]
    pub isbn: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub page_count: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<DateTime<Utc>>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Query string accepted by the list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookQuery {
    pub search_term: Option<String>,
}

impl BookQuery {
    /// The search term, if one was given and is not blank
    pub fn term(&self) -> Option<&str> {
        self.search_term
            .as_deref()
            .filter(|term| !term.trim().is_empty())
    }
}
