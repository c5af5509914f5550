//! Static API key guard for protected operations.
//!
//! The credential is a single shared secret compared against the raw
//! `Authorization` header value. Which operations require it is read from
//! [`AuthSettings`], so gating can change without touching handlers.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::MethodRouter,
};
use bookshelf_http::error::AppError;
use bookshelf_kernel::settings::AuthSettings;

#[derive(Clone)]
pub struct ApiKeyGuard {
    api_key: Arc<str>,
    protected: Arc<HashSet<String>>,
}

impl ApiKeyGuard {
    pub fn new(
        api_key: impl Into<Arc<str>>,
        protected_operations: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            protected: Arc::new(protected_operations.into_iter().map(Into::into).collect()),
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(
            settings.api_key.as_str(),
            settings.protected_operations.iter().cloned(),
        )
    }

    /// Whether `operation` is configured to require the API key
    pub fn requires_key(&self, operation: &str) -> bool {
        self.protected.contains(operation)
    }

    /// Check the `Authorization` header against the configured key
    pub fn verify(&self, headers: &HeaderMap) -> Result<(), AppError> {
        let Some(value) = headers.get(AUTHORIZATION) else {
            return Err(AppError::unauthorized("No API key provided"));
        };

        if value.as_bytes() != self.api_key.as_bytes() {
            return Err(AppError::unauthorized("Invalid API key"));
        }

        Ok(())
    }

    /// Attach the key check to `route` when `operation` is protected
    pub fn protect<S>(&self, operation: &'static str, route: MethodRouter<S>) -> MethodRouter<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        if !self.requires_key(operation) {
            return route;
        }

        tracing::debug!(operation, "operation requires API key");
        route.route_layer(middleware::from_fn_with_state(
            (self.clone(), operation),
            require_api_key,
        ))
    }
}

async fn require_api_key(
    State((guard, operation)): State<(ApiKeyGuard, &'static str)>,
    request: Request,
    next: Next,
) -> Response {
    if let Err(err) = guard.verify(request.headers()) {
        tracing::warn!(operation, "rejected request without valid API key");
        return err.into_response();
    }

    next.run(request).await
}
