pub mod models;
pub mod routes;
pub mod store;
pub mod validation;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookshelf_authz::ApiKeyGuard;
use bookshelf_kernel::{InitCtx, Migration, Module};

use store::SqlBookStore;

pub(crate) const MODULE_NAME: &str = "books";

/// Book catalog: CRUD and title search over the `books` table
pub struct BooksModule;

impl BooksModule {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for BooksModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        MODULE_NAME
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            protected_operations = ?ctx.settings.auth.protected_operations,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self, ctx: &InitCtx<'_>) -> Router {
        let store = Arc::new(SqlBookStore::new(ctx.db.clone()));
        let guard = ApiKeyGuard::from_settings(&ctx.settings.auth);
        routes::router(store, &guard)
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_create_books",
            up: r#"
                CREATE TABLE IF NOT EXISTS books (
                    isbn              TEXT PRIMARY KEY NOT NULL,
                    title             TEXT NOT NULL,
                    author            TEXT NULL,
                    short_description TEXT NULL,
                    page_count        INTEGER NULL,
                    release_date      TEXT NULL
                );
                "#,
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module() -> Arc<dyn Module> {
    Arc::new(BooksModule::new())
}
