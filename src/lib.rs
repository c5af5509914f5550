//! Bookshelf application library
//!
//! Wires the registered modules, the database pool, and the HTTP router into
//! a runnable [`App`].

pub mod modules;

use anyhow::Context;
use axum::Router;
use bookshelf_db::DbPool;
use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// Re-export commonly used types
pub use modules::*;

/// A fully initialized application: settings, pool, and registered modules.
pub struct App {
    settings: Settings,
    pool: DbPool,
    registry: ModuleRegistry,
}

impl App {
    /// Connect to the configured database and initialize every module.
    pub async fn bootstrap(settings: Settings) -> anyhow::Result<Self> {
        let pool = bookshelf_db::create_pool(&settings.database.db_config())
            .await
            .context("failed to connect to database")?;
        Self::with_pool(settings, pool).await
    }

    /// Initialize every module against an existing pool.
    pub async fn with_pool(settings: Settings, pool: DbPool) -> anyhow::Result<Self> {
        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry);

        let app = Self {
            settings,
            pool,
            registry,
        };
        app.registry.init_modules(&app.ctx()).await?;
        Ok(app)
    }

    fn ctx(&self) -> InitCtx<'_> {
        InitCtx {
            settings: &self.settings,
            db: &self.pool,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Apply pending migrations from every module; returns how many ran.
    pub async fn migrate(&self) -> anyhow::Result<usize> {
        let migrations = self.registry.collect_migrations();
        let applied = bookshelf_db::run_migrations(&self.pool, &migrations)
            .await
            .context("failed to apply migrations")?;

        tracing::info!(
            applied,
            total = migrations.len(),
            "database migrations complete"
        );
        Ok(applied)
    }

    /// Router with every module mounted and the global middleware stack.
    pub fn router(&self) -> Router {
        bookshelf_http::build_router(&self.registry, &self.ctx())
    }

    /// Migrate, start modules, and serve until a shutdown signal arrives.
    pub async fn serve(self) -> anyhow::Result<()> {
        self.migrate().await?;
        self.registry.start_modules(&self.ctx()).await?;

        let result = bookshelf_http::start_server(self.router(), &self.settings.server).await;

        self.registry.stop_modules().await?;
        self.pool.close().await;
        result
    }
}
