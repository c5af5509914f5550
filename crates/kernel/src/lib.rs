//! Core traits, settings, and the static module registry.

pub mod module;
pub mod registry;
pub mod settings;

pub use bookshelf_db::{DbPool, Migration};
pub use module::{InitCtx, Module};
pub use registry::ModuleRegistry;
