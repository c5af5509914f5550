pub mod books;

use bookshelf_kernel::ModuleRegistry;

/// Register all project-specific modules with the registry.
///
/// Adding a module means adding a line here; nothing is discovered at runtime.
pub fn register_all(registry: &mut ModuleRegistry) {
    registry.register(books::create_module());
}
