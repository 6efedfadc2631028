/// Module-Type Catalog
///
/// This module defines the static catalog of module types the engine can
/// execute. It provides:
/// - Type definitions (ModuleType, ModuleCategory, FieldSchema)
/// - The read-only registry populated once at process start

// Module type and config schema definitions
pub mod types;

// Built-in catalog and type resolution
pub mod registry;

// Re-export commonly used types
pub use registry::ModuleCatalog;
pub use types::{FieldKind, FieldSchema, ModuleCategory, ModuleType};
