//! Catalog Module
//!
//! Column metadata used by the static pipeline check: declared types, the
//! per-validation column registry and the validator itself.

pub mod registry;
pub mod schema;
pub mod validation;
pub mod validation_error;


// Re-export key types
pub use self::registry::ColumnRegistry;
pub use self::schema::{describe_type, ColumnType};
pub use self::validation::PipelineValidator;
pub use self::validation_error::{ValidationError, ValidationResult};
