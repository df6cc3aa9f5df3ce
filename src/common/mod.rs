// Common definitions shared across the engine

pub mod types;

pub use self::types::{qualify, qualify_in_scope, split_qualified, QualifiedName};
