// Pipeline Executor Module
//
// This module is responsible for running pipeline operations over rows:
// expression evaluation, type conversion, row transforms and aggregation.

pub mod engine;
pub mod expression_eval;
pub mod operators;
pub mod result;
pub mod type_conversion;

// Export key types
pub use self::engine::ExecutionEngine;
pub use self::expression_eval::{compile, evaluate, Evaluator};
pub use self::result::{QueryError, QueryResult, Row, Value};
