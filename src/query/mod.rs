// Etlflow Query Processing Module
//
// This module contains the expression parser and the execution components
// (evaluator, row transforms, aggregation) that run pipeline operations.

pub mod parser;
pub mod executor;

// Export key public interfaces
pub use parser::parse;
pub use executor::engine::ExecutionEngine;
pub use executor::result::{QueryError, QueryResult, Row, Value};
