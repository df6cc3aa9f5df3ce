// Etlflow Pipeline Engine

pub mod common;
pub mod config;
pub mod catalog;
pub mod pipeline;
pub mod query;

// Re-export key items for convenient access
pub use config::{AggregateMode, EngineConfig};
pub use catalog::{ColumnRegistry, ColumnType, PipelineValidator, ValidationError};
pub use pipeline::{EtlError, EtlResult, Pipeline};
pub use query::executor::engine::ExecutionEngine;
pub use query::executor::expression_eval::{evaluate, Evaluator};
pub use query::executor::result::{QueryError, QueryResult, Row, Value};
pub use query::executor::type_conversion::convert;
