// Pipeline Operators Module
//
// This module defines the batch operators used by the execution engine: the
// row transform (map, conditional map, filter) and grouped aggregation.

pub mod agg;
pub mod transform;

pub use self::agg::{reduce, AggregateType, HashAggregate};
pub use self::transform::{apply, RowTransform};
