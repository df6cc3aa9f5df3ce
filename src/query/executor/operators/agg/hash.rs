// Hash-based Aggregation Operator
//
// Groups rows by the canonical text of their group-by values and reduces one
// expression per aggregate. Groups are emitted in first-occurrence order.

use linked_hash_map::LinkedHashMap;
use log::debug;
use rust_decimal::Decimal;

use crate::catalog::schema::ColumnType;
use crate::common::types::qualify_in_scope;
use crate::config::{AggregateMode, EngineConfig};
use crate::pipeline::model::Operation;
use crate::query::executor::expression_eval::{compile, Evaluator};
use crate::query::executor::result::{QueryError, QueryResult, Row, Value};
use crate::query::executor::type_conversion::{coerce_to_number, convert};
use crate::query::parser::ast::{ColumnReference, Expression};
use super::AggregateType;

/// Running state of one aggregate within one group
#[derive(Debug, Clone)]
struct Accumulator {
    agg_type: AggregateType,
    /// Count of non-null values
    count: u64,
    sum: Decimal,
    min: Option<Decimal>,
    max: Option<Decimal>,
}

impl Accumulator {
    fn new(agg_type: AggregateType) -> Self {
        Accumulator {
            agg_type,
            count: 0,
            sum: Decimal::ZERO,
            min: None,
            max: None,
        }
    }

    /// Fold one evaluated value into the state. NULL values are skipped.
    fn update(&mut self, value: &Value) -> QueryResult<()> {
        if value.is_null() {
            return Ok(());
        }
        if self.agg_type == AggregateType::Count {
            self.count += 1;
            return Ok(());
        }

        let Some(number) = coerce_to_number(value)? else {
            return Ok(());
        };
        self.count += 1;
        match self.agg_type {
            AggregateType::Sum | AggregateType::Avg => {
                self.sum = self.sum.checked_add(number).ok_or(QueryError::NumericOverflow)?;
            }
            AggregateType::Min => {
                self.min = Some(self.min.map_or(number, |current| current.min(number)));
            }
            AggregateType::Max => {
                self.max = Some(self.max.map_or(number, |current| current.max(number)));
            }
            AggregateType::Count => {}
        }
        Ok(())
    }

    /// Final value. Without values SUM and COUNT are 0, MIN and MAX are NULL
    /// and AVG fails unless empty groups are allowed.
    fn finish(&self, target: &str, allow_empty_groups: bool) -> QueryResult<Value> {
        match self.agg_type {
            AggregateType::Count => Ok(Value::Number(Decimal::from(self.count))),
            AggregateType::Sum => Ok(Value::Number(self.sum)),
            AggregateType::Avg => {
                if self.count == 0 {
                    return if allow_empty_groups {
                        Ok(Value::Number(Decimal::ZERO))
                    } else {
                        Err(QueryError::EmptyAggregate {
                            function: self.agg_type.to_string(),
                            target: target.to_string(),
                        })
                    };
                }
                self.sum
                    .checked_div(Decimal::from(self.count))
                    .map(Value::Number)
                    .ok_or(QueryError::NumericOverflow)
            }
            AggregateType::Min => Ok(self.min.map_or(Value::Null, Value::Number)),
            AggregateType::Max => Ok(self.max.map_or(Value::Null, Value::Number)),
        }
    }
}

/// One aggregate operation, compiled
struct AggregateSpec {
    agg_type: AggregateType,
    expression: Expression,
    group_by: Vec<ColumnReference>,
    target: String,
    target_type: Option<ColumnType>,
    context: String,
}

impl AggregateSpec {
    fn compile(op: &Operation, scope: Option<&str>) -> QueryResult<Option<Self>> {
        let Operation::Aggregate {
            function,
            expression,
            group_by_columns,
            target_column,
            target_type,
        } = op
        else {
            return Ok(None);
        };
        Ok(Some(AggregateSpec {
            agg_type: function.parse()?,
            expression: compile(expression)?,
            group_by: group_by_columns
                .iter()
                .map(|c| ColumnReference::from_identifier(c.trim()))
                .collect(),
            target: qualify_in_scope(scope, target_column),
            target_type: *target_type,
            context: op.to_string(),
        }))
    }
}

/// Group state: the group-by values copied from the first row of the group
/// plus one accumulator per aggregate
struct Group {
    keys: Vec<(String, Value)>,
    accumulators: Vec<Accumulator>,
}

/// Aggregates sharing one output row per group
struct Cluster {
    specs: Vec<AggregateSpec>,
}

/// Hash aggregation over a batch of rows
pub struct HashAggregate {
    clusters: Vec<Cluster>,
    mode: AggregateMode,
    allow_empty_groups: bool,
}

impl HashAggregate {
    /// Compile the aggregate operations among `operations`. In wide mode
    /// aggregates with identical group-by lists share output rows.
    pub fn new(operations: &[Operation], scope: Option<&str>, config: &EngineConfig) -> QueryResult<Self> {
        let mut clusters: Vec<Cluster> = Vec::new();
        for op in operations {
            let Some(spec) = AggregateSpec::compile(op, scope).map_err(|e| e.in_operation(op.to_string()))? else {
                continue;
            };
            let shared = match config.aggregate_mode {
                AggregateMode::Wide => clusters
                    .iter_mut()
                    .find(|c| c.specs.first().is_some_and(|first| same_group_by(&first.group_by, &spec.group_by))),
                AggregateMode::Narrow => None,
            };
            match shared {
                Some(cluster) => cluster.specs.push(spec),
                None => clusters.push(Cluster { specs: vec![spec] }),
            }
        }
        Ok(HashAggregate {
            clusters,
            mode: config.aggregate_mode,
            allow_empty_groups: config.allow_empty_groups,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Reduce the rows. Output rows replace the input rows.
    pub fn execute(&self, rows: &[Row], evaluator: &Evaluator) -> QueryResult<Vec<Row>> {
        let mut output = Vec::new();
        for cluster in &self.clusters {
            let groups = self.group_rows(cluster, rows, evaluator)?;
            debug!(
                "{:?} aggregation of {} over {} rows produced {} groups",
                self.mode,
                cluster.specs.len(),
                rows.len(),
                groups.len()
            );
            for group in groups {
                output.push(self.finish_group(cluster, group, evaluator)?);
            }
        }
        Ok(output)
    }

    fn group_rows(&self, cluster: &Cluster, rows: &[Row], evaluator: &Evaluator) -> QueryResult<Vec<Group>> {
        let Some(first) = cluster.specs.first() else {
            return Ok(Vec::new());
        };
        let mut groups: LinkedHashMap<Vec<Option<String>>, Group> = LinkedHashMap::new();

        for row in rows {
            let mut keys = Vec::with_capacity(first.group_by.len());
            for col_ref in &first.group_by {
                let key = evaluator
                    .resolve_column_key(col_ref, row)
                    .map_err(|e| e.in_operation(first.context.as_str()))?;
                let value = row.get(key).cloned().unwrap_or(Value::Null);
                keys.push((key.clone(), value));
            }
            let group_key: Vec<Option<String>> = keys.iter().map(|(_, v)| v.canonical()).collect();

            if !groups.contains_key(&group_key) {
                let accumulators = cluster.specs.iter().map(|s| Accumulator::new(s.agg_type)).collect();
                groups.insert(group_key.clone(), Group { keys, accumulators });
            }
            if let Some(group) = groups.get_mut(&group_key) {
                for (spec, acc) in cluster.specs.iter().zip(group.accumulators.iter_mut()) {
                    evaluator
                        .evaluate_expression(&spec.expression, row)
                        .and_then(|v| acc.update(&v))
                        .map_err(|e| e.in_operation(spec.context.as_str()))?;
                }
            }
        }

        // An ungrouped aggregate over no rows has a single empty group
        if groups.is_empty() && first.group_by.is_empty() && self.allow_empty_groups {
            let accumulators = cluster.specs.iter().map(|s| Accumulator::new(s.agg_type)).collect();
            groups.insert(Vec::new(), Group { keys: Vec::new(), accumulators });
        }

        Ok(groups.into_iter().map(|(_, group)| group).collect())
    }

    fn finish_group(&self, cluster: &Cluster, group: Group, evaluator: &Evaluator) -> QueryResult<Row> {
        let mut row = Row::new();
        row.set_origin(evaluator.scope().map(str::to_string));
        for (key, value) in group.keys {
            row.set(key, value);
        }
        for (spec, acc) in cluster.specs.iter().zip(&group.accumulators) {
            let value = acc
                .finish(&spec.target, self.allow_empty_groups)
                .and_then(|v| match v {
                    Value::Null => Ok(Value::Null),
                    other => match spec.target_type {
                        Some(target_type) => convert(other, target_type),
                        None => Ok(other),
                    },
                })
                .map_err(|e| e.in_operation(spec.context.as_str()))?;
            row.set(spec.target.clone(), value);
        }
        Ok(row)
    }
}

fn same_group_by(a: &[ColumnReference], b: &[ColumnReference]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| x.full_name().eq_ignore_ascii_case(&y.full_name()))
}

/// Compile and run the aggregate operations among `operations`
pub fn reduce(
    rows: &[Row],
    operations: &[Operation],
    evaluator: &Evaluator,
    config: &EngineConfig,
) -> QueryResult<Vec<Row>> {
    HashAggregate::new(operations, evaluator.scope(), config)?.execute(rows, evaluator)
}
