// Row Transform Operator
//
// Applies an ordered list of map, conditional-map and filter operations to
// each row. Expressions are compiled once per operation, not per row.

use log::debug;

use crate::catalog::schema::ColumnType;
use crate::common::types::qualify_in_scope;
use crate::pipeline::model::Operation;
use crate::query::executor::expression_eval::{compile, Evaluator};
use crate::query::executor::result::{QueryResult, Row};
use crate::query::executor::type_conversion::cast_to_type_if_needed;
use crate::query::parser::ast::Expression;

enum Step {
    Map {
        expression: Expression,
        target: String,
        target_type: Option<ColumnType>,
    },
    ConditionalMap {
        condition: Expression,
        when_true: Expression,
        when_false: Expression,
        target: String,
        target_type: Option<ColumnType>,
    },
    Filter {
        condition: Expression,
    },
}

struct CompiledOperation {
    step: Step,
    /// Operation text for error context
    context: String,
}

/// A compiled sequence of row operations for one scope
pub struct RowTransform {
    operations: Vec<CompiledOperation>,
}

impl RowTransform {
    /// Compile row operations. Aggregates are left to the aggregation stage.
    /// Targets are qualified with the scope alias when one is given.
    pub fn new(operations: &[Operation], scope: Option<&str>) -> QueryResult<Self> {
        let mut compiled = Vec::with_capacity(operations.len());
        for op in operations {
            let context = op.to_string();
            if let Some(step) = compile_operation(op, scope).map_err(|e| e.in_operation(context.as_str()))? {
                compiled.push(CompiledOperation { step, context });
            }
        }
        Ok(RowTransform { operations: compiled })
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Run every row through the operations, preserving input order.
    /// A failing filter drops the row and skips the remaining operations.
    pub fn apply(&self, rows: Vec<Row>, evaluator: &Evaluator) -> QueryResult<Vec<Row>> {
        let input = rows.len();
        let mut output = Vec::with_capacity(input);
        for row in rows {
            if let Some(row) = self.apply_row(row, evaluator)? {
                output.push(row);
            }
        }
        debug!(
            "Row transform{}: {} rows in, {} rows out",
            evaluator.scope().map(|s| format!(" [{}]", s)).unwrap_or_default(),
            input,
            output.len()
        );
        Ok(output)
    }

    /// Run one row through the operations; `None` when a filter rejects it
    pub fn apply_row(&self, mut row: Row, evaluator: &Evaluator) -> QueryResult<Option<Row>> {
        for op in &self.operations {
            let keep = run_step(&op.step, &mut row, evaluator).map_err(|e| e.in_operation(op.context.as_str()))?;
            if !keep {
                return Ok(None);
            }
        }
        Ok(Some(row))
    }
}

fn compile_operation(op: &Operation, scope: Option<&str>) -> QueryResult<Option<Step>> {
    Ok(Some(match op {
        Operation::Map {
            expression,
            target_column,
            target_type,
        } => Step::Map {
            expression: compile(expression)?,
            target: qualify_in_scope(scope, target_column),
            target_type: *target_type,
        },
        Operation::ConditionalMap {
            condition,
            true_expression,
            false_expression,
            target_column,
            target_type,
        } => Step::ConditionalMap {
            condition: compile(condition)?,
            when_true: compile(true_expression)?,
            when_false: compile(false_expression)?,
            target: qualify_in_scope(scope, target_column),
            target_type: *target_type,
        },
        Operation::Filter { condition } => Step::Filter {
            condition: compile(condition)?,
        },
        Operation::Aggregate { .. } => return Ok(None),
    }))
}

/// Execute one step against the row; false means the row was rejected
fn run_step(step: &Step, row: &mut Row, evaluator: &Evaluator) -> QueryResult<bool> {
    match step {
        Step::Map {
            expression,
            target,
            target_type,
        } => {
            let value = evaluator.evaluate_expression(expression, row)?;
            row.set(target.clone(), cast_to_type_if_needed(value, *target_type)?);
            Ok(true)
        }
        Step::ConditionalMap {
            condition,
            when_true,
            when_false,
            target,
            target_type,
        } => {
            let branch = if evaluator.evaluate_expression(condition, row)?.truthy()? {
                when_true
            } else {
                when_false
            };
            let value = evaluator.evaluate_expression(branch, row)?;
            row.set(target.clone(), cast_to_type_if_needed(value, *target_type)?);
            Ok(true)
        }
        Step::Filter { condition } => evaluator.evaluate_expression(condition, row)?.truthy(),
    }
}

/// Compile and apply row operations in one call
pub fn apply(rows: Vec<Row>, operations: &[Operation], evaluator: &Evaluator) -> QueryResult<Vec<Row>> {
    RowTransform::new(operations, evaluator.scope())?.apply(rows, evaluator)
}
