// Expression Abstract Syntax Tree (AST) Implementation
//
// This module defines the AST nodes for parsed transform expressions.

use std::fmt;

use rust_decimal::Decimal;

use crate::common::types::{split_qualified, QualifiedName};

/// Expression in the transform language
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal value
    Literal(Literal),
    /// Column reference
    Column(ColumnReference),
    /// Binary operation (e.g., a + b, x = y)
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    /// Unary operation (NOT x, -x)
    UnaryOp {
        op: UnaryOperator,
        expr: Box<Expression>,
    },
}

/// Literal values
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Number(Decimal),
    String(String),
    Boolean(bool),
}

/// Column reference (could be qualified with a source alias)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnReference {
    pub table: Option<String>,
    pub name: String,
}

impl ColumnReference {
    /// Build a reference from an identifier token, splitting at the first dot
    pub fn from_identifier(identifier: &str) -> Self {
        match split_qualified(identifier) {
            Some((table, name)) => ColumnReference {
                table: Some(table.to_string()),
                name: name.to_string(),
            },
            None => ColumnReference {
                table: None,
                name: identifier.to_string(),
            },
        }
    }

    /// The name as written (`alias.field` or `field`)
    pub fn full_name(&self) -> QualifiedName {
        match &self.table {
            Some(table) => format!("{}.{}", table, self.name),
            None => self.name.clone(),
        }
    }

    pub fn is_qualified(&self) -> bool {
        self.table.is_some()
    }
}

/// Binary operators, grouped by precedence level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Logical
    Or,
    And,
    // Comparison
    Equals,
    NotEquals,
    LessThan,
    GreaterThan,
    LessEquals,
    GreaterEquals,
    Contains,
    // Arithmetic
    Plus,
    Minus,
    Multiply,
    Divide,
}

impl BinaryOperator {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Equals
                | BinaryOperator::NotEquals
                | BinaryOperator::LessThan
                | BinaryOperator::GreaterThan
                | BinaryOperator::LessEquals
                | BinaryOperator::GreaterEquals
                | BinaryOperator::Contains
        )
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Or => "OR",
            BinaryOperator::And => "AND",
            BinaryOperator::Equals => "=",
            BinaryOperator::NotEquals => "!=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::LessEquals => "<=",
            BinaryOperator::GreaterEquals => ">=",
            BinaryOperator::Contains => "CONTAINS",
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Minus,
}

impl Expression {
    /// All column references in evaluation order
    pub fn column_references(&self) -> Vec<&ColumnReference> {
        let mut refs = Vec::new();
        self.collect_columns(&mut refs);
        refs
    }

    fn collect_columns<'a>(&'a self, refs: &mut Vec<&'a ColumnReference>) {
        match self {
            Expression::Literal(_) => {}
            Expression::Column(col_ref) => refs.push(col_ref),
            Expression::BinaryOp { left, right, .. } => {
                left.collect_columns(refs);
                right.collect_columns(refs);
            }
            Expression::UnaryOp { expr, .. } => expr.collect_columns(refs),
        }
    }

    /// Whether any comparison operator (including CONTAINS) appears in the tree
    pub fn has_comparison(&self) -> bool {
        match self {
            Expression::Literal(_) | Expression::Column(_) => false,
            Expression::BinaryOp { left, op, right } => {
                op.is_comparison() || left.has_comparison() || right.has_comparison()
            }
            Expression::UnaryOp { expr, .. } => expr.has_comparison(),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "NULL"),
            Literal::Number(n) => write!(f, "{}", n),
            Literal::String(s) => write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            Literal::Boolean(true) => write!(f, "TRUE"),
            Literal::Boolean(false) => write!(f, "FALSE"),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(lit) => write!(f, "{}", lit),
            Expression::Column(col_ref) => write!(f, "{}", col_ref.full_name()),
            Expression::BinaryOp { left, op, right } => write!(f, "({} {} {})", left, op.symbol(), right),
            Expression::UnaryOp { op: UnaryOperator::Not, expr } => write!(f, "(NOT {})", expr),
            Expression::UnaryOp { op: UnaryOperator::Minus, expr } => write!(f, "(-{})", expr),
        }
    }
}
