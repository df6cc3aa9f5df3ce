// Expression Parser Module
//
// This module turns transform expression strings into an abstract syntax
// tree (AST). Pipeline source text itself is parsed elsewhere.

pub mod lexer;
pub mod ast;
pub mod parser;

// Export key types
pub use self::ast::{BinaryOperator, ColumnReference, Expression, Literal, UnaryOperator};
pub use self::lexer::{Lexer, Token, TokenType};
pub use self::parser::{parse, ParseError, ParseResult, Parser};
