// Expression Parser Implementation
//
// Precedence-climbing parser over the token stream produced by the lexer.
// Precedence, low to high: OR < AND < NOT < comparison < additive
// < multiplicative < unary minus / atom. Binary operators are left-associative.

use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::query::parser::ast::{BinaryOperator, ColumnReference, Expression, Literal, UnaryOperator};
use crate::query::parser::lexer::{tokenize, Token, TokenType};

/// Expression parsing errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token {0}")]
    UnexpectedToken(Token),
    #[error("Expected {expected}, found {found}")]
    ExpectedToken { expected: String, found: Token },
    #[error("Invalid literal: {0}")]
    InvalidLiteral(String),
    #[error("Illegal input {0}")]
    Illegal(Token),
    #[error("Unexpected end of expression")]
    EndOfInput,
}

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

const LOWEST_PRECEDENCE: u8 = 0;
const NOT_PRECEDENCE: u8 = 3;
const UNARY_PRECEDENCE: u8 = 7;

/// Binding power of an infix token; 0 means "not an infix operator"
fn get_operator_precedence(token_type: &TokenType) -> u8 {
    match token_type {
        TokenType::OR => 1,
        TokenType::AND => 2,
        TokenType::EQUALS
        | TokenType::NotEqual
        | TokenType::LessThan
        | TokenType::GreaterThan
        | TokenType::LessEqual
        | TokenType::GreaterEqual
        | TokenType::CONTAINS => 4,
        TokenType::PLUS | TokenType::MINUS => 5,
        TokenType::MULTIPLY | TokenType::DIVIDE => 6,
        _ => 0,
    }
}

fn token_to_operator(token_type: &TokenType) -> Option<BinaryOperator> {
    match token_type {
        TokenType::OR => Some(BinaryOperator::Or),
        TokenType::AND => Some(BinaryOperator::And),
        TokenType::EQUALS => Some(BinaryOperator::Equals),
        TokenType::NotEqual => Some(BinaryOperator::NotEquals),
        TokenType::LessThan => Some(BinaryOperator::LessThan),
        TokenType::GreaterThan => Some(BinaryOperator::GreaterThan),
        TokenType::LessEqual => Some(BinaryOperator::LessEquals),
        TokenType::GreaterEqual => Some(BinaryOperator::GreaterEquals),
        TokenType::CONTAINS => Some(BinaryOperator::Contains),
        TokenType::PLUS => Some(BinaryOperator::Plus),
        TokenType::MINUS => Some(BinaryOperator::Minus),
        TokenType::MULTIPLY => Some(BinaryOperator::Multiply),
        TokenType::DIVIDE => Some(BinaryOperator::Divide),
        _ => None,
    }
}

/// Parser for constructing an expression AST from tokens
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    /// Create a new parser from an expression string
    pub fn new(input: &str) -> Self {
        Parser {
            tokens: tokenize(input),
            position: 0,
        }
    }

    /// Parse the whole input as one expression
    pub fn parse(&mut self) -> ParseResult<Expression> {
        if self.current().token_type == TokenType::EOF {
            return Err(ParseError::EndOfInput);
        }
        let expr = self.parse_expression(LOWEST_PRECEDENCE)?;
        match self.current().token_type {
            TokenType::EOF => Ok(expr),
            _ => Err(self.unexpected()),
        }
    }

    /// The token under the cursor. The token stream always ends with EOF.
    fn current(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.position.min(last)]
    }

    fn next_token(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    fn unexpected(&self) -> ParseError {
        let token = self.current().clone();
        match token.token_type {
            TokenType::EOF => ParseError::EndOfInput,
            TokenType::ILLEGAL(_) => ParseError::Illegal(token),
            _ => ParseError::UnexpectedToken(token),
        }
    }

    fn expect_token(&mut self, expected: TokenType, description: &str) -> ParseResult<()> {
        if self.current().token_type == expected {
            self.next_token();
            Ok(())
        } else if self.current().token_type == TokenType::EOF {
            Err(ParseError::EndOfInput)
        } else {
            Err(ParseError::ExpectedToken {
                expected: description.to_string(),
                found: self.current().clone(),
            })
        }
    }

    /// Parse an expression with operator precedence
    fn parse_expression(&mut self, precedence: u8) -> ParseResult<Expression> {
        let mut left_expr = self.parse_prefix_expression()?;

        loop {
            let current_op_precedence = get_operator_precedence(&self.current().token_type);
            if current_op_precedence == 0 || precedence >= current_op_precedence {
                break;
            }
            left_expr = self.parse_infix_expression(left_expr, current_op_precedence)?;
        }

        Ok(left_expr)
    }

    /// Parse a prefix expression (literal, column, parenthesized group, NOT, unary minus)
    fn parse_prefix_expression(&mut self) -> ParseResult<Expression> {
        let token = self.current().clone();
        match token.token_type {
            TokenType::NOT => {
                self.next_token();
                let operand = self.parse_expression(NOT_PRECEDENCE)?;
                Ok(Expression::UnaryOp {
                    op: UnaryOperator::Not,
                    expr: Box::new(operand),
                })
            }
            TokenType::MINUS => {
                self.next_token();
                let operand = self.parse_expression(UNARY_PRECEDENCE)?;
                Ok(Expression::UnaryOp {
                    op: UnaryOperator::Minus,
                    expr: Box::new(operand),
                })
            }
            TokenType::NUMBER(text) => {
                self.next_token();
                Decimal::from_str(&text)
                    .map(|n| Expression::Literal(Literal::Number(n)))
                    .map_err(|_| ParseError::InvalidLiteral(text))
            }
            TokenType::STRING(value) => {
                self.next_token();
                Ok(Expression::Literal(Literal::String(value)))
            }
            TokenType::TRUE => {
                self.next_token();
                Ok(Expression::Literal(Literal::Boolean(true)))
            }
            TokenType::FALSE => {
                self.next_token();
                Ok(Expression::Literal(Literal::Boolean(false)))
            }
            TokenType::NULL => {
                self.next_token();
                Ok(Expression::Literal(Literal::Null))
            }
            TokenType::IDENTIFIER(ref name) => {
                if name.ends_with('.') || name.contains("..") {
                    return Err(ParseError::UnexpectedToken(token.clone()));
                }
                let column = ColumnReference::from_identifier(name);
                self.next_token();
                Ok(Expression::Column(column))
            }
            TokenType::LeftParen => {
                self.next_token();
                let expr = self.parse_expression(LOWEST_PRECEDENCE)?;
                self.expect_token(TokenType::RightParen, "')'")?;
                Ok(expr)
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Parse the operator under the cursor and its right-hand side
    fn parse_infix_expression(&mut self, left: Expression, precedence: u8) -> ParseResult<Expression> {
        let op = token_to_operator(&self.current().token_type).ok_or_else(|| self.unexpected())?;
        self.next_token();
        let right = self.parse_expression(precedence)?;
        Ok(Expression::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }
}

/// Parse an expression string into an AST
pub fn parse(input: &str) -> ParseResult<Expression> {
    Parser::new(input).parse()
}
