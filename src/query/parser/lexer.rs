// Expression Lexer Implementation
//
// This module tokenizes transform expressions (`sales.qty * 2 > 10`,
// `"a" CONTAINS name`) so that operators inside string literals or nested
// parentheses are never mistaken for top-level operators.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

/// Expression token types
#[derive(Debug, PartialEq, Clone)]
pub enum TokenType {
    // Keywords
    AND,
    OR,
    NOT,
    TRUE,
    FALSE,
    NULL,
    CONTAINS,

    // Literals
    STRING(String),
    NUMBER(String),

    // Identifiers (bare or alias-qualified column names)
    IDENTIFIER(String),

    // Operators
    EQUALS,         // = or ==
    NotEqual,       // != or <>
    LessThan,       // <
    GreaterThan,    // >
    LessEqual,      // <=
    GreaterEqual,   // >=
    PLUS,           // +
    MINUS,          // -
    MULTIPLY,       // *
    DIVIDE,         // /

    // Punctuation
    LeftParen,      // (
    RightParen,     // )

    // Special
    EOF,
    ILLEGAL(String),
}

/// Keywords that are never column references
pub const KEYWORDS: [&str; 7] = ["TRUE", "FALSE", "AND", "OR", "NOT", "NULL", "CONTAINS"];

/// A Token represents a lexical unit of an expression
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub literal: String,
    pub column: usize,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "'{}' at column {}", self.literal, self.column)
    }
}

/// Lexer for breaking an expression string into tokens
pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
    column: usize,
    ch: Option<char>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer from an expression string
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer {
            input: input.chars().peekable(),
            column: 0,
            ch: None,
        };
        lexer.read_char();
        lexer
    }

    /// Read the next character from the input
    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.next();
        self.ch = ch;
        if ch.is_some() {
            self.column += 1;
        }
        ch
    }

    /// Peek at the next character without advancing
    fn peek_char(&mut self) -> Option<char> {
        self.input.peek().copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.ch {
            if ch.is_whitespace() {
                self.read_char();
            } else {
                break;
            }
        }
    }

    /// Read an identifier or keyword. Dots are part of the identifier so that
    /// `alias.field` arrives as a single token.
    fn read_identifier(&mut self) -> String {
        let mut identifier = String::new();
        while let Some(ch) = self.ch {
            if is_letter(ch) || ch.is_ascii_digit() || ch == '.' {
                identifier.push(ch);
                self.read_char();
            } else {
                break;
            }
        }
        identifier
    }

    /// Read a decimal number. A dot only belongs to the number when a digit follows it.
    fn read_number(&mut self) -> String {
        let mut number = String::new();
        let mut has_dot = false;
        while let Some(ch) = self.ch {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.read_char();
            } else if ch == '.' && !has_dot && self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                has_dot = true;
                number.push(ch);
                self.read_char();
            } else {
                break;
            }
        }
        number
    }

    /// Read a quoted string literal. Returns None when the closing quote is missing.
    fn read_string(&mut self, quote: char) -> Option<String> {
        let mut string = String::new();

        // Skip opening quote
        self.read_char();

        while let Some(ch) = self.ch {
            if ch == quote {
                self.read_char();
                return Some(string);
            }
            if ch == '\\' {
                match self.read_char() {
                    Some(escaped) => string.push(escaped),
                    None => return None,
                }
            } else {
                string.push(ch);
            }
            self.read_char();
        }

        None
    }

    /// Get the token type for an identifier (could be a keyword)
    fn lookup_identifier(&self, ident: &str) -> TokenType {
        match ident.to_uppercase().as_str() {
            "AND" => TokenType::AND,
            "OR" => TokenType::OR,
            "NOT" => TokenType::NOT,
            "TRUE" => TokenType::TRUE,
            "FALSE" => TokenType::FALSE,
            "NULL" => TokenType::NULL,
            "CONTAINS" => TokenType::CONTAINS,
            _ => TokenType::IDENTIFIER(ident.to_string()),
        }
    }

    /// Consume the current char when the next one matches, returning whether it did
    fn follow(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.read_char();
            true
        } else {
            false
        }
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let mut token = Token {
            token_type: TokenType::EOF,
            literal: String::new(),
            column: self.column,
        };

        let Some(ch) = self.ch else {
            return token;
        };
        token.literal = ch.to_string();

        match ch {
            '(' => token.token_type = TokenType::LeftParen,
            ')' => token.token_type = TokenType::RightParen,
            '+' => token.token_type = TokenType::PLUS,
            '-' => token.token_type = TokenType::MINUS,
            '*' => token.token_type = TokenType::MULTIPLY,
            '/' => token.token_type = TokenType::DIVIDE,
            '=' => {
                if self.follow('=') {
                    token.literal.push('=');
                }
                token.token_type = TokenType::EQUALS;
            }
            '!' => {
                if self.follow('=') {
                    token.literal.push('=');
                    token.token_type = TokenType::NotEqual;
                } else {
                    token.token_type = TokenType::NOT;
                }
            }
            '<' => {
                if self.follow('=') {
                    token.literal.push('=');
                    token.token_type = TokenType::LessEqual;
                } else if self.follow('>') {
                    token.literal.push('>');
                    token.token_type = TokenType::NotEqual;
                } else {
                    token.token_type = TokenType::LessThan;
                }
            }
            '>' => {
                if self.follow('=') {
                    token.literal.push('=');
                    token.token_type = TokenType::GreaterEqual;
                } else {
                    token.token_type = TokenType::GreaterThan;
                }
            }
            '&' => {
                if self.follow('&') {
                    token.literal.push('&');
                    token.token_type = TokenType::AND;
                } else {
                    token.token_type = TokenType::ILLEGAL(token.literal.clone());
                }
            }
            '|' => {
                if self.follow('|') {
                    token.literal.push('|');
                    token.token_type = TokenType::OR;
                } else {
                    token.token_type = TokenType::ILLEGAL(token.literal.clone());
                }
            }
            '"' | '\'' => {
                match self.read_string(ch) {
                    Some(value) => {
                        token.literal = format!("{}{}{}", ch, value, ch);
                        token.token_type = TokenType::STRING(value);
                    }
                    None => {
                        token.token_type = TokenType::ILLEGAL("unterminated string literal".to_string());
                    }
                }
                return token;
            }
            _ if is_letter(ch) => {
                let identifier = self.read_identifier();
                token.token_type = self.lookup_identifier(&identifier);
                token.literal = identifier;
                return token;
            }
            _ if ch.is_ascii_digit() => {
                let number = self.read_number();
                token.literal = number.clone();
                token.token_type = TokenType::NUMBER(number);
                return token;
            }
            _ => token.token_type = TokenType::ILLEGAL(ch.to_string()),
        }

        self.read_char();
        token
    }
}

/// Tokenize a whole expression, including the trailing EOF token
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        let is_eof = token.token_type == TokenType::EOF;
        tokens.push(token);
        if is_eof {
            break;
        }
    }
    tokens
}

/// Check if a character can start an identifier
fn is_letter(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}
