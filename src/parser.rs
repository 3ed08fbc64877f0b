// Expression parser
// Lexer plus a Pratt parser producing `ast::AstNode` trees

use crate::ast::{Argument, AstNode, BinaryOp, CompareOp, Comprehension, Target, UnaryOp};
use thiserror::Error;

/// Parser errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParserError {
    #[error("Unexpected token: {0}")]
    UnexpectedToken(String),

    #[error("Unexpected character '{ch}' at position {position}")]
    UnexpectedCharacter { ch: char, position: usize },

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Invalid syntax: {0}")]
    InvalidSyntax(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Unclosed string literal")]
    UnclosedString,

    #[error("Invalid escape sequence: {0}")]
    InvalidEscape(String),

    #[error("Expected {expected}, found {found}")]
    Expected { expected: String, found: String },

    #[error("Expression nested too deeply (limit {0})")]
    TooDeep(usize),
}

/// Token types for the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    String(String),
    Integer(i64),
    Float(f64),
    Identifier(String),

    // Keywords
    True,
    False,
    None,
    And,
    Or,
    Not,
    In,
    Is,
    If,
    Else,
    For,
    Lambda,

    // Operators
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Assign,
    Dot,
    Colon,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Comma,

    // Special
    Eof,
}

fn keyword(word: &str) -> Option<Token> {
    let token = match word {
        "True" => Token::True,
        "False" => Token::False,
        "None" => Token::None,
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "in" => Token::In,
        "is" => Token::Is,
        "if" => Token::If,
        "else" => Token::Else,
        "for" => Token::For,
        "lambda" => Token::Lambda,
        _ => return None,
    };
    Some(token)
}

/// Lexer for tokenizing expressions
pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: String) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        if self.position < self.input.len() {
            self.position += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_hex(&mut self, digits: usize) -> Result<char, ParserError> {
        let mut hex = String::new();
        for _ in 0..digits {
            match self.current() {
                Some(h) if h.is_ascii_hexdigit() => {
                    hex.push(h);
                    self.advance();
                }
                _ => return Err(ParserError::InvalidEscape(format!("\\x{}", hex))),
            }
        }
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or(ParserError::InvalidEscape(format!("\\x{}", hex)))
    }

    fn read_string(&mut self, quote_char: char) -> Result<String, ParserError> {
        let mut result = String::new();
        self.advance(); // skip opening quote

        loop {
            match self.current() {
                None => return Err(ParserError::UnclosedString),
                Some(ch) if ch == quote_char => {
                    self.advance(); // skip closing quote
                    return Ok(result);
                }
                Some('\\') => {
                    self.advance();
                    let escaped = match self.current() {
                        None => return Err(ParserError::UnclosedString),
                        Some('x') => {
                            self.advance();
                            result.push(self.read_hex(2)?);
                            continue;
                        }
                        Some('u') => {
                            self.advance();
                            result.push(self.read_hex(4)?);
                            continue;
                        }
                        Some('\n') => None,
                        Some('\\') => Some('\\'),
                        Some('\'') => Some('\''),
                        Some('"') => Some('"'),
                        Some('n') => Some('\n'),
                        Some('r') => Some('\r'),
                        Some('t') => Some('\t'),
                        Some('0') => Some('\0'),
                        Some('a') => Some('\u{0007}'),
                        Some('b') => Some('\u{0008}'),
                        Some('f') => Some('\u{000C}'),
                        Some('v') => Some('\u{000B}'),
                        Some(other) => {
                            // Unknown escapes are kept verbatim
                            result.push('\\');
                            Some(other)
                        }
                    };
                    if let Some(ch) = escaped {
                        result.push(ch);
                    }
                    self.advance();
                }
                Some(ch) => {
                    result.push(ch);
                    self.advance();
                }
            }
        }
    }

    fn read_digits(&mut self) {
        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() || (ch == '_' && self.peek(1).is_some_and(|c| c.is_ascii_digit())) {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self) -> Result<Token, ParserError> {
        let start = self.position;
        let mut is_float = false;

        self.read_digits();

        if self.current() == Some('.')
            && !self.peek(1).is_some_and(|c| c.is_alphabetic() || c == '_')
        {
            is_float = true;
            self.advance();
            self.read_digits();
        }

        if matches!(self.current(), Some('e') | Some('E')) {
            let signed = matches!(self.peek(1), Some('+') | Some('-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                for _ in 0..digit_at {
                    self.advance();
                }
                self.read_digits();
            }
        }

        let num_str: String = self.input[start..self.position]
            .iter()
            .filter(|c| **c != '_')
            .collect();

        if is_float {
            num_str
                .parse()
                .map(Token::Float)
                .map_err(|_| ParserError::InvalidNumber(num_str))
        } else {
            num_str
                .parse()
                .map(Token::Integer)
                .map_err(|_| ParserError::InvalidNumber(num_str))
        }
    }

    fn read_identifier(&mut self) -> String {
        let start = self.position;

        while let Some(ch) = self.current() {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }

        self.input[start..self.position].iter().collect()
    }

    /// Consume the current character and return `single`, or both the
    /// current and next character when the next one is `second`.
    fn one_or_two(&mut self, second: char, double: Token, single: Token) -> Token {
        self.advance();
        if self.current() == Some(second) {
            self.advance();
            double
        } else {
            single
        }
    }

    pub fn next_token(&mut self) -> Result<Token, ParserError> {
        self.skip_whitespace();

        let ch = match self.current() {
            None => return Ok(Token::Eof),
            Some(ch) => ch,
        };

        let token = match ch {
            '"' | '\'' => Token::String(self.read_string(ch)?),

            c if c.is_ascii_digit() => self.read_number()?,
            '.' if self.peek(1).is_some_and(|c| c.is_ascii_digit()) => self.read_number()?,

            c if c.is_alphabetic() || c == '_' => {
                let word = self.read_identifier();
                keyword(&word).unwrap_or(Token::Identifier(word))
            }

            '*' => self.one_or_two('*', Token::DoubleStar, Token::Star),
            '/' => self.one_or_two('/', Token::DoubleSlash, Token::Slash),
            '=' => self.one_or_two('=', Token::Equal, Token::Assign),
            '<' => self.one_or_two('=', Token::LessThanOrEqual, Token::LessThan),
            '>' => self.one_or_two('=', Token::GreaterThanOrEqual, Token::GreaterThan),
            '!' if self.peek(1) == Some('=') => {
                self.advance();
                self.advance();
                Token::NotEqual
            }

            _ => {
                let token = match ch {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '%' => Token::Percent,
                    '.' => Token::Dot,
                    ':' => Token::Colon,
                    ',' => Token::Comma,
                    '(' => Token::LeftParen,
                    ')' => Token::RightParen,
                    '[' => Token::LeftBracket,
                    ']' => Token::RightBracket,
                    '{' => Token::LeftBrace,
                    '}' => Token::RightBrace,
                    _ => {
                        return Err(ParserError::UnexpectedCharacter {
                            ch,
                            position: self.position,
                        })
                    }
                };
                self.advance();
                token
            }
        };

        Ok(token)
    }
}

// Binding powers, lowest first
const CONDITIONAL_BP: u8 = 2;
const COMPREHENSION_BP: u8 = 3;
const NOT_BP: u8 = 8;
const COMPARISON_BP: u8 = 10;
const UNARY_BP: u8 = 40;

/// Parser for expressions using Pratt parsing
pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    peek_token: Token,
    depth: usize,
    max_depth: usize,
}

/// Deepest expression nesting accepted by [`Parser`]
pub const MAX_NESTING_DEPTH: usize = 100;

impl Parser {
    pub fn new(input: String) -> Result<Self, ParserError> {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token()?;
        let peek_token = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current_token,
            peek_token,
            depth: 0,
            max_depth: MAX_NESTING_DEPTH,
        })
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    fn advance(&mut self) -> Result<(), ParserError> {
        let next = self.lexer.next_token()?;
        self.current_token = std::mem::replace(&mut self.peek_token, next);
        Ok(())
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParserError> {
        if std::mem::discriminant(&self.current_token) == std::mem::discriminant(&expected) {
            self.advance()?;
            Ok(())
        } else if self.current_token == Token::Eof {
            Err(ParserError::UnexpectedEnd)
        } else {
            Err(ParserError::Expected {
                expected: format!("{:?}", expected),
                found: format!("{:?}", self.current_token),
            })
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParserError> {
        match &self.current_token {
            Token::Identifier(name) => {
                let name = name.clone();
                self.advance()?;
                Ok(name)
            }
            Token::Eof => Err(ParserError::UnexpectedEnd),
            other => Err(ParserError::Expected {
                expected: "identifier".to_string(),
                found: format!("{:?}", other),
            }),
        }
    }

    /// Get the binding power (precedence) for the current token
    fn binding_power(&self, token: &Token) -> Option<(u8, u8)> {
        // Returns (left_bp, right_bp); higher numbers bind tighter
        match token {
            Token::If => Some((CONDITIONAL_BP, CONDITIONAL_BP)),
            Token::Or => Some((4, 5)),
            Token::And => Some((6, 7)),
            Token::Equal
            | Token::NotEqual
            | Token::LessThan
            | Token::LessThanOrEqual
            | Token::GreaterThan
            | Token::GreaterThanOrEqual
            | Token::In
            | Token::Is => Some((COMPARISON_BP, COMPARISON_BP + 1)),
            Token::Not if self.peek_token == Token::In => Some((COMPARISON_BP, COMPARISON_BP + 1)),
            Token::Plus | Token::Minus => Some((20, 21)),
            Token::Star | Token::Slash | Token::DoubleSlash | Token::Percent => Some((30, 31)),
            Token::DoubleStar => Some((50, 49)), // Right associative
            Token::Dot | Token::LeftParen | Token::LeftBracket => Some((60, 61)),
            _ => None,
        }
    }

    /// Parse a primary expression (literals, names, displays, grouping)
    fn parse_primary(&mut self) -> Result<AstNode, ParserError> {
        match &self.current_token {
            Token::String(_) => {
                // Adjacent literals concatenate
                let mut value = String::new();
                while let Token::String(s) = &self.current_token {
                    value.push_str(s);
                    self.advance()?;
                }
                Ok(AstNode::String(value))
            }
            Token::Integer(n) => {
                let value = *n;
                self.advance()?;
                Ok(AstNode::Integer(value))
            }
            Token::Float(n) => {
                let value = *n;
                self.advance()?;
                Ok(AstNode::Float(value))
            }
            Token::True => {
                self.advance()?;
                Ok(AstNode::Boolean(true))
            }
            Token::False => {
                self.advance()?;
                Ok(AstNode::Boolean(false))
            }
            Token::None => {
                self.advance()?;
                Ok(AstNode::None)
            }
            Token::Identifier(name) => {
                let name = name.clone();
                self.advance()?;
                Ok(AstNode::Name(name))
            }
            Token::LeftParen => self.parse_parenthesized(),
            Token::LeftBracket => self.parse_list(),
            Token::LeftBrace => self.parse_dict(),
            Token::Eof => Err(ParserError::UnexpectedEnd),
            other => Err(ParserError::UnexpectedToken(format!("{:?}", other))),
        }
    }

    /// `( )`, `(expr)`, `(a, b)` or `(expr for ...)`
    fn parse_parenthesized(&mut self) -> Result<AstNode, ParserError> {
        self.expect(Token::LeftParen)?;

        if self.current_token == Token::RightParen {
            self.advance()?;
            return Ok(AstNode::Tuple(Vec::new()));
        }

        let first = self.parse_expression(0)?;

        if self.current_token == Token::For {
            let generators = self.parse_generators()?;
            self.expect(Token::RightParen)?;
            return Ok(AstNode::ListComprehension {
                element: Box::new(first),
                generators,
            });
        }

        if self.current_token != Token::Comma {
            self.expect(Token::RightParen)?;
            return Ok(first);
        }

        let items = self.parse_sequence_tail(first, Token::RightParen)?;
        Ok(AstNode::Tuple(items))
    }

    fn parse_list(&mut self) -> Result<AstNode, ParserError> {
        self.expect(Token::LeftBracket)?;

        if self.current_token == Token::RightBracket {
            self.advance()?;
            return Ok(AstNode::List(Vec::new()));
        }

        let first = self.parse_expression(0)?;

        if self.current_token == Token::For {
            let generators = self.parse_generators()?;
            self.expect(Token::RightBracket)?;
            return Ok(AstNode::ListComprehension {
                element: Box::new(first),
                generators,
            });
        }

        let items = self.parse_sequence_tail(first, Token::RightBracket)?;
        Ok(AstNode::List(items))
    }

    /// Remaining comma separated items after `first`, up to and including `close`
    fn parse_sequence_tail(
        &mut self,
        first: AstNode,
        close: Token,
    ) -> Result<Vec<AstNode>, ParserError> {
        let mut items = vec![first];
        while self.current_token == Token::Comma {
            self.advance()?;
            if self.current_token == close {
                break;
            }
            items.push(self.parse_expression(0)?);
        }
        self.expect(close)?;
        Ok(items)
    }

    fn parse_dict(&mut self) -> Result<AstNode, ParserError> {
        self.expect(Token::LeftBrace)?;

        if self.current_token == Token::RightBrace {
            self.advance()?;
            return Ok(AstNode::Dict(Vec::new()));
        }

        let key = self.parse_expression(0)?;
        self.expect(Token::Colon)?;
        let value = self.parse_expression(0)?;

        if self.current_token == Token::For {
            let generators = self.parse_generators()?;
            self.expect(Token::RightBrace)?;
            return Ok(AstNode::DictComprehension {
                key: Box::new(key),
                value: Box::new(value),
                generators,
            });
        }

        let mut entries = vec![(key, value)];
        while self.current_token == Token::Comma {
            self.advance()?;
            if self.current_token == Token::RightBrace {
                break;
            }
            let key = self.parse_expression(0)?;
            self.expect(Token::Colon)?;
            let value = self.parse_expression(0)?;
            entries.push((key, value));
        }
        self.expect(Token::RightBrace)?;
        Ok(AstNode::Dict(entries))
    }

    /// One or more `for target in iter [if cond]...` clauses
    fn parse_generators(&mut self) -> Result<Vec<Comprehension>, ParserError> {
        let mut generators = Vec::new();
        while self.current_token == Token::For {
            self.advance()?;
            let target = self.parse_target_list()?;
            self.expect(Token::In)?;
            let iter = self.parse_expression(COMPREHENSION_BP)?;

            let mut conditions = Vec::new();
            while self.current_token == Token::If {
                self.advance()?;
                conditions.push(self.parse_expression(COMPREHENSION_BP)?);
            }

            generators.push(Comprehension {
                target,
                iter,
                conditions,
            });
        }
        Ok(generators)
    }

    fn parse_target_list(&mut self) -> Result<Target, ParserError> {
        let first = self.parse_target()?;
        if self.current_token != Token::Comma {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.current_token == Token::Comma {
            self.advance()?;
            if self.current_token == Token::In {
                break;
            }
            items.push(self.parse_target()?);
        }
        Ok(Target::Tuple(items))
    }

    fn parse_target(&mut self) -> Result<Target, ParserError> {
        if self.current_token == Token::LeftParen {
            self.advance()?;
            let mut items = Vec::new();
            while self.current_token != Token::RightParen {
                items.push(self.parse_target()?);
                if self.current_token != Token::Comma {
                    break;
                }
                self.advance()?;
            }
            self.expect(Token::RightParen)?;
            return Ok(Target::Tuple(items));
        }
        Ok(Target::Name(self.expect_identifier()?))
    }

    fn parse_lambda(&mut self) -> Result<AstNode, ParserError> {
        self.expect(Token::Lambda)?;
        let mut params = Vec::new();
        while self.current_token != Token::Colon {
            let name = self.expect_identifier()?;
            if params.contains(&name) {
                return Err(ParserError::InvalidSyntax(format!(
                    "duplicate argument '{}' in lambda",
                    name
                )));
            }
            params.push(name);
            if self.current_token != Token::Comma {
                break;
            }
            self.advance()?;
        }
        self.expect(Token::Colon)?;
        let body = self.parse_expression(0)?;
        Ok(AstNode::Lambda {
            params,
            body: Box::new(body),
        })
    }

    fn parse_arguments(&mut self) -> Result<Vec<Argument>, ParserError> {
        self.expect(Token::LeftParen)?;
        let mut args: Vec<Argument> = Vec::new();

        while self.current_token != Token::RightParen {
            let is_keyword = matches!(self.current_token, Token::Identifier(_))
                && self.peek_token == Token::Assign;

            if is_keyword {
                let name = self.expect_identifier()?;
                self.advance()?; // skip '='
                if args
                    .iter()
                    .any(|a| matches!(a, Argument::Keyword(k, _) if *k == name))
                {
                    return Err(ParserError::InvalidSyntax(format!(
                        "keyword argument repeated: {}",
                        name
                    )));
                }
                let value = self.parse_expression(0)?;
                args.push(Argument::Keyword(name, value));
            } else {
                if args.iter().any(|a| matches!(a, Argument::Keyword(..))) {
                    return Err(ParserError::InvalidSyntax(
                        "positional argument follows keyword argument".to_string(),
                    ));
                }
                let value = self.parse_expression(0)?;
                if self.current_token == Token::For {
                    if !args.is_empty() {
                        return Err(ParserError::InvalidSyntax(
                            "generator expression must be parenthesized".to_string(),
                        ));
                    }
                    let generators = self.parse_generators()?;
                    args.push(Argument::Positional(AstNode::ListComprehension {
                        element: Box::new(value),
                        generators,
                    }));
                    if self.current_token != Token::RightParen {
                        return Err(ParserError::InvalidSyntax(
                            "generator expression must be parenthesized".to_string(),
                        ));
                    }
                    break;
                }
                args.push(Argument::Positional(value));
            }

            if self.current_token != Token::Comma {
                break;
            }
            self.advance()?;
        }

        self.expect(Token::RightParen)?;
        Ok(args)
    }

    /// `[index]` or `[start:stop]` after a value
    fn parse_subscript(&mut self, value: AstNode) -> Result<AstNode, ParserError> {
        self.expect(Token::LeftBracket)?;

        let start = if self.current_token == Token::Colon {
            None
        } else {
            Some(self.parse_expression(0)?)
        };

        if self.current_token != Token::Colon {
            self.expect(Token::RightBracket)?;
            return match start {
                Some(index) => Ok(AstNode::Subscript {
                    value: Box::new(value),
                    index: Box::new(index),
                }),
                None => Err(ParserError::InvalidSyntax("empty subscript".to_string())),
            };
        }

        self.advance()?; // skip ':'
        let stop = if self.current_token == Token::RightBracket {
            None
        } else {
            Some(Box::new(self.parse_expression(0)?))
        };
        self.expect(Token::RightBracket)?;

        Ok(AstNode::Slice {
            value: Box::new(value),
            start: start.map(Box::new),
            stop,
        })
    }

    fn parse_compare_op(&mut self) -> Result<CompareOp, ParserError> {
        let op = match self.current_token {
            Token::Equal => CompareOp::Equal,
            Token::NotEqual => CompareOp::NotEqual,
            Token::LessThan => CompareOp::LessThan,
            Token::LessThanOrEqual => CompareOp::LessThanOrEqual,
            Token::GreaterThan => CompareOp::GreaterThan,
            Token::GreaterThanOrEqual => CompareOp::GreaterThanOrEqual,
            Token::In => CompareOp::In,
            Token::Not => {
                self.advance()?;
                CompareOp::NotIn
            }
            Token::Is if self.peek_token == Token::Not => {
                self.advance()?;
                CompareOp::IsNot
            }
            Token::Is => CompareOp::Is,
            _ => return Err(ParserError::UnexpectedToken(format!("{:?}", self.current_token))),
        };
        self.advance()?;
        Ok(op)
    }

    fn parse_prefix(&mut self) -> Result<AstNode, ParserError> {
        match self.current_token {
            Token::Not => {
                self.advance()?;
                let operand = self.parse_expression(NOT_BP)?;
                Ok(AstNode::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                })
            }
            Token::Minus => {
                self.advance()?;
                let operand = self.parse_expression(UNARY_BP)?;
                // Fold negative literals
                Ok(match operand {
                    AstNode::Integer(n) => AstNode::Integer(-n),
                    AstNode::Float(n) => AstNode::Float(-n),
                    other => AstNode::Unary {
                        op: UnaryOp::Negate,
                        operand: Box::new(other),
                    },
                })
            }
            Token::Plus => {
                self.advance()?;
                let operand = self.parse_expression(UNARY_BP)?;
                Ok(AstNode::Unary {
                    op: UnaryOp::Plus,
                    operand: Box::new(operand),
                })
            }
            Token::Lambda => self.parse_lambda(),
            _ => self.parse_primary(),
        }
    }

    /// Parse an expression with Pratt parsing
    /// Every nested sub-expression passes through here, so the depth
    /// counter bounds parser recursion.
    fn parse_expression(&mut self, min_bp: u8) -> Result<AstNode, ParserError> {
        if self.depth >= self.max_depth {
            return Err(ParserError::TooDeep(self.max_depth));
        }
        self.depth += 1;
        let result = self.parse_expression_internal(min_bp);
        self.depth -= 1;
        result
    }

    fn parse_expression_internal(&mut self, min_bp: u8) -> Result<AstNode, ParserError> {
        let mut lhs = self.parse_prefix()?;

        loop {
            // Get binding power for current operator
            let (left_bp, right_bp) = match self.binding_power(&self.current_token) {
                Some(bp) => bp,
                None => break,
            };

            if left_bp < min_bp {
                break;
            }

            match &self.current_token {
                Token::Dot => {
                    self.advance()?;
                    let name = self.expect_identifier()?;
                    lhs = AstNode::Attribute {
                        value: Box::new(lhs),
                        name,
                    };
                }
                Token::LeftParen => {
                    let args = self.parse_arguments()?;
                    lhs = AstNode::Call {
                        function: Box::new(lhs),
                        args,
                    };
                }
                Token::LeftBracket => {
                    lhs = self.parse_subscript(lhs)?;
                }
                Token::If => {
                    self.advance()?;
                    let condition = self.parse_expression(COMPREHENSION_BP)?;
                    self.expect(Token::Else)?;
                    let else_branch = self.parse_expression(right_bp)?;
                    lhs = AstNode::Conditional {
                        condition: Box::new(condition),
                        then_branch: Box::new(lhs),
                        else_branch: Box::new(else_branch),
                    };
                }
                Token::Equal
                | Token::NotEqual
                | Token::LessThan
                | Token::LessThanOrEqual
                | Token::GreaterThan
                | Token::GreaterThanOrEqual
                | Token::In
                | Token::Is
                | Token::Not => {
                    // Comparisons chain: a < b < c
                    let mut comparisons = Vec::new();
                    while self
                        .binding_power(&self.current_token)
                        .is_some_and(|(bp, _)| bp == COMPARISON_BP)
                    {
                        let op = self.parse_compare_op()?;
                        let rhs = self.parse_expression(right_bp)?;
                        comparisons.push((op, rhs));
                    }
                    lhs = AstNode::Compare {
                        lhs: Box::new(lhs),
                        comparisons,
                    };
                }
                _ => {
                    // Binary operators
                    let op = match &self.current_token {
                        Token::Plus => BinaryOp::Add,
                        Token::Minus => BinaryOp::Subtract,
                        Token::Star => BinaryOp::Multiply,
                        Token::Slash => BinaryOp::Divide,
                        Token::DoubleSlash => BinaryOp::FloorDivide,
                        Token::Percent => BinaryOp::Modulo,
                        Token::DoubleStar => BinaryOp::Power,
                        Token::And => BinaryOp::And,
                        Token::Or => BinaryOp::Or,
                        _ => {
                            return Err(ParserError::UnexpectedToken(format!(
                                "{:?}",
                                self.current_token
                            )))
                        }
                    };

                    self.advance()?;
                    let rhs = self.parse_expression(right_bp)?;
                    lhs = AstNode::binary(op, lhs, rhs);
                }
            }
        }

        Ok(lhs)
    }

    pub fn parse(&mut self) -> Result<AstNode, ParserError> {
        let ast = self.parse_expression(0)?;

        if self.current_token != Token::Eof {
            return Err(ParserError::Expected {
                expected: "end of expression".to_string(),
                found: format!("{:?}", self.current_token),
            });
        }

        Ok(ast)
    }
}

/// Parse an expression string into an AST
///
/// This is the main entry point for parsing.
pub fn parse(expression: &str) -> Result<AstNode, ParserError> {
    let mut parser = Parser::new(expression.to_string())?;
    parser.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(input.to_string());
        let mut result = Vec::new();
        loop {
            let token = lexer.next_token().unwrap();
            if token == Token::Eof {
                return result;
            }
            result.push(token);
        }
    }

    fn int(n: i64) -> AstNode {
        AstNode::Integer(n)
    }

    // Lexer tests
    #[test]
    fn test_lexer_numbers() {
        assert_eq!(
            tokens("42 3.25 1_000 2.5e3 .5 1e-2"),
            vec![
                Token::Integer(42),
                Token::Float(3.25),
                Token::Integer(1000),
                Token::Float(2500.0),
                Token::Float(0.5),
                Token::Float(0.01),
            ]
        );
    }

    #[test]
    fn test_lexer_integer_overflow() {
        let mut lexer = Lexer::new("99999999999999999999".to_string());
        assert!(matches!(lexer.next_token(), Err(ParserError::InvalidNumber(_))));
    }

    #[test]
    fn test_lexer_strings() {
        assert_eq!(
            tokens(r#"'hello' "world" 'it\'s' "a\tb" 'c:\d'"#),
            vec![
                Token::String("hello".to_string()),
                Token::String("world".to_string()),
                Token::String("it's".to_string()),
                Token::String("a\tb".to_string()),
                Token::String("c:\\d".to_string()),
            ]
        );
    }

    #[test]
    fn test_lexer_unclosed_string() {
        let mut lexer = Lexer::new("'abc".to_string());
        assert_eq!(lexer.next_token(), Err(ParserError::UnclosedString));
    }

    #[test]
    fn test_lexer_keywords_and_operators() {
        assert_eq!(
            tokens("not x in y ** 2 // 3 != None"),
            vec![
                Token::Not,
                Token::Identifier("x".to_string()),
                Token::In,
                Token::Identifier("y".to_string()),
                Token::DoubleStar,
                Token::Integer(2),
                Token::DoubleSlash,
                Token::Integer(3),
                Token::NotEqual,
                Token::None,
            ]
        );
    }

    #[test]
    fn test_lexer_unexpected_character() {
        let mut lexer = Lexer::new("a ; b".to_string());
        lexer.next_token().unwrap();
        assert_eq!(
            lexer.next_token(),
            Err(ParserError::UnexpectedCharacter { ch: ';', position: 2 })
        );
    }

    // Parser tests
    #[test]
    fn test_parse_precedence() {
        assert_eq!(
            parse("1 + 2 * 3").unwrap(),
            AstNode::binary(
                BinaryOp::Add,
                int(1),
                AstNode::binary(BinaryOp::Multiply, int(2), int(3))
            )
        );
    }

    #[test]
    fn test_parse_power_is_right_associative() {
        assert_eq!(
            parse("2 ** 3 ** 2").unwrap(),
            AstNode::binary(
                BinaryOp::Power,
                int(2),
                AstNode::binary(BinaryOp::Power, int(3), int(2))
            )
        );
    }

    #[test]
    fn test_parse_unary_minus_binds_looser_than_power() {
        assert_eq!(
            parse("-2 ** 2").unwrap(),
            AstNode::Unary {
                op: UnaryOp::Negate,
                operand: Box::new(AstNode::binary(BinaryOp::Power, int(2), int(2))),
            }
        );
        assert_eq!(parse("-5").unwrap(), int(-5));
    }

    #[test]
    fn test_parse_string_concatenation() {
        assert_eq!(parse("'a' 'b'").unwrap(), AstNode::string("ab"));
    }

    #[test]
    fn test_parse_comparison_chain() {
        let ast = parse("0 < x not in y").unwrap();
        assert_eq!(
            ast,
            AstNode::Compare {
                lhs: Box::new(int(0)),
                comparisons: vec![
                    (CompareOp::LessThan, AstNode::name("x")),
                    (CompareOp::NotIn, AstNode::name("y")),
                ],
            }
        );
        assert!(matches!(
            parse("x is not None").unwrap(),
            AstNode::Compare { ref comparisons, .. } if comparisons[0].0 == CompareOp::IsNot
        ));
    }

    #[test]
    fn test_parse_logical() {
        let ast = parse("not a or b and c").unwrap();
        assert_eq!(
            ast,
            AstNode::binary(
                BinaryOp::Or,
                AstNode::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(AstNode::name("a")),
                },
                AstNode::binary(BinaryOp::And, AstNode::name("b"), AstNode::name("c"))
            )
        );
    }

    #[test]
    fn test_parse_conditional() {
        let ast = parse("1 if x else 2 if y else 3").unwrap();
        match ast {
            AstNode::Conditional { else_branch, .. } => {
                assert!(matches!(*else_branch, AstNode::Conditional { .. }))
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_parse_displays() {
        assert_eq!(parse("()").unwrap(), AstNode::Tuple(vec![]));
        assert_eq!(parse("(1,)").unwrap(), AstNode::Tuple(vec![int(1)]));
        assert_eq!(parse("(1)").unwrap(), int(1));
        assert_eq!(parse("[1, 2,]").unwrap(), AstNode::List(vec![int(1), int(2)]));
        assert_eq!(
            parse("{'a': 1}").unwrap(),
            AstNode::Dict(vec![(AstNode::string("a"), int(1))])
        );
    }

    #[test]
    fn test_parse_list_comprehension() {
        let ast = parse("[i['name'] for i in names if i]").unwrap();
        match ast {
            AstNode::ListComprehension { element, generators } => {
                assert!(matches!(*element, AstNode::Subscript { .. }));
                assert_eq!(generators.len(), 1);
                assert_eq!(generators[0].target, Target::Name("i".to_string()));
                assert_eq!(generators[0].conditions, vec![AstNode::name("i")]);
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_parse_dict_comprehension_with_unpacking() {
        let ast = parse("{item: index for index, item in enumerate(xs)}").unwrap();
        match ast {
            AstNode::DictComprehension { generators, .. } => {
                assert_eq!(generators[0].target.names(), vec!["index", "item"]);
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_parse_call_arguments() {
        let ast = parse("datetime('x', year=1970, utc_offset=0)").unwrap();
        match ast {
            AstNode::Call { function, args } => {
                assert_eq!(*function, AstNode::name("datetime"));
                assert_eq!(args.len(), 3);
                assert_eq!(args[1], Argument::Keyword("year".to_string(), int(1970)));
            }
            other => panic!("unexpected node {:?}", other),
        }

        assert!(matches!(
            parse("f(a=1, 2)"),
            Err(ParserError::InvalidSyntax(_))
        ));
        assert!(matches!(
            parse("f(a=1, a=2)"),
            Err(ParserError::InvalidSyntax(_))
        ));
    }

    #[test]
    fn test_parse_generator_argument() {
        let ast = parse("sum(x * 2 for x in xs)").unwrap();
        match ast {
            AstNode::Call { args, .. } => {
                assert!(matches!(
                    args[0],
                    Argument::Positional(AstNode::ListComprehension { .. })
                ));
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_parse_lambda_argument() {
        let ast = parse("filter(lambda i: i > 1, xs)").unwrap();
        match ast {
            AstNode::Call { args, .. } => {
                assert_eq!(args.len(), 2);
                assert!(matches!(
                    args[0],
                    Argument::Positional(AstNode::Lambda { ref params, .. }) if params == &vec!["i".to_string()]
                ));
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_parse_postfix_chain() {
        let ast = parse("names[1:]['name'].upper()").unwrap();
        match ast {
            AstNode::Call { function, args } => {
                assert!(args.is_empty());
                assert!(matches!(*function, AstNode::Attribute { ref name, .. } if name == "upper"));
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse(""), Err(ParserError::UnexpectedEnd));
        assert_eq!(parse("(1 + 2"), Err(ParserError::UnexpectedEnd));
        assert!(matches!(parse("1 2"), Err(ParserError::Expected { .. })));
        assert!(matches!(parse("x if y"), Err(ParserError::UnexpectedEnd)));
    }

    #[test]
    fn test_nesting_depth_limit() {
        let nested = |depth: usize| format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(parse(&nested(50)), Ok(AstNode::Integer(1)));
        assert_eq!(
            parse(&nested(MAX_NESTING_DEPTH)),
            Err(ParserError::TooDeep(MAX_NESTING_DEPTH))
        );
        assert_eq!(parse(&nested(10_000)), Err(ParserError::TooDeep(MAX_NESTING_DEPTH)));
        assert!(matches!(
            parse(&format!("{}1", "-(".repeat(500))),
            Err(ParserError::TooDeep(_))
        ));

        let mut shallow = Parser::new(nested(5)).unwrap().with_max_depth(3);
        assert_eq!(shallow.parse(), Err(ParserError::TooDeep(3)));
    }
}
