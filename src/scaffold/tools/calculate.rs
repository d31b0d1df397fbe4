//! Arithmetic calculator tool.
//!
//! Accepts digits, `+ - * / ( ) .` and spaces, with `**` for powers and
//! `//` for floor division. Failures are reported to the model as
//! `Error: ...` text rather than tool errors.

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use super::{string_arg, Tool, ToolError, ToolOutput};
use crate::scaffold::state::ConversationState;

const ALLOWED_CHARS: &str = "0123456789+-*/(). ";

/// Deepest nesting of signs, parentheses and exponents accepted.
const MAX_DEPTH: usize = 64;

#[derive(Debug, Error, PartialEq)]
enum CalcError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("invalid syntax")]
    InvalidSyntax,

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("result is not a finite number")]
    NotFinite,

    #[error("expression too deeply nested")]
    TooDeep,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    Power,
    Slash,
    FloorDiv,
    LParen,
    RParen,
}

fn tokenize(expression: &str) -> Result<Vec<Token>, CalcError> {
    let chars: Vec<char> = expression.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let next = chars.get(i + 1).copied();
        let token = match ch {
            ' ' => {
                i += 1;
                continue;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let raw: String = chars[start..i].iter().collect();
                let value = raw
                    .parse::<f64>()
                    .map_err(|_| CalcError::InvalidNumber(raw.clone()))?;
                tokens.push(Token::Num(value));
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' if next == Some('*') => {
                i += 1;
                Token::Power
            }
            '*' => Token::Star,
            '/' if next == Some('/') => {
                i += 1;
                Token::FloorDiv
            }
            '/' => Token::Slash,
            '(' => Token::LParen,
            ')' => Token::RParen,
            _ => return Err(CalcError::InvalidSyntax),
        };
        tokens.push(token);
        i += 1;
    }

    Ok(tokens)
}

struct Evaluator {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Evaluator {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> Result<f64, CalcError> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == Token::Plus { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, CalcError> {
        let mut value = self.unary()?;
        while let Some(op @ (Token::Star | Token::Slash | Token::FloorDiv)) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                Token::Star => value * rhs,
                _ if rhs == 0.0 => return Err(CalcError::DivisionByZero),
                Token::Slash => value / rhs,
                _ => (value / rhs).floor(),
            };
        }
        Ok(value)
    }

    /// Every recursive path (signs, parentheses, exponents) passes through
    /// here, so this is where nesting is bounded.
    fn unary(&mut self) -> Result<f64, CalcError> {
        if self.depth >= MAX_DEPTH {
            return Err(CalcError::TooDeep);
        }
        self.depth += 1;
        let value = self.signed();
        self.depth -= 1;
        value
    }

    fn signed(&mut self) -> Result<f64, CalcError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    /// `**` binds tighter than a unary sign on its left and is right-associative.
    fn power(&mut self) -> Result<f64, CalcError> {
        let base = self.primary()?;
        if self.peek() == Some(Token::Power) {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64, CalcError> {
        match self.next() {
            Some(Token::Num(value)) => Ok(value),
            Some(Token::LParen) => {
                let value = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(CalcError::InvalidSyntax),
                }
            }
            _ => Err(CalcError::InvalidSyntax),
        }
    }
}

fn evaluate(expression: &str) -> Result<f64, CalcError> {
    let mut evaluator = Evaluator {
        tokens: tokenize(expression)?,
        pos: 0,
        depth: 0,
    };
    let value = evaluator.expr()?;
    if evaluator.pos != evaluator.tokens.len() {
        return Err(CalcError::InvalidSyntax);
    }
    if !value.is_finite() {
        return Err(CalcError::NotFinite);
    }
    Ok(value)
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Evaluate `expression`, returning the result or an `Error: ...` string.
pub fn calculate(expression: &str) -> String {
    if !expression.chars().all(|c| ALLOWED_CHARS.contains(c)) {
        return "Error: Invalid characters in expression".to_string();
    }
    match evaluate(expression) {
        Ok(value) => format_number(value),
        Err(e) => format!("Error: {}", e),
    }
}

pub struct CalculateTool;

#[async_trait]
impl Tool for CalculateTool {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Calculate a mathematical expression (e.g. \"2 + 2\", \"10 * 5\")."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "A mathematical expression to evaluate"
                }
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, args: Value, _state: &ConversationState) -> Result<ToolOutput, ToolError> {
        let expression = string_arg(&args, "expression")?;
        Ok(ToolOutput::value(calculate(expression)))
    }
}
