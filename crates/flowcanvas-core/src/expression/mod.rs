//! Condition expressions for `condition` nodes.
//!
//! A small, side-effect-free language: literals, identifiers bound to the node's inputs,
//! member access, arithmetic, comparison and boolean operators. Source text is parsed into
//! an [`Expr`] tree and evaluated against a JSON map; nothing is ever executed as code.
//!
//! ```text
//! default.status == "ok" && default.retries < 3
//! inputs["true"].score >= 0.5 || !flagged
//! ```

mod lexer;
mod parser;
mod value;

use serde_json::Map;
use thiserror::Error;

pub use value::Value;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("unexpected character {ch:?} at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },
    #[error("unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },
    #[error("invalid number {text:?} at offset {offset}")]
    InvalidNumber { text: String, offset: usize },
    #[error("expected {expected} but found {found} at offset {offset}")]
    UnexpectedToken {
        found: String,
        expected: String,
        offset: usize,
    },
    #[error("expression nested too deeply at offset {offset}")]
    TooDeep { offset: usize },
    #[error("expression is {len} bytes long, limit is {max}")]
    TooLong { len: usize, max: usize },
    #[error("{0} is not defined")]
    UnknownIdentifier(String),
    #[error("cannot read property {property} of null")]
    NullAccess { property: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Ident(String),
    Member(Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

/// A parsed condition, reusable across evaluations.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    root: Expr,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self, ExpressionError> {
        Ok(Self {
            source: source.to_string(),
            root: parser::parse(source)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    /// Evaluate against `inputs`. Top-level keys are in scope as identifiers; `inputs`
    /// names the whole map unless a key of that name exists.
    pub fn evaluate(&self, inputs: &Map<String, serde_json::Value>) -> Result<Value, ExpressionError> {
        eval(&self.root, inputs)
    }

    pub fn evaluate_bool(&self, inputs: &Map<String, serde_json::Value>) -> Result<bool, ExpressionError> {
        self.evaluate(inputs).map(|v| v.is_truthy())
    }
}

/// Parse and evaluate `source` in one step, reducing the result to its truthiness.
pub fn evaluate_condition(
    source: &str,
    inputs: &Map<String, serde_json::Value>,
) -> Result<bool, ExpressionError> {
    Expression::parse(source)?.evaluate_bool(inputs)
}

fn eval(expr: &Expr, inputs: &Map<String, serde_json::Value>) -> Result<Value, ExpressionError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Ident(name) => match inputs.get(name) {
            Some(v) => Ok(Value::from(v)),
            None if name == "inputs" => Ok(Value::Object(inputs.clone())),
            None => Err(ExpressionError::UnknownIdentifier(name.clone())),
        },
        Expr::Member(target, key) => {
            let target = eval(target, inputs)?;
            let key = eval(key, inputs)?;
            target
                .member(&key)
                .ok_or_else(|| ExpressionError::NullAccess {
                    property: key.to_string(),
                })
        }
        Expr::Unary(op, operand) => {
            let v = eval(operand, inputs)?;
            Ok(match op {
                UnaryOp::Not => Value::Bool(!v.is_truthy()),
                UnaryOp::Neg => Value::Number(-v.to_number()),
            })
        }
        Expr::Binary(BinaryOp::And, left, right) => {
            let l = eval(left, inputs)?;
            if l.is_truthy() { eval(right, inputs) } else { Ok(l) }
        }
        Expr::Binary(BinaryOp::Or, left, right) => {
            let l = eval(left, inputs)?;
            if l.is_truthy() { Ok(l) } else { eval(right, inputs) }
        }
        Expr::Binary(op, left, right) => {
            let l = eval(left, inputs)?;
            let r = eval(right, inputs)?;
            Ok(apply_binary(*op, &l, &r))
        }
    }
}

fn apply_binary(op: BinaryOp, l: &Value, r: &Value) -> Value {
    match op {
        BinaryOp::Eq => Value::Bool(l.loose_eq(r)),
        BinaryOp::Ne => Value::Bool(!l.loose_eq(r)),
        BinaryOp::StrictEq => Value::Bool(l.strict_eq(r)),
        BinaryOp::StrictNe => Value::Bool(!l.strict_eq(r)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (l, r) {
                (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                _ => l.to_number().partial_cmp(&r.to_number()),
            };
            Value::Bool(ordering.is_some_and(|o| match op {
                BinaryOp::Lt => o.is_lt(),
                BinaryOp::Le => o.is_le(),
                BinaryOp::Gt => o.is_gt(),
                _ => o.is_ge(),
            }))
        }
        BinaryOp::Add => match (l, r) {
            (Value::Str(_), _) | (_, Value::Str(_)) => Value::Str(format!("{l}{r}")),
            _ => Value::Number(l.to_number() + r.to_number()),
        },
        BinaryOp::Sub => Value::Number(l.to_number() - r.to_number()),
        BinaryOp::Mul => Value::Number(l.to_number() * r.to_number()),
        BinaryOp::Div => Value::Number(l.to_number() / r.to_number()),
        BinaryOp::Rem => Value::Number(l.to_number() % r.to_number()),
        BinaryOp::And | BinaryOp::Or => unreachable!("short-circuit operators handled in eval"),
    }
}
