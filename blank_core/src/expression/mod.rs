//! # Formula Expression Language
//!
//! A closed arithmetic language for catalog formulas: numbers, identifiers,
//! `+ - * / ^`, parentheses and calls to pre-registered functions. There is
//! no assignment, no loops and no way to reach anything outside the
//! [`Bindings`] the formula is evaluated against.
//!
//! `switch(cond, a, b)` is the only special form: it evaluates to `b` when
//! `cond` is non-zero and to `a` otherwise, and only the chosen branch is
//! evaluated.
//!
//! ## Example
//!
//! ```rust
//! use blank_core::calibration::{CalibrationConstants, ModelFamily};
//! use blank_core::context::VariableContext;
//! use blank_core::expression::parse;
//!
//! let constants = CalibrationConstants::for_family(ModelFamily::Tubular, 3.0);
//! let ctx = VariableContext::build(300.0, 200.0, 150.0, 3.0, &constants);
//!
//! let expr = parse("L + C90x()*2").unwrap();
//! assert_eq!(expr.evaluate(&ctx).unwrap(), 301.0);
//! ```

mod lexer;
mod parser;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lexer::Lexer;
use parser::Parser;

/// Name of the lazy two-branch selector
pub const SWITCH: &str = "switch";

/// Why a single formula could not be evaluated.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum EvalError {
    #[error("Syntax error at column {position}: {message}")]
    Syntax { message: String, position: usize },

    #[error("Unresolved identifier '{name}'")]
    UnknownIdentifier { name: String },

    #[error("Unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Type mismatch for '{name}': {reason}")]
    TypeMismatch { name: String, reason: String },

    #[error("Function '{name}' expects {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: String,
        found: usize,
    },

    #[error("Result is not a finite number")]
    NonFinite,
}

impl EvalError {
    pub(crate) fn syntax(message: impl Into<String>, position: usize) -> Self {
        EvalError::Syntax {
            message: message.into(),
            position,
        }
    }

    pub(crate) fn arity(name: &str, expected: impl Into<String>, found: usize) -> Self {
        EvalError::Arity {
            name: name.to_string(),
            expected: expected.into(),
            found,
        }
    }

    pub(crate) fn type_mismatch(name: &str, reason: impl Into<String>) -> Self {
        EvalError::TypeMismatch {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Name lookup used during evaluation.
pub trait Bindings {
    /// Value of a bare identifier.
    fn value_of(&self, name: &str) -> Result<f64, EvalError>;

    /// Result of calling `name` with already-evaluated arguments.
    fn call(&self, name: &str, args: &[f64]) -> Result<f64, EvalError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    fn apply(self, a: f64, b: f64) -> Result<f64, EvalError> {
        match self {
            BinaryOp::Add => Ok(a + b),
            BinaryOp::Sub => Ok(a - b),
            BinaryOp::Mul => Ok(a * b),
            BinaryOp::Div => {
                if b == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                Ok(a / b)
            }
            BinaryOp::Pow => Ok(a.powf(b)),
        }
    }
}

/// Parsed formula.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        lhs: Box<Expr>,
        op: BinaryOp,
        rhs: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub(crate) fn binary(lhs: Expr, op: BinaryOp, rhs: Expr) -> Self {
        Expr::Binary {
            lhs: Box::new(lhs),
            op,
            rhs: Box::new(rhs),
        }
    }

    /// Evaluate against `bindings`. Non-finite results are rejected.
    pub fn evaluate(&self, bindings: &impl Bindings) -> Result<f64, EvalError> {
        let value = self.eval(bindings)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(EvalError::NonFinite)
        }
    }

    fn eval(&self, bindings: &impl Bindings) -> Result<f64, EvalError> {
        match self {
            Expr::Number(value) => Ok(*value),
            Expr::Variable(name) => bindings.value_of(name),
            Expr::Unary { op: UnaryOp::Neg, expr } => Ok(-expr.eval(bindings)?),
            Expr::Binary { lhs, op, rhs } => op.apply(lhs.eval(bindings)?, rhs.eval(bindings)?),
            Expr::Call { name, args } if name == SWITCH => {
                if args.len() != 3 {
                    return Err(EvalError::arity(SWITCH, "3", args.len()));
                }
                if args[0].eval(bindings)? != 0.0 {
                    args[2].eval(bindings)
                } else {
                    args[1].eval(bindings)
                }
            }
            Expr::Call { name, args } => {
                let values = args
                    .iter()
                    .map(|arg| arg.eval(bindings))
                    .collect::<Result<Vec<_>, _>>()?;
                bindings.call(name, &values)
            }
        }
    }
}

/// Parse formula text into an expression tree.
pub fn parse(text: &str) -> Result<Expr, EvalError> {
    let tokens = Lexer::new(text).tokenize()?;
    Parser::new(tokens).parse_formula()
}

/// Interpret text that is nothing but a number. A single decimal comma is accepted.
///
/// ```rust
/// use blank_core::expression::parse_numeric_literal;
///
/// assert_eq!(parse_numeric_literal(" 35 "), Some(35.0));
/// assert_eq!(parse_numeric_literal("2,5"), Some(2.5));
/// assert_eq!(parse_numeric_literal("W/2"), None);
/// ```
pub fn parse_numeric_literal(text: &str) -> Option<f64> {
    let text = text.trim();
    let value = match text.parse::<f64>() {
        Ok(value) => value,
        Err(_) if text.matches(',').count() == 1 && !text.contains('.') => {
            text.replace(',', ".").parse::<f64>().ok()?
        }
        Err(_) => return None,
    };
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    struct Scope(BTreeMap<&'static str, f64>);

    impl Bindings for Scope {
        fn value_of(&self, name: &str) -> Result<f64, EvalError> {
            self.0.get(name).copied().ok_or_else(|| EvalError::UnknownIdentifier {
                name: name.to_string(),
            })
        }

        fn call(&self, name: &str, args: &[f64]) -> Result<f64, EvalError> {
            match name {
                "twice" if args.len() == 1 => Ok(args[0] * 2.0),
                "twice" => Err(EvalError::arity(name, "1", args.len())),
                _ => Err(EvalError::UnknownFunction { name: name.to_string() }),
            }
        }
    }

    fn scope() -> Scope {
        Scope(BTreeMap::from([("L", 300.0), ("W", 200.0), ("flag", 1.0), ("off", 0.0)]))
    }

    fn eval(text: &str) -> Result<f64, EvalError> {
        parse(text)?.evaluate(&scope())
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("L + W * 2").unwrap(), 700.0);
        assert_eq!(eval("(L + W) / 2").unwrap(), 250.0);
        assert_eq!(eval("2 ^ 3 ^ 2").unwrap(), 512.0);
        assert_eq!(eval("-2 ^ 2").unwrap(), -4.0);
        assert_eq!(eval("2 ^ -1").unwrap(), 0.5);
        assert_eq!(eval("+L - -W").unwrap(), 500.0);
    }

    #[test]
    fn test_calls() {
        assert_eq!(eval("twice(L)").unwrap(), 600.0);
        assert!(matches!(eval("twice()"), Err(EvalError::Arity { .. })));
        assert!(matches!(eval("nope(1)"), Err(EvalError::UnknownFunction { .. })));
    }

    #[test]
    fn test_switch_selects_second_branch_when_truthy() {
        assert_eq!(eval("switch(flag, 1, 2)").unwrap(), 2.0);
        assert_eq!(eval("switch(off, 1, 2)").unwrap(), 1.0);
    }

    #[test]
    fn test_switch_is_lazy() {
        // The unused branch references an unknown name and is never evaluated
        assert_eq!(eval("switch(flag, missing, W)").unwrap(), 200.0);
        assert!(eval("switch(off, missing, W)").is_err());
        assert!(matches!(eval("switch(flag, 1)"), Err(EvalError::Arity { .. })));
    }

    #[test]
    fn test_failures() {
        assert_eq!(eval("L / (W - 200)"), Err(EvalError::DivisionByZero));
        assert!(matches!(eval("Lss + 1"), Err(EvalError::UnknownIdentifier { .. })));
        assert_eq!(eval("10 ^ 400"), Err(EvalError::NonFinite));
        assert!(matches!(eval("L +"), Err(EvalError::Syntax { .. })));
    }

    #[test]
    fn test_tiny_divisor_is_not_zero() {
        assert_eq!(eval("1 / 1e-17").unwrap(), 1e17);
        assert_eq!(eval("L / 0.0000000000000001").unwrap(), 300.0 / 1e-16);
        assert_eq!(eval("1 / -0"), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn test_numeric_literals() {
        assert_eq!(parse_numeric_literal("5"), Some(5.0));
        assert_eq!(parse_numeric_literal("-1.5"), Some(-1.5));
        assert_eq!(parse_numeric_literal("1,5"), Some(1.5));
        assert_eq!(parse_numeric_literal("1,5,2"), None);
        assert_eq!(parse_numeric_literal("inf"), None);
        assert_eq!(parse_numeric_literal("NaN"), None);
        assert_eq!(parse_numeric_literal(""), None);
    }

    #[test]
    fn test_error_serialization() {
        let err = EvalError::UnknownIdentifier { name: "Wss".into() };
        let json = serde_json::to_string(&err).unwrap();
        let roundtrip: EvalError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, roundtrip);
    }
}
