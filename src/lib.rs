//! An embeddable arithmetic/boolean expression engine.
//!
//! A textual formula such as `"if(a>1, sin(pi/2), 5*9)"` is tokenized,
//! converted to Reverse Polish notation by a shunting-yard pass honoring
//! precedence, associativity and implicit multiplication, validated for
//! arity, and evaluated by a stack machine into a typed, lazily forced
//! [`Operand`]. Numbers are exact rationals, and values coerce between
//! number, boolean and string representations on demand.
//!
//! Each [`Expression`] owns an independent, case-insensitive registry of
//! operators, unary operators, functions and variables, so callers can
//! extend or override any of them per instance:
//!
//! ```
//! use feval::{Expression, Function, Value};
//!
//! let mut expression = Expression::new("double(x) + 1").with("x", 20);
//! expression.add_function(Function::new("double", 1, |args| {
//!     match args[0].number()? {
//!         Some(n) => Ok(Value::Number(n.clone() + n)),
//!         None => Err(feval::Error::Expression("operand can't be null".into())),
//!     }
//! }));
//! assert_eq!(expression.eval_string()?, "41");
//! # Ok::<(), feval::Error>(())
//! ```
//!
//! Evaluation results are lazy: operators and functions build deferred
//! operands, and only the values actually requested are computed. That is
//! what makes `if(1, 0, 5/0)` evaluate to `0` without raising — the
//! untaken branch is constructed but never forced.

use std::fmt;

pub mod operand;
pub mod registry;
pub mod shunting_yard;
pub mod tokenizer;

mod builtins;
mod expr;

pub use crate::expr::Expression;
pub use crate::operand::{Operand, Value, ValueKind};
pub use crate::registry::{
    Function, Operator, Registry, UnaryOperator, PRECEDENCE_ADDITIVE, PRECEDENCE_AND,
    PRECEDENCE_COMPARISON, PRECEDENCE_EQUALITY, PRECEDENCE_MULTIPLICATIVE, PRECEDENCE_OR,
    PRECEDENCE_POWER, PRECEDENCE_UNARY,
};
pub use crate::tokenizer::{Token, TokenKind, Tokenizer};

/// An error produced while scanning, parsing, validating or evaluating an
/// expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Structural and lookup failures: unknown names, arity mismatches,
    /// mismatched parentheses, stray commas, null operands.
    Expression(String),
    /// Numeric evaluation failures such as division by zero.
    Arithmetic(String),
    /// A string that does not parse as a decimal number.
    Format(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Expression(message) => f.write_str(message),
            Error::Arithmetic(message) => write!(f, "arithmetic error: {}", message),
            Error::Format(message) => write!(f, "format error: {}", message),
        }
    }
}

impl std::error::Error for Error {}

/// Parses and evaluates an expression with the default built-ins, forcing
/// the result.
pub fn eval_str<S: AsRef<str>>(text: S) -> Result<Value, Error> {
    Expression::new(text.as_ref()).eval()?.value()
}
