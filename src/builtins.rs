//! Built-in operators, unary operators, functions and variables.
//!
//! Every built-in computation runs inside the lazy operand produced by its
//! registration record, so constructing `5/0` costs nothing until the result
//! is forced. Operands that do not coerce to the type an operation needs are
//! rejected with a "can't be null" error naming the operand and the
//! operation.

use std::cmp::Ordering;

use num_rational::BigRational;
use num_traits::{ToPrimitive, Zero};

use crate::operand::{Operand, Value, ValueKind};
use crate::registry::{
    Function, Operator, Registry, UnaryOperator, PRECEDENCE_ADDITIVE, PRECEDENCE_AND,
    PRECEDENCE_COMPARISON, PRECEDENCE_EQUALITY, PRECEDENCE_MULTIPLICATIVE, PRECEDENCE_OR,
    PRECEDENCE_UNARY,
};
use crate::Error;

/// Registers the default variables, functions, operators and unary
/// operators.
pub(crate) fn install(registry: &mut Registry) {
    install_variables(registry);
    install_functions(registry);
    install_operators(registry);
    install_unary_operators(registry);
}

fn install_variables(registry: &mut Registry) {
    registry.set_variable("false", 0);
    registry.set_variable("true", 1);
    registry.set_variable("pi", float_constant(std::f64::consts::PI));
    registry.set_variable("e", float_constant(std::f64::consts::E));
}

fn float_constant(value: f64) -> Value {
    let rational = BigRational::from_float(value).unwrap_or_else(BigRational::zero);
    Value::Number(rational)
}

fn install_functions(registry: &mut Registry) {
    registry.add_function(Function::new("if", 3, |args| {
        let condition = argument_boolean("if", args, 0)?;
        let index = if condition { 1 } else { 2 };
        match args.get(index) {
            Some(operand) => operand.value(),
            None => Err(null_argument("if", index)),
        }
    }));
    registry.add_function(Function::new("not", 1, |args| {
        Ok(Value::Boolean(!argument_boolean("not", args, 0)?))
    }));
    registry.add_function(extremum("max", |candidate, best| candidate > best));
    registry.add_function(extremum("min", |candidate, best| candidate < best));
    registry.add_function(Function::new("sin", 1, |args| {
        let value = argument_number("sin", args, 0)?;
        let approx = value
            .to_f64()
            .ok_or_else(|| Error::Arithmetic("sin operand is out of range".to_string()))?;
        BigRational::from_float(approx.sin())
            .map(Value::Number)
            .ok_or_else(|| Error::Arithmetic("sin produced a non-finite value".to_string()))
    }));
}

fn extremum<F>(name: &'static str, replaces: F) -> Function
where
    F: Fn(&BigRational, &BigRational) -> bool + 'static,
{
    Function::new(name, -1, move |args| {
        if args.is_empty() {
            return Err(Error::Expression(format!(
                "no operand specified for function \"{}\"",
                name
            )));
        }
        let mut best = argument_number(name, args, 0)?;
        for index in 1..args.len() {
            let value = argument_number(name, args, index)?;
            if replaces(&value, &best) {
                best = value;
            }
        }
        Ok(Value::Number(best))
    })
}

fn install_operators(registry: &mut Registry) {
    registry.add_operator(arithmetic("+", PRECEDENCE_ADDITIVE, |l, r| Ok(l + r)));
    registry.add_operator(arithmetic("-", PRECEDENCE_ADDITIVE, |l, r| Ok(l - r)));
    registry.add_operator(arithmetic("*", PRECEDENCE_MULTIPLICATIVE, |l, r| Ok(l * r)));
    registry.add_operator(arithmetic("/", PRECEDENCE_MULTIPLICATIVE, |l, r| {
        if r.is_zero() {
            Err(Error::Arithmetic("division by zero".to_string()))
        } else {
            Ok(l / r)
        }
    }));

    let equals = Operator::new("=", PRECEDENCE_EQUALITY, false, |left, right| {
        Ok(Value::Boolean(operands_equal(left, right)?))
    });
    registry.add_operator(Operator::proxy("==", &equals));
    registry.add_operator(equals);

    let not_equals = Operator::new("!=", PRECEDENCE_EQUALITY, false, |left, right| {
        Ok(Value::Boolean(!operands_equal(left, right)?))
    });
    registry.add_operator(Operator::proxy("<>", &not_equals));
    registry.add_operator(not_equals);

    // not short-circuit: both sides are forced once the result is
    let and = Operator::new("&&", PRECEDENCE_AND, false, |left, right| {
        let l = left.boolean()?.ok_or_else(|| null_operand("left", "&&"))?;
        let r = right.boolean()?.ok_or_else(|| null_operand("right", "&&"))?;
        Ok(Value::Boolean(l && r))
    });
    registry.add_operator(Operator::proxy("and", &and));
    registry.add_operator(and);

    let or = Operator::new("||", PRECEDENCE_OR, false, |left, right| {
        let l = left.boolean()?.ok_or_else(|| null_operand("left", "||"))?;
        let r = right.boolean()?.ok_or_else(|| null_operand("right", "||"))?;
        Ok(Value::Boolean(l || r))
    });
    registry.add_operator(Operator::proxy("or", &or));
    registry.add_operator(or);

    registry.add_operator(comparison("<", |ordering| ordering == Ordering::Less));
    registry.add_operator(comparison(">", |ordering| ordering == Ordering::Greater));
    registry.add_operator(comparison("<=", |ordering| ordering != Ordering::Greater));
    registry.add_operator(comparison(">=", |ordering| ordering != Ordering::Less));
}

fn arithmetic<F>(symbol: &'static str, precedence: u32, apply: F) -> Operator
where
    F: Fn(BigRational, BigRational) -> Result<BigRational, Error> + 'static,
{
    Operator::new(symbol, precedence, true, move |left, right| {
        let l = left.number()?.ok_or_else(|| null_operand("left", symbol))?;
        let r = right.number()?.ok_or_else(|| null_operand("right", symbol))?;
        Ok(Value::Number(apply(l, r)?))
    })
}

fn comparison<F>(symbol: &'static str, test: F) -> Operator
where
    F: Fn(Ordering) -> bool + 'static,
{
    Operator::new(symbol, PRECEDENCE_COMPARISON, false, move |left, right| {
        let l = left.number()?.ok_or_else(|| null_operand("left", symbol))?;
        let r = right.number()?.ok_or_else(|| null_operand("right", symbol))?;
        Ok(Value::Boolean(test(l.cmp(&r))))
    })
}

fn install_unary_operators(registry: &mut Registry) {
    registry.add_unary_operator(UnaryOperator::new("-", PRECEDENCE_UNARY, |operand| {
        let value = operand
            .number()?
            .ok_or_else(|| null_unary_operand("-"))?;
        Ok(Value::Number(-value))
    }));
    registry.add_unary_operator(UnaryOperator::new("+", PRECEDENCE_UNARY, |operand| {
        let value = operand
            .number()?
            .ok_or_else(|| null_unary_operand("+"))?;
        Ok(Value::Number(value))
    }));
}

/// Cross-type equality: raw values equal, or either side's runtime kind
/// admits coercing both sides to equal values. Coercion failures count as
/// "not equal".
fn operands_equal(left: &Operand<'_>, right: &Operand<'_>) -> Result<bool, Error> {
    let l = left.value()?;
    let r = right.value()?;
    if l == r {
        return Ok(true);
    }
    Ok(coerced_equal(left, right, l.kind()) || coerced_equal(left, right, r.kind()))
}

fn coerced_equal(left: &Operand<'_>, right: &Operand<'_>, kind: ValueKind) -> bool {
    match (left.value_as(kind), right.value_as(kind)) {
        (Ok(Some(l)), Ok(Some(r))) => l == r,
        _ => false,
    }
}

fn null_operand(side: &str, symbol: &str) -> Error {
    Error::Expression(format!(
        "{} operand can't be null for operator {}",
        side, symbol
    ))
}

fn null_unary_operand(symbol: &str) -> Error {
    Error::Expression(format!(
        "operand can't be null for unary operator {}",
        symbol
    ))
}

fn null_argument(name: &str, index: usize) -> Error {
    Error::Expression(format!(
        "operand {} can't be null for function {}",
        index, name
    ))
}

fn argument_number(name: &str, args: &[Operand<'_>], index: usize) -> Result<BigRational, Error> {
    let value = match args.get(index) {
        Some(operand) => operand.number()?,
        None => None,
    };
    value.ok_or_else(|| null_argument(name, index))
}

fn argument_boolean(name: &str, args: &[Operand<'_>], index: usize) -> Result<bool, Error> {
    let value = match args.get(index) {
        Some(operand) => operand.boolean()?,
        None => None,
    };
    value.ok_or_else(|| null_argument(name, index))
}
