//! Typed values and lazily evaluated operands.
//!
//! A [`Value`] is the canonical result of evaluating anything: an exact
//! rational number, a boolean, or a string. An [`Operand`] wraps either a
//! ready value or a deferred computation; deferring is what gives `if` its
//! short-circuit behavior, since building an operand is cheap and the
//! computation inside only runs when the value is actually requested.

use std::cell::RefCell;
use std::fmt;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use crate::Error;

/// A typed expression value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// An exact rational number.
    Number(BigRational),
    Boolean(bool),
    Str(String),
}

/// The type tag of a [`Value`], used to request coercions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Number,
    Boolean,
    Str,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Number(_) => ValueKind::Number,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Str(_) => ValueKind::Str,
        }
    }

    /// Converts the value to the target kind.
    ///
    /// `Ok(None)` means the conversion is undefined (e.g. string to
    /// boolean); a string that fails to parse as a number is a
    /// [`Error::Format`]. Coercions: boolean from number is "nonzero",
    /// number from boolean is 1/0, number from string parses a decimal, and
    /// anything renders as a string.
    pub fn coerce(&self, target: ValueKind) -> Result<Option<Value>, Error> {
        if self.kind() == target {
            return Ok(Some(self.clone()));
        }
        Ok(match (self, target) {
            (Value::Number(n), ValueKind::Boolean) => Some(Value::Boolean(!n.is_zero())),
            (Value::Boolean(b), ValueKind::Number) => {
                let n = if *b { BigRational::one() } else { BigRational::zero() };
                Some(Value::Number(n))
            }
            (Value::Str(s), ValueKind::Number) => Some(Value::Number(parse_decimal(s)?)),
            (_, ValueKind::Str) => Some(Value::Str(self.to_string())),
            _ => None,
        })
    }

    pub fn as_number(&self) -> Result<Option<BigRational>, Error> {
        match self.coerce(ValueKind::Number)? {
            Some(Value::Number(n)) => Ok(Some(n)),
            _ => Ok(None),
        }
    }

    pub fn as_boolean(&self) -> Result<Option<bool>, Error> {
        match self.coerce(ValueKind::Boolean)? {
            Some(Value::Boolean(b)) => Ok(Some(b)),
            _ => Ok(None),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => f.write_str(&format_decimal(n)),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl From<BigRational> for Value {
    fn from(value: BigRational) -> Value {
        Value::Number(value)
    }
}

impl From<BigInt> for Value {
    fn from(value: BigInt) -> Value {
        Value::Number(BigRational::from_integer(value))
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Value {
        Value::Number(BigRational::from_integer(value.into()))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Value {
        Value::Number(BigRational::from_integer(value.into()))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Value {
        Value::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Value {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Value {
        Value::Str(value)
    }
}

fn pow10(exponent: u32) -> BigInt {
    BigInt::from(10).pow(exponent)
}

/// Parses a decimal string (optional sign, optional fraction, optional
/// exponent) into an exact rational.
pub(crate) fn parse_decimal(text: &str) -> Result<BigRational, Error> {
    let err = || Error::Format(format!("`{}` is not a valid decimal number", text));

    let unsigned = match text.strip_prefix('-') {
        Some(rest) => rest,
        None => text.strip_prefix('+').unwrap_or(text),
    };
    let negative = text.starts_with('-');

    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(i) => {
            let exponent: i64 = unsigned[i + 1..].parse().map_err(|_| err())?;
            (&unsigned[..i], exponent)
        }
        None => (unsigned, 0),
    };
    let (int_part, frac_part) = match mantissa.find('.') {
        Some(i) => (&mantissa[..i], &mantissa[i + 1..]),
        None => (mantissa, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(err());
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(err());
    }

    let mut numer: BigInt = format!("{}{}", int_part, frac_part).parse().map_err(|_| err())?;
    let scale = frac_part.len() as i64 - exponent;
    let denom = if scale > 0 {
        pow10(scale.unsigned_abs() as u32)
    } else {
        numer *= pow10(scale.unsigned_abs() as u32);
        BigInt::one()
    };
    let value = BigRational::new(numer, denom);
    Ok(if negative { -value } else { value })
}

/// Renders an exact rational: a plain decimal when the denominator is of the
/// form 2^a * 5^b, `numer/denom` otherwise.
pub(crate) fn format_decimal(value: &BigRational) -> String {
    let denom = value.denom();
    if denom.is_one() {
        return value.numer().to_string();
    }
    let (two, five) = (BigInt::from(2), BigInt::from(5));
    let mut rest = denom.clone();
    let mut twos = 0u32;
    let mut fives = 0u32;
    while (&rest % &two).is_zero() {
        rest /= &two;
        twos += 1;
    }
    while (&rest % &five).is_zero() {
        rest /= &five;
        fives += 1;
    }
    if !rest.is_one() {
        return format!("{}/{}", value.numer(), value.denom());
    }
    let digits = twos.max(fives);
    let scaled = (value.numer() * pow10(digits)) / denom;
    scaled_to_decimal(scaled, digits as usize)
}

fn scaled_to_decimal(mut scaled: BigInt, digits: usize) -> String {
    let negative = scaled.is_negative();
    if negative {
        scaled = -scaled;
    }
    let scale = pow10(digits as u32);
    let int_part = &scaled / &scale;
    let mut frac = (&scaled % &scale).to_str_radix(10);
    while frac.len() < digits {
        frac.insert(0, '0');
    }
    if negative {
        format!("-{}.{}", int_part, frac)
    } else {
        format!("{}.{}", int_part, frac)
    }
}

type Thunk<'e> = Box<dyn Fn() -> Result<Value, Error> + 'e>;

/// A deferred or immediate typed value.
///
/// Lazy operands memoize their first successful computation; a computation
/// that fails is retried on the next access instead of caching the error, so
/// inspecting a failed operand twice behaves identically both times.
pub struct Operand<'e> {
    thunk: Option<Thunk<'e>>,
    memo: RefCell<Option<Value>>,
}

impl<'e> Operand<'e> {
    /// An operand wrapping an already-computed value.
    pub fn eager<V: Into<Value>>(value: V) -> Operand<'e> {
        Operand {
            thunk: None,
            memo: RefCell::new(Some(value.into())),
        }
    }

    /// An operand wrapping a computation that runs on first access.
    pub fn lazy<F>(f: F) -> Operand<'e>
    where
        F: Fn() -> Result<Value, Error> + 'e,
    {
        Operand {
            thunk: Some(Box::new(f)),
            memo: RefCell::new(None),
        }
    }

    /// Forces the operand and returns its canonical value.
    pub fn value(&self) -> Result<Value, Error> {
        if let Some(value) = self.memo.borrow().as_ref() {
            return Ok(value.clone());
        }
        let thunk = match &self.thunk {
            Some(f) => f,
            None => return Err(Error::Expression("operand has no value".to_string())),
        };
        let value = thunk()?;
        *self.memo.borrow_mut() = Some(value.clone());
        Ok(value)
    }

    /// Forces the operand and coerces to the target kind; `Ok(None)` when
    /// the coercion is undefined.
    pub fn value_as(&self, target: ValueKind) -> Result<Option<Value>, Error> {
        self.value()?.coerce(target)
    }

    pub fn number(&self) -> Result<Option<BigRational>, Error> {
        self.value()?.as_number()
    }

    pub fn boolean(&self) -> Result<Option<bool>, Error> {
        self.value()?.as_boolean()
    }

    pub fn string(&self) -> Result<String, Error> {
        Ok(self.value()?.to_string())
    }

    /// Whether the operand has already been forced successfully.
    pub fn is_evaluated(&self) -> bool {
        self.memo.borrow().is_some()
    }
}

impl fmt::Debug for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.memo.borrow().as_ref() {
            Some(value) => write!(f, "Operand({:?})", value),
            None => f.write_str("Operand(<pending>)"),
        }
    }
}
