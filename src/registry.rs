//! Symbol tables: operators, unary operators, functions and variables.
//!
//! Behaviors are closure records dispatched by name lookup. Every map is
//! case-insensitive and "last write wins": registering a name that already
//! exists replaces the binding and hands back the previous one. Unary
//! operators live under a `u`-suffixed key so the unary and binary forms of
//! the same symbol (e.g. `-`) never collide.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::operand::{Operand, Value};
use crate::Error;

pub const PRECEDENCE_OR: u32 = 2;
pub const PRECEDENCE_AND: u32 = 4;
pub const PRECEDENCE_EQUALITY: u32 = 7;
pub const PRECEDENCE_COMPARISON: u32 = 10;
pub const PRECEDENCE_ADDITIVE: u32 = 20;
pub const PRECEDENCE_MULTIPLICATIVE: u32 = 30;
pub const PRECEDENCE_POWER: u32 = 40;
pub const PRECEDENCE_UNARY: u32 = 60;

type BinaryFn = dyn for<'e> Fn(&Operand<'e>, &Operand<'e>) -> Result<Value, Error>;
type UnaryFn = dyn for<'e> Fn(&Operand<'e>) -> Result<Value, Error>;
type VariadicFn = dyn for<'e> Fn(&[Operand<'e>]) -> Result<Value, Error>;

/// A binary operator: symbol, precedence, associativity and the computation
/// applied to its two operands.
#[derive(Clone)]
pub struct Operator {
    symbol: String,
    precedence: u32,
    left_associative: bool,
    func: Rc<BinaryFn>,
}

impl Operator {
    pub fn new<F>(symbol: &str, precedence: u32, left_associative: bool, func: F) -> Operator
    where
        F: for<'e> Fn(&Operand<'e>, &Operand<'e>) -> Result<Value, Error> + 'static,
    {
        Operator {
            symbol: symbol.to_string(),
            precedence,
            left_associative,
            func: Rc::new(func),
        }
    }

    /// An alias sharing the behavior of an existing operator under a new
    /// symbol.
    pub fn proxy(symbol: &str, target: &Operator) -> Operator {
        Operator {
            symbol: symbol.to_string(),
            precedence: target.precedence,
            left_associative: target.left_associative,
            func: Rc::clone(&target.func),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn precedence(&self) -> u32 {
        self.precedence
    }

    pub fn is_left_associative(&self) -> bool {
        self.left_associative
    }

    /// Applies the operator lazily: the returned operand runs the computation
    /// only when forced.
    pub fn apply<'e>(&self, left: Operand<'e>, right: Operand<'e>) -> Operand<'e> {
        let func = Rc::clone(&self.func);
        Operand::lazy(move || func(&left, &right))
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("symbol", &self.symbol)
            .field("precedence", &self.precedence)
            .field("left_associative", &self.left_associative)
            .finish()
    }
}

/// A unary operator: symbol, precedence and the computation applied to its
/// single operand.
#[derive(Clone)]
pub struct UnaryOperator {
    symbol: String,
    precedence: u32,
    func: Rc<UnaryFn>,
}

impl UnaryOperator {
    pub fn new<F>(symbol: &str, precedence: u32, func: F) -> UnaryOperator
    where
        F: for<'e> Fn(&Operand<'e>) -> Result<Value, Error> + 'static,
    {
        UnaryOperator {
            symbol: symbol.to_string(),
            precedence,
            func: Rc::new(func),
        }
    }

    pub fn proxy(symbol: &str, target: &UnaryOperator) -> UnaryOperator {
        UnaryOperator {
            symbol: symbol.to_string(),
            precedence: target.precedence,
            func: Rc::clone(&target.func),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn precedence(&self) -> u32 {
        self.precedence
    }

    pub fn apply<'e>(&self, operand: Operand<'e>) -> Operand<'e> {
        let func = Rc::clone(&self.func);
        Operand::lazy(move || func(&operand))
    }
}

impl fmt::Debug for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnaryOperator")
            .field("symbol", &self.symbol)
            .field("precedence", &self.precedence)
            .finish()
    }
}

/// A named function with a fixed arity (negative means variadic).
#[derive(Clone)]
pub struct Function {
    name: String,
    arity: i32,
    func: Rc<VariadicFn>,
}

impl Function {
    pub fn new<F>(name: &str, arity: i32, func: F) -> Function
    where
        F: for<'e> Fn(&[Operand<'e>]) -> Result<Value, Error> + 'static,
    {
        Function {
            name: name.to_string(),
            arity,
            func: Rc::new(func),
        }
    }

    pub fn proxy(name: &str, target: &Function) -> Function {
        Function {
            name: name.to_string(),
            arity: target.arity,
            func: Rc::clone(&target.func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> i32 {
        self.arity
    }

    pub fn is_variadic(&self) -> bool {
        self.arity < 0
    }

    pub fn apply<'e>(&self, args: Vec<Operand<'e>>) -> Operand<'e> {
        let func = Rc::clone(&self.func);
        Operand::lazy(move || func(&args))
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// The symbol tables owned by one expression instance.
pub struct Registry {
    operators: BTreeMap<String, Operator>,
    unary_operators: BTreeMap<String, UnaryOperator>,
    functions: BTreeMap<String, Function>,
    variables: BTreeMap<String, Rc<Operand<'static>>>,
    first_var_chars: String,
}

impl Registry {
    pub(crate) fn empty() -> Registry {
        Registry {
            operators: BTreeMap::new(),
            unary_operators: BTreeMap::new(),
            functions: BTreeMap::new(),
            variables: BTreeMap::new(),
            first_var_chars: "_".to_string(),
        }
    }

    fn key(name: &str) -> String {
        name.to_lowercase()
    }

    pub fn add_operator(&mut self, operator: Operator) -> Option<Operator> {
        self.operators.insert(Self::key(operator.symbol()), operator)
    }

    pub fn operator(&self, symbol: &str) -> Option<&Operator> {
        self.operators.get(&Self::key(symbol))
    }

    pub fn has_operator(&self, symbol: &str) -> bool {
        self.operators.contains_key(&Self::key(symbol))
    }

    pub fn add_unary_operator(&mut self, operator: UnaryOperator) -> Option<UnaryOperator> {
        let key = format!("{}u", Self::key(operator.symbol()));
        self.unary_operators.insert(key, operator)
    }

    /// Looks up a unary operator by token surface, which already carries the
    /// disambiguating `u` suffix.
    pub fn unary_operator(&self, surface: &str) -> Option<&UnaryOperator> {
        self.unary_operators.get(&Self::key(surface))
    }

    pub fn add_function(&mut self, function: Function) -> Option<Function> {
        self.functions.insert(Self::key(function.name()), function)
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(&Self::key(name))
    }

    /// Binds a variable, returning the previous binding if one existed. The
    /// bound operand is shared by reference until rebound.
    pub fn set_variable<V: Into<Value>>(&mut self, name: &str, value: V) -> Option<Rc<Operand<'static>>> {
        self.variables
            .insert(Self::key(name), Rc::new(Operand::eager(value.into())))
    }

    pub fn variable(&self, name: &str) -> Option<Rc<Operand<'static>>> {
        self.variables.get(&Self::key(name)).map(Rc::clone)
    }

    /// Non-letter characters allowed to start an identifier (default `_`).
    pub fn first_var_chars(&self) -> &str {
        &self.first_var_chars
    }

    pub fn set_first_var_chars(&mut self, chars: &str) {
        self.first_var_chars = chars.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operand::ValueKind;

    #[test]
    fn test_case_insensitive_lookup_and_replacement() {
        let mut registry = Registry::empty();
        registry.set_variable("A", 20);
        assert_eq!(registry.variable("a").and_then(|v| v.number().ok()).flatten(),
                   Some(num_rational::BigRational::from_integer(20.into())));

        let previous = registry.set_variable("a", 5);
        assert!(previous.is_some());

        registry.add_function(Function::new("testSum", -1, |_| Ok(Value::Boolean(true))));
        assert!(registry.function("TESTSUM").is_some());
    }

    #[test]
    fn test_unary_key_is_suffixed() {
        let mut registry = Registry::empty();
        registry.add_unary_operator(UnaryOperator::new("-", PRECEDENCE_UNARY, |operand| {
            operand.value()
        }));
        assert!(registry.unary_operator("-u").is_some());
        assert!(registry.unary_operator("-").is_none());
        assert!(registry.operator("-").is_none());
    }

    #[test]
    fn test_proxy_shares_behavior() {
        let equals = Operator::new("=", PRECEDENCE_EQUALITY, false, |left, right| {
            Ok(Value::Boolean(left.value()? == right.value()?))
        });
        let alias = Operator::proxy("==", &equals);
        assert_eq!(alias.symbol(), "==");
        assert_eq!(alias.precedence(), PRECEDENCE_EQUALITY);

        let result = alias.apply(Operand::eager(1), Operand::eager(1));
        assert_eq!(result.value_as(ValueKind::Boolean), Ok(Some(Value::Boolean(true))));
    }
}
