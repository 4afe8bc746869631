//! Expression instances: the registry plumbing, the per-instance RPN cache
//! and the stack evaluator.

use std::cell::RefCell;
use std::rc::Rc;

use num_rational::BigRational;

use crate::builtins;
use crate::operand::{parse_decimal, Operand, Value};
use crate::registry::{Function, Operator, Registry, UnaryOperator};
use crate::shunting_yard;
use crate::tokenizer::{Token, TokenKind, Tokenizer};
use crate::Error;

/// A parsed-on-demand expression with its own symbol registry.
///
/// The source text is fixed for the life of the instance; the RPN form is
/// computed once on first use and reused. Custom operators, unary operators,
/// functions and variables are registered per instance, so independent
/// instances never interfere (a single instance is not safe for concurrent
/// use).
///
/// ```
/// use feval::Expression;
///
/// let result = Expression::new("if(a > 1, sin(pi / 2), 5 * 9)")
///     .with("a", 2)
///     .eval_string()?;
/// assert_eq!(result, "1");
/// # Ok::<(), feval::Error>(())
/// ```
pub struct Expression {
    text: String,
    registry: Registry,
    rpn: RefCell<Option<Rc<Vec<Token>>>>,
}

enum Slot<'e> {
    Value(Operand<'e>),
    /// Marks the start of a function argument list on the value stack.
    ArgsStart,
}

impl Expression {
    /// Creates an expression over `text` with all built-ins registered.
    pub fn new<S: Into<String>>(text: S) -> Expression {
        let mut registry = Registry::empty();
        builtins::install(&mut registry);
        Expression {
            text: text.into(),
            registry,
            rpn: RefCell::new(None),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Registers an operator, returning the binding it replaced.
    pub fn add_operator(&mut self, operator: Operator) -> Option<Operator> {
        self.registry.add_operator(operator)
    }

    pub fn add_unary_operator(&mut self, operator: UnaryOperator) -> Option<UnaryOperator> {
        self.registry.add_unary_operator(operator)
    }

    pub fn add_function(&mut self, function: Function) -> Option<Function> {
        self.registry.add_function(function)
    }

    /// Binds a variable, returning the previous binding if one existed.
    /// Lookup happens when the result is forced, so rebinding between
    /// evaluations is honored.
    pub fn set_variable<V: Into<Value>>(
        &mut self,
        name: &str,
        value: V,
    ) -> Option<Rc<Operand<'static>>> {
        self.registry.set_variable(name, value)
    }

    /// Builder-style variable binding.
    pub fn with<V: Into<Value>>(mut self, name: &str, value: V) -> Expression {
        self.set_variable(name, value);
        self
    }

    /// Reconfigures which non-letter characters may begin an identifier
    /// (default `_`).
    pub fn set_first_variable_characters(&mut self, chars: &str) {
        self.registry.set_first_var_chars(chars);
    }

    /// A fresh tokenizer over the source text. The token stream is
    /// forward-only; call again for another pass.
    pub fn tokenizer(&self) -> Tokenizer<'_> {
        Tokenizer::new(&self.text, &self.registry)
    }

    /// The validated RPN form, computed once per instance.
    fn rpn(&self) -> Result<Rc<Vec<Token>>, Error> {
        if let Some(rpn) = self.rpn.borrow().as_ref() {
            return Ok(Rc::clone(rpn));
        }
        let rpn = shunting_yard::to_rpn(self.tokenizer(), &self.registry)?;
        shunting_yard::validate(&rpn, &self.registry)?;
        let rpn = Rc::new(rpn);
        *self.rpn.borrow_mut() = Some(Rc::clone(&rpn));
        Ok(rpn)
    }

    /// Space-joined `Kind:surface` rendering of the RPN sequence.
    pub fn to_rpn(&self) -> Result<String, Error> {
        let rpn = self.rpn()?;
        Ok(rpn
            .iter()
            .map(|token| token.to_string())
            .collect::<Vec<_>>()
            .join(" "))
    }

    /// Evaluates the expression to a result operand.
    ///
    /// Structural problems (parse errors, arity mismatches, malformed
    /// literals) are reported here; failures inside operator and function
    /// computations surface when the returned operand is forced, which is
    /// what keeps unselected `if` branches from raising.
    pub fn eval(&self) -> Result<Operand<'_>, Error> {
        let rpn = self.rpn()?;
        let registry = &self.registry;
        let mut stack: Vec<Slot<'_>> = Vec::with_capacity(rpn.len());

        for token in rpn.iter() {
            match token.kind {
                TokenKind::Number => {
                    let value = parse_decimal(&token.surface)?;
                    stack.push(Slot::Value(Operand::eager(Value::Number(value))));
                }
                TokenKind::String => {
                    stack.push(Slot::Value(Operand::eager(Value::Str(token.surface.clone()))));
                }
                TokenKind::Variable => {
                    let name = token.surface.clone();
                    stack.push(Slot::Value(Operand::lazy(move || {
                        match registry.variable(&name) {
                            Some(bound) => bound.value(),
                            None => Err(Error::Expression(format!("Unknown variable: {}", name))),
                        }
                    })));
                }
                TokenKind::UnaryOperator => {
                    let operator = registry.unary_operator(&token.surface).ok_or_else(|| {
                        Error::Expression(format!("Unknown unary operator '{}'", token.surface))
                    })?;
                    let operand = pop_operand(&mut stack, token)?;
                    stack.push(Slot::Value(operator.apply(operand)));
                }
                TokenKind::Operator => {
                    let operator = registry.operator(&token.surface).ok_or_else(|| {
                        Error::Expression(format!("Unknown operator '{}'", token.surface))
                    })?;
                    let right = pop_operand(&mut stack, token)?;
                    let left = pop_operand(&mut stack, token)?;
                    stack.push(Slot::Value(operator.apply(left, right)));
                }
                TokenKind::Function => {
                    let function = registry.function(&token.surface).ok_or_else(|| {
                        Error::Expression(format!("Unknown function '{}'", token.surface))
                    })?;
                    let mut args = Vec::new();
                    loop {
                        match stack.pop() {
                            Some(Slot::Value(operand)) => args.push(operand),
                            Some(Slot::ArgsStart) => break,
                            None => {
                                return Err(Error::Expression(format!(
                                    "Missing argument list for function '{}'",
                                    token
                                )));
                            }
                        }
                    }
                    args.reverse();
                    stack.push(Slot::Value(function.apply(args)));
                }
                TokenKind::OpenParen => stack.push(Slot::ArgsStart),
                TokenKind::CloseParen | TokenKind::Comma => {
                    return Err(Error::Expression(format!(
                        "Unexpected token '{}' in RPN sequence",
                        token
                    )));
                }
            }
        }

        let result = match stack.pop() {
            Some(Slot::Value(operand)) => operand,
            _ => return Err(Error::Expression("Empty expression".to_string())),
        };
        if !stack.is_empty() {
            return Err(Error::Expression("Too many numbers or variables".to_string()));
        }
        Ok(result)
    }

    /// Evaluates and coerces the result to a number.
    pub fn eval_number(&self) -> Result<BigRational, Error> {
        match self.eval()?.number()? {
            Some(value) => Ok(value),
            None => Err(Error::Expression(
                "expression result can't be represented as a number".to_string(),
            )),
        }
    }

    /// Evaluates and coerces the result to a boolean.
    pub fn eval_boolean(&self) -> Result<bool, Error> {
        match self.eval()?.boolean()? {
            Some(value) => Ok(value),
            None => Err(Error::Expression(
                "expression result can't be represented as a boolean".to_string(),
            )),
        }
    }

    /// Evaluates and renders the result as a string.
    pub fn eval_string(&self) -> Result<String, Error> {
        self.eval()?.string()
    }
}

fn pop_operand<'e>(stack: &mut Vec<Slot<'e>>, token: &Token) -> Result<Operand<'e>, Error> {
    match stack.pop() {
        Some(Slot::Value(operand)) => Ok(operand),
        _ => Err(Error::Expression(format!(
            "Missing operand for '{}'",
            token
        ))),
    }
}
