//! Behavioral tests exercising the full pipeline through the public API.

use num_rational::BigRational;
use num_traits::ToPrimitive;

use feval::{Error, Expression, Function, Operator, UnaryOperator, Value, PRECEDENCE_ADDITIVE};

fn eval_number(text: &str) -> BigRational {
    Expression::new(text).eval_number().unwrap()
}

fn eval_boolean(text: &str) -> bool {
    Expression::new(text).eval_boolean().unwrap()
}

fn eval_string(text: &str) -> String {
    Expression::new(text).eval_string().unwrap()
}

fn num(n: i64) -> BigRational {
    BigRational::from_integer(n.into())
}

fn ratio(numer: i64, denom: i64) -> BigRational {
    BigRational::new(numer.into(), denom.into())
}

#[test]
fn arithmetic() {
    assert_eq!(eval_number("5 + 9"), num(14));
    assert_eq!(eval_number("5+9"), num(14));
    assert_eq!(eval_number("0+9"), num(9));
    assert_eq!(eval_number("0+0"), num(0));
    assert_eq!(eval_number("0+0.5"), ratio(1, 2));
    assert_eq!(eval_number("5 - 9"), num(-4));
    assert_eq!(eval_number("5 * 9"), num(45));
    assert_eq!(eval_number("9*5"), num(45));
    assert_eq!(eval_number("0 * 9"), num(0));
    assert_eq!(eval_number("10 / 4"), ratio(5, 2));
    assert_eq!(eval_number("2 + 3 * 4"), num(14));
    assert_eq!(eval_number("(2 + 3) * 4"), num(20));
    assert_eq!(eval_number("3 - 1 - 2"), num(0));
}

#[test]
fn implicit_multiplication() {
    assert_eq!(eval_number("2(3+4)"), num(14));
    assert_eq!(eval_number("(1+1)(3+4)"), num(14));
}

#[test]
fn unary_operators() {
    assert_eq!(eval_number("-2"), num(-2));
    assert_eq!(eval_number("+2"), num(2));
    assert_eq!(eval_number("3--2"), num(5));
    assert_eq!(eval_number("-2 * 3"), num(-6));
    assert_eq!(eval_number("-(2 + 3)"), num(-5));
}

#[test]
fn division_by_zero() {
    assert_eq!(
        Expression::new("5/0").eval_number(),
        Err(Error::Arithmetic("division by zero".to_string()))
    );
}

#[test]
fn booleans() {
    assert!(!eval_boolean("1&&0"));
    assert!(eval_boolean("1&&1"));
    assert!(!eval_boolean("0&&0"));
    assert!(!eval_boolean("0&&1"));
    assert!(eval_boolean("1||0"));
    assert!(eval_boolean("1||1"));
    assert!(!eval_boolean("0||0"));
    assert!(eval_boolean("0||1"));
}

#[test]
fn comparisons() {
    assert!(eval_boolean("2>1"));
    assert!(!eval_boolean("2<1"));
    assert!(!eval_boolean("1>2"));
    assert!(eval_boolean("1<2"));
    assert!(!eval_boolean("1=2"));
    assert!(eval_boolean("1=1"));
    assert!(eval_boolean("1>=1"));
    assert!(eval_boolean("1.1>=1"));
    assert!(!eval_boolean("1>=2"));
    assert!(eval_boolean("1<=1"));
    assert!(!eval_boolean("1.1<=1"));
    assert!(eval_boolean("1<=2"));
    assert!(eval_boolean("1!=2"));
    assert!(!eval_boolean("1!=1"));
    assert!(eval_boolean("1<>2"));
}

#[test]
fn combined_comparisons() {
    assert!(eval_boolean("(2>1)||(1=0)"));
    assert!(!eval_boolean("(2>3)||(1=0)"));
    assert!(eval_boolean("(2>3)||(1=0)||(1&&1)"));
    assert!(!eval_boolean("1.5 * 7 = 3"));
    assert!(eval_boolean("1.5 * 7 = 10.5"));
}

#[test]
fn not_function() {
    assert!(!eval_boolean("not(1)"));
    assert!(eval_boolean("not(0)"));
    assert!(eval_boolean("not(1.5 * 7 = 3)"));
    assert!(!eval_boolean("not(1.5 * 7 = 10.5)"));
}

#[test]
fn boolean_constants() {
    assert!(eval_boolean("TRUE!=FALSE"));
    assert!(!eval_boolean("TRUE==2"));
    assert!(eval_boolean("NOT(TRUE)==FALSE"));
    assert!(eval_boolean("NOT(FALSE)==TRUE"));
    assert!(!eval_boolean("TRUE && FALSE"));
    assert!(eval_boolean("TRUE || FALSE"));
}

#[test]
fn decimal_zero_is_false() {
    assert!(!eval_boolean("if(0.0, 1, 0)"));
    assert!(!eval_boolean("0.0 || 0.0"));
    assert!(eval_boolean("not(0.0)"));
    assert!(!eval_boolean("0.0 && 0.0"));
}

#[test]
fn conditionals() {
    assert_eq!(eval_number("if(TRUE, 5, 3)"), num(5));
    assert_eq!(eval_number("IF(FALSE, 5, 3)"), num(3));
    assert_eq!(eval_number("If(2, 5.35, 3)"), ratio(107, 20));
    assert_eq!(eval_number("if(0 = 0, 5, 8)"), num(5));
}

#[test]
fn string_equality() {
    assert_eq!(eval_number("if(\"a\" = \"a\", 5, 8)"), num(5));
    assert_eq!(eval_number("if(\"a\" = \"b\", 5, 8)"), num(8));
    assert_eq!(eval_string("if(\"a\"=\"bsss\", \"tttt\", \"vvvv\")"), "vvvv");
    assert_eq!(eval_string("if(\"a\"=5, \"tttt\", \"vvvv\")"), "vvvv");
    assert_eq!(eval_string("if(\"a\"=\"a\", \"tttt\", \"vvvv\")"), "tttt");
}

#[test]
fn cross_type_equality() {
    assert!(eval_boolean("\"1\" = 1"));
    assert!(eval_boolean("1 = \"1.0\""));
    assert!(!eval_boolean("\"a\" = 5"));
}

#[test]
fn lazy_evaluation() {
    assert_eq!(eval_number("if(1, 0, 5/0)"), num(0));
    assert_eq!(eval_number("if(1, 0, A)"), num(0));
    assert_eq!(
        Expression::new("if(0, 0, 5/0)").eval_number(),
        Err(Error::Arithmetic("division by zero".to_string()))
    );
    assert_eq!(
        Expression::new("if(0, 0, A)").eval_number(),
        Err(Error::Expression("Unknown variable: A".to_string()))
    );
}

#[test]
fn variadic_functions() {
    assert_eq!(eval_number("max(1,9,6,4,15)"), num(15));
    assert_eq!(eval_number("max(1,9,6,4,\"45\")"), num(45));
    assert_eq!(eval_number("min(-45,9,6,4,15)"), num(-45));
    assert_eq!(eval_number("min(1,0,6,4,\"45\")"), num(0));
    assert!(matches!(
        Expression::new("max()").eval_number(),
        Err(Error::Expression(message)) if message.starts_with("no operand specified")
    ));
    assert!(matches!(
        Expression::new("min()").eval_number(),
        Err(Error::Expression(message)) if message.starts_with("no operand specified")
    ));
    assert!(matches!(
        Expression::new("max(1,5,9,\"6a\")").eval_number(),
        Err(Error::Format(_))
    ));
}

#[test]
fn trigonometry() {
    assert_eq!(eval_number("sin(pi/2)"), num(1));
    let near_zero = eval_number("sin(pi)").to_f64().unwrap();
    assert!(near_zero.abs() < 1e-15);
}

#[test]
fn case_insensitive_variables() {
    let mut expression = Expression::new("a");
    expression.set_variable("A", 20);
    assert_eq!(expression.eval_number(), Ok(num(20)));

    let expression = Expression::new("a + B").with("A", 10).with("b", 10);
    assert_eq!(expression.eval_number(), Ok(num(20)));
}

#[test]
fn case_insensitive_custom_function() {
    let mut expression = Expression::new("a+testsum(1,3)").with("A", 1);
    expression.add_function(Function::new("testSum", -1, |args| {
        let mut total: Option<BigRational> = None;
        for operand in args {
            let value = match operand.number()? {
                Some(value) => value,
                None => {
                    return Err(Error::Expression(
                        "operand can't be null for function testSum".to_string(),
                    ));
                }
            };
            total = Some(match total {
                Some(total) => total + value,
                None => value,
            });
        }
        match total {
            Some(total) => Ok(Value::Number(total)),
            None => Err(Error::Expression(
                "no operand specified for function \"testSum\"".to_string(),
            )),
        }
    }));
    assert_eq!(expression.eval_number(), Ok(num(5)));
}

#[test]
fn custom_function_is_lazy() {
    let mut expression = Expression::new("addFive(0)");
    expression.add_function(Function::new("addFive", 1, |args| {
        let value = match args[0].number()? {
            Some(value) => value,
            None => {
                return Err(Error::Expression(
                    "operand can't be null for function addFive".to_string(),
                ));
            }
        };
        Ok(Value::Number(value + num(5)))
    }));
    assert_eq!(expression.eval_number(), Ok(num(5)));
}

#[test]
fn custom_operator_and_alias() {
    let mut expression = Expression::new("3 ~ 4 plus(2)");
    // `~` behaves like subtraction at additive precedence
    expression.add_operator(Operator::new("~", PRECEDENCE_ADDITIVE, true, |left, right| {
        let l = left.number()?.ok_or_else(|| {
            Error::Expression("left operand can't be null for operator ~".to_string())
        })?;
        let r = right.number()?.ok_or_else(|| {
            Error::Expression("right operand can't be null for operator ~".to_string())
        })?;
        Ok(Value::Number(l - r))
    }));
    // alias an existing operator under a word name usable in call position
    let plus = expression
        .registry()
        .operator("+")
        .cloned()
        .expect("built-in + is registered");
    expression.add_operator(Operator::proxy("plus", &plus));
    // 3 ~ (4 plus 2)? No: `plus(`-style word operators bind like `+`, so
    // the stream reads 3 ~ 4 + 2 = (3 - 4) + 2
    assert_eq!(expression.eval_number(), Ok(num(1)));
}

#[test]
fn custom_unary_operator() {
    let mut expression = Expression::new("!5 + 1");
    expression.add_unary_operator(UnaryOperator::new("!", feval::PRECEDENCE_UNARY, |operand| {
        let value = operand.number()?.ok_or_else(|| {
            Error::Expression("operand can't be null for unary operator !".to_string())
        })?;
        Ok(Value::Number(value * num(2)))
    }));
    assert_eq!(expression.eval_number(), Ok(num(11)));
}

#[test]
fn function_and_unary_aliases() {
    let mut expression = Expression::new("maximum(1, 9, 4) + ~2");
    let max = expression
        .registry()
        .function("max")
        .cloned()
        .expect("built-in max is registered");
    expression.add_function(Function::proxy("maximum", &max));
    let negate = expression
        .registry()
        .unary_operator("-u")
        .cloned()
        .expect("built-in unary - is registered");
    expression.add_unary_operator(UnaryOperator::proxy("~", &negate));
    assert_eq!(expression.eval_number(), Ok(num(7)));
}

#[test]
fn operator_registration_returns_previous() {
    let mut expression = Expression::new("1 + 1");
    let replacement = Operator::new("+", PRECEDENCE_ADDITIVE, true, |left, right| {
        let l = left.number()?.ok_or_else(|| {
            Error::Expression("left operand can't be null for operator +".to_string())
        })?;
        let r = right.number()?.ok_or_else(|| {
            Error::Expression("right operand can't be null for operator +".to_string())
        })?;
        Ok(Value::Number(l + r + num(100)))
    });
    let previous = expression.add_operator(replacement);
    assert!(previous.is_some());
    assert_eq!(expression.eval_number(), Ok(num(102)));
}

#[test]
fn first_variable_characters() {
    let mut expression = Expression::new("#a + 1");
    expression.set_first_variable_characters("#");
    expression.set_variable("#a", 5);
    assert_eq!(expression.eval_number(), Ok(num(6)));
}

#[test]
fn rpn_rendering() {
    let expression = Expression::new("if(1, 0, 5/0)");
    assert_eq!(
        expression.to_rpn().unwrap(),
        "OpenParen:( Number:1 Number:0 Number:5 Number:0 Operator:/ Function:if"
    );
    // cached and stable across calls
    assert_eq!(expression.to_rpn().unwrap(), expression.to_rpn().unwrap());
}

#[test]
fn structural_errors() {
    assert_eq!(
        Expression::new("(((1+2)").eval_number(),
        Err(Error::Expression("Mismatched parentheses".to_string()))
    );
    assert_eq!(
        Expression::new("1+2)").eval_number(),
        Err(Error::Expression("Mismatched parentheses".to_string()))
    );
    assert!(matches!(
        Expression::new(",").eval_number(),
        Err(Error::Expression(message)) if message.starts_with("Unexpected comma")
    ));
    assert_eq!(
        Expression::new("").eval_number(),
        Err(Error::Expression("Empty expression".to_string()))
    );
    assert_eq!(
        Expression::new("1 2").eval_number(),
        Err(Error::Expression("Too many numbers or variables".to_string()))
    );
    assert!(matches!(
        Expression::new("if(1, 2)").eval_number(),
        Err(Error::Expression(message)) if message.contains("expected 3 parameters, got 2")
    ));
    assert!(matches!(
        Expression::new("\"abc").eval_number(),
        Err(Error::Expression(message)) if message.starts_with("unterminated string literal")
    ));
}

#[test]
fn deeply_nested_parentheses() {
    let mut text = String::new();
    for _ in 0..200 {
        text.push('(');
    }
    text.push('1');
    for _ in 0..200 {
        text.push(')');
    }
    assert_eq!(Expression::new(&text).eval_number(), Ok(num(1)));
}

#[test]
fn adjacent_string_literals_rescan() {
    // the quote right after a completed string literal is skipped and the
    // scanner re-invokes itself, so `b` scans as a bare identifier and the
    // quote after it opens an unterminated literal
    let expression = Expression::new("if(1, \"a\"\"b\", 2)");
    assert!(matches!(
        expression.eval_string(),
        Err(Error::Expression(message)) if message.starts_with("unterminated string literal")
    ));
}
