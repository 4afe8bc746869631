//! Infix to Reverse Polish notation conversion, and validation of the
//! resulting sequence.
//!
//! [`to_rpn`] is Dijkstra's shunting-yard algorithm over the lazy token
//! stream, with two extras the evaluator relies on: implicit multiplication
//! (`2(3+4)` reads as `2*(3+4)`) and an OpenParen marker emitted into the
//! output queue at the start of every function argument list so variadic
//! argument counts can be recovered on a stack. [`validate`] walks the RPN
//! sequence once, checking operator and function arities before anything is
//! evaluated.

use crate::registry::Registry;
use crate::tokenizer::{Token, TokenKind, Tokenizer};
use crate::Error;

/// Precedence of a token sitting on the operator stack, read from the map
/// matching its kind.
fn stack_precedence(token: &Token, registry: &Registry) -> Result<u32, Error> {
    match token.kind {
        TokenKind::Operator => registry
            .operator(&token.surface)
            .map(|o| o.precedence())
            .ok_or_else(|| Error::Expression(format!("Unknown operator '{}'", token))),
        TokenKind::UnaryOperator => registry
            .unary_operator(&token.surface)
            .map(|o| o.precedence())
            .ok_or_else(|| Error::Expression(format!("Unknown unary operator '{}'", token))),
        _ => Err(Error::Expression(format!(
            "Unexpected token '{}' on the operator stack",
            token
        ))),
    }
}

/// Pops stacked operators that bind at least as tightly as the incoming one
/// into the output queue.
fn shunt_operators(
    output: &mut Vec<Token>,
    stack: &mut Vec<Token>,
    precedence: u32,
    left_associative: bool,
    registry: &Registry,
) -> Result<(), Error> {
    while let Some(top) = stack.last() {
        if !matches!(top.kind, TokenKind::Operator | TokenKind::UnaryOperator) {
            break;
        }
        let top_precedence = stack_precedence(top, registry)?;
        if (left_associative && precedence <= top_precedence) || precedence < top_precedence {
            if let Some(popped) = stack.pop() {
                output.push(popped);
            }
        } else {
            break;
        }
    }
    Ok(())
}

/// Converts the token stream to a Reverse Polish notation sequence.
pub fn to_rpn(tokens: Tokenizer<'_>, registry: &Registry) -> Result<Vec<Token>, Error> {
    let mut output: Vec<Token> = Vec::new();
    let mut stack: Vec<Token> = Vec::new();
    let mut last_function: Option<Token> = None;
    let mut previous: Option<Token> = None;

    for token in tokens {
        let token = token?;
        let previous_kind = previous.as_ref().map(|t| t.kind);
        match token.kind {
            TokenKind::Number | TokenKind::String | TokenKind::Variable => {
                output.push(token.clone());
            }
            TokenKind::Function => {
                stack.push(token.clone());
                last_function = Some(token.clone());
            }
            TokenKind::Comma => {
                if let Some(prev) = &previous {
                    if prev.kind == TokenKind::Operator {
                        return Err(Error::Expression(format!(
                            "Missing parameter(s) for operator {} at character position {}",
                            prev, prev.end
                        )));
                    }
                }
                while stack.last().map_or(false, |t| t.kind != TokenKind::OpenParen) {
                    if let Some(popped) = stack.pop() {
                        output.push(popped);
                    }
                }
                if stack.is_empty() {
                    return Err(match &last_function {
                        None => Error::Expression(format!(
                            "Unexpected comma at character position {}",
                            token.end
                        )),
                        Some(function) => Error::Expression(format!(
                            "Parse error for function '{}' at character position {}",
                            function, token.end
                        )),
                    });
                }
            }
            TokenKind::Operator => {
                if matches!(
                    previous_kind,
                    Some(TokenKind::Comma) | Some(TokenKind::OpenParen)
                ) {
                    return Err(Error::Expression(format!(
                        "Missing parameter(s) for operator {} at character position {}",
                        token, token.end
                    )));
                }
                let operator = registry.operator(&token.surface).ok_or_else(|| {
                    Error::Expression(format!(
                        "Unknown operator '{}' at position {}",
                        token,
                        token.end + 1
                    ))
                })?;
                let (precedence, left_associative) =
                    (operator.precedence(), operator.is_left_associative());
                shunt_operators(&mut output, &mut stack, precedence, left_associative, registry)?;
                stack.push(token.clone());
            }
            TokenKind::UnaryOperator => {
                if !matches!(
                    previous_kind,
                    None | Some(TokenKind::Operator)
                        | Some(TokenKind::Comma)
                        | Some(TokenKind::OpenParen)
                ) {
                    return Err(Error::Expression(format!(
                        "Invalid position for unary operator {} at character position {}",
                        token, token.end
                    )));
                }
                let operator = registry.unary_operator(&token.surface).ok_or_else(|| {
                    let symbol = token.surface.strip_suffix('u').unwrap_or(&token.surface);
                    Error::Expression(format!(
                        "Unknown unary operator '{}' at position {}",
                        symbol,
                        token.end + 1
                    ))
                })?;
                let precedence = operator.precedence();
                shunt_operators(&mut output, &mut stack, precedence, true, registry)?;
                stack.push(token.clone());
            }
            TokenKind::OpenParen => {
                match previous_kind {
                    // implicit multiplication, e.g. 2(3+4) or (a+b)(a-b)
                    Some(TokenKind::Number)
                    | Some(TokenKind::CloseParen)
                    | Some(TokenKind::Variable) => {
                        stack.push(Token::synthetic(TokenKind::Operator, "*"));
                    }
                    // a `(` after a function starts an argument list; the
                    // marker goes to the output queue for the evaluator
                    Some(TokenKind::Function) => output.push(token.clone()),
                    _ => {}
                }
                stack.push(token.clone());
            }
            TokenKind::CloseParen => {
                if let Some(prev) = &previous {
                    if prev.kind == TokenKind::Operator {
                        return Err(Error::Expression(format!(
                            "Missing parameter(s) for operator {} at character position {}",
                            prev, prev.end
                        )));
                    }
                }
                let mut found = false;
                while let Some(top) = stack.pop() {
                    if top.kind == TokenKind::OpenParen {
                        found = true;
                        break;
                    }
                    output.push(top);
                }
                if !found {
                    return Err(Error::Expression("Mismatched parentheses".to_string()));
                }
                if stack.last().map_or(false, |t| t.kind == TokenKind::Function) {
                    if let Some(function) = stack.pop() {
                        output.push(function);
                    }
                }
            }
        }
        previous = Some(token);
    }

    while let Some(token) = stack.pop() {
        if matches!(token.kind, TokenKind::OpenParen | TokenKind::CloseParen) {
            return Err(Error::Expression("Mismatched parentheses".to_string()));
        }
        output.push(token);
    }
    Ok(output)
}

/// Checks that the RPN sequence has enough operands for every operator and
/// function and leaves exactly one result.
pub fn validate(rpn: &[Token], registry: &Registry) -> Result<(), Error> {
    // one pending-operand count per open function argument list
    let mut counts: Vec<i32> = vec![0];
    for token in rpn {
        match token.kind {
            TokenKind::UnaryOperator => {
                if counts.last().map_or(true, |count| *count < 1) {
                    return Err(Error::Expression(format!(
                        "Missing parameter(s) for unary operator {}",
                        token
                    )));
                }
            }
            TokenKind::Operator => {
                match counts.last_mut() {
                    Some(count) if *count >= 2 => *count -= 1,
                    _ => {
                        return Err(Error::Expression(format!(
                            "Missing parameter(s) for operator {}",
                            token
                        )));
                    }
                }
            }
            TokenKind::Function => {
                let function = registry.function(&token.surface).ok_or_else(|| {
                    Error::Expression(format!(
                        "Unknown function '{}' at position {}",
                        token,
                        token.end + 1
                    ))
                })?;
                let provided = match counts.pop() {
                    Some(count) => count,
                    None => 0,
                };
                if !function.is_variadic() && provided != function.arity() {
                    return Err(Error::Expression(format!(
                        "Function {} expected {} parameters, got {}",
                        token,
                        function.arity(),
                        provided
                    )));
                }
                match counts.last_mut() {
                    Some(count) => *count += 1,
                    None => {
                        return Err(Error::Expression(
                            "Too many function calls, maximum scope exceeded".to_string(),
                        ));
                    }
                }
            }
            TokenKind::OpenParen => counts.push(0),
            _ => match counts.last_mut() {
                Some(count) => *count += 1,
                None => {
                    return Err(Error::Expression(
                        "Unbalanced function argument lists".to_string(),
                    ));
                }
            },
        }
    }
    if counts.len() > 1 {
        return Err(Error::Expression(
            "Too many unhandled function parameter lists".to_string(),
        ));
    }
    match counts.last() {
        Some(count) if *count > 1 => {
            Err(Error::Expression("Too many numbers or variables".to_string()))
        }
        Some(count) if *count < 1 => Err(Error::Expression("Empty expression".to_string())),
        Some(_) => Ok(()),
        None => Err(Error::Expression("Empty expression".to_string())),
    }
}
