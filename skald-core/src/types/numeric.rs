use super::{Type, binary, compare};
use crate::backend::{Backend, Code, Helper};
use crate::compiler::Compiler;
use crate::error::{ErrorKind, Result};
use crate::expression::Expression;
use crate::lexer::{Token, TokenKind};

/// Reads `0x` hexadecimal, binary (leading `0`, only `0`/`1` digits) and
/// decimal integers.
pub(crate) fn parse_integer(text: &str) -> Option<i64> {
    if let Some(hex) = text.strip_prefix("0x") {
        return i64::from_str_radix(hex, 16).ok();
    }
    if text.len() > 1 && text.starts_with('0') && text.bytes().all(|b| b == b'0' || b == b'1') {
        return i64::from_str_radix(text, 2).ok();
    }
    if text.bytes().all(|b| b.is_ascii_digit()) {
        text.parse().ok()
    } else {
        None
    }
}

pub(super) fn integer_literal(c: &mut Compiler<'_>, token: &Token) -> Result<Option<Expression>> {
    if token.kind != TokenKind::Number || token.text.contains('.') {
        return Ok(None);
    }
    let Some(value) = parse_integer(&token.text) else {
        return Err(c.error_at(
            token,
            ErrorKind::Semantic(format!("integer literal {} is out of range", token.text)),
        ));
    };
    let code = Code::text(c.targets(), &value.to_string());
    Ok(Some(Expression::integer(value, code)))
}

pub(super) fn number_literal(c: &mut Compiler<'_>, token: &Token) -> Result<Option<Expression>> {
    if token.kind != TokenKind::Number || !token.text.contains('.') {
        return Ok(None);
    }
    if token.text.parse::<f64>().is_err() {
        return Err(c.error_at(
            token,
            ErrorKind::Semantic(format!("{} is not a valid number", token.text)),
        ));
    }
    Ok(Some(Expression::new(
        Type::Number,
        Code::text(c.targets(), &token.text),
    )))
}

/// Integer arithmetic as the generated helpers perform it, so constant
/// folding agrees with run time.
fn fold(op: &str, a: i64, b: i64) -> Option<i64> {
    Some(match op {
        "+" => a.wrapping_add(b),
        "-" => a.wrapping_sub(b),
        "*" => a.wrapping_mul(b),
        "/" if b == 0 => i64::from(a == 0),
        "/" => a.wrapping_div(b),
        "%" if b == 0 => 0,
        "%" => a.wrapping_rem(b),
        "^" if b < 0 => 0,
        "^" => a.wrapping_pow(u32::try_from(b).ok()?),
        _ => return None,
    })
}

fn helper_call(
    c: &mut Compiler<'_>,
    helper: Helper,
    lhs: &Expression,
    rhs: &Expression,
) -> Result<Expression> {
    c.require(helper)?;
    let name = helper.name();
    let code = lhs.code().zip(rhs.code(), |_, l, r| format!("{name}({l}, {r})"));
    Ok(Expression::new(Type::Integer, code))
}

pub(super) fn integer_operation(
    c: &mut Compiler<'_>,
    lhs: &Expression,
    rhs: &Expression,
    op: &str,
) -> Result<Option<Expression>> {
    if *rhs.ty() != Type::Integer {
        return Ok(None);
    }
    let expression = match op {
        "+" | "-" | "*" => binary(Type::Integer, lhs, rhs, op, op),
        "/" => helper_call(c, Helper::Div, lhs, rhs)?,
        "%" => helper_call(c, Helper::Mod, lhs, rhs)?,
        "^" => helper_call(c, Helper::Pow, lhs, rhs)?,
        _ => return Ok(compare(lhs, rhs, op)),
    };
    let folded = match (lhs.constant(), rhs.constant()) {
        (Some(a), Some(b)) => fold(op, a, b),
        _ => None,
    };
    Ok(Some(expression.with_constant(folded)))
}

pub(super) fn number_operation(
    c: &mut Compiler<'_>,
    lhs: &Expression,
    rhs: &Expression,
    op: &str,
) -> Result<Option<Expression>> {
    if *rhs.ty() != Type::Number {
        return Ok(None);
    }
    Ok(match op {
        "+" | "-" | "*" | "/" => Some(binary(Type::Number, lhs, rhs, op, op)),
        "%" | "^" => {
            c.import(Backend::Go, "math");
            let code = lhs.code().zip(rhs.code(), |b, l, r| match (b, op) {
                (Backend::Go, "%") => format!("math.Mod({l}, {r})"),
                (Backend::Go, _) => format!("math.Pow({l}, {r})"),
                (Backend::Js, "%") => format!("({l} % {r})"),
                (Backend::Js, _) => format!("Math.pow({l}, {r})"),
            });
            Some(Expression::new(Type::Number, code))
        }
        _ => compare(lhs, rhs, op),
    })
}

pub(super) fn negate(value: &Expression) -> Expression {
    let code = value.code().map(|_, v| format!("(-{v})"));
    Expression::new(value.ty().clone(), code)
        .with_constant(value.constant().map(i64::wrapping_neg))
}

pub(super) fn integer_cast(
    c: &mut Compiler<'_>,
    value: &Expression,
    target: &Type,
) -> Option<Expression> {
    let code = match target {
        Type::Logical => value
            .code()
            .map(|b, v| format!("({v} {} 0)", b.pick("!=", "!=="))),
        Type::Number => value.code().map(|b, v| match b {
            Backend::Go => format!("float64({v})"),
            Backend::Js => v.to_string(),
        }),
        Type::Symbol => value.code().map(|b, v| match b {
            Backend::Go => format!("rune({v})"),
            Backend::Js => format!("String.fromCodePoint({v})"),
        }),
        Type::String => {
            c.import(Backend::Go, "strconv");
            value.code().map(|b, v| match b {
                Backend::Go => format!("strconv.Itoa({v})"),
                Backend::Js => format!("String({v})"),
            })
        }
        _ => return None,
    };
    Some(Expression::new(target.clone(), code))
}

pub(super) fn number_cast(
    c: &mut Compiler<'_>,
    value: &Expression,
    target: &Type,
) -> Option<Expression> {
    let code = match target {
        Type::Integer => value.code().map(|b, v| match b {
            Backend::Go => format!("int({v})"),
            Backend::Js => format!("Math.trunc({v})"),
        }),
        Type::String => {
            c.import(Backend::Go, "strconv");
            value.code().map(|b, v| match b {
                Backend::Go => format!("strconv.FormatFloat({v}, 'g', -1, 64)"),
                Backend::Js => format!("String({v})"),
            })
        }
        _ => return None,
    };
    Some(Expression::new(target.clone(), code))
}
