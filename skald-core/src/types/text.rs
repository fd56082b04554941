use super::{Type, binary, compare};
use crate::backend::{Backend, Code, Helper};
use crate::compiler::Compiler;
use crate::error::Result;
use crate::expression::Expression;
use crate::lexer::{Token, TokenKind};

pub(super) fn symbol_literal(c: &mut Compiler<'_>, token: &Token) -> Result<Option<Expression>> {
    if token.kind != TokenKind::Symbol {
        return Ok(None);
    }
    Ok(Some(Expression::new(
        Type::Symbol,
        Code::text(c.targets(), &token.text),
    )))
}

pub(super) fn string_literal(c: &mut Compiler<'_>, token: &Token) -> Result<Option<Expression>> {
    if token.kind != TokenKind::Text {
        return Ok(None);
    }
    Ok(Some(Expression::new(
        Type::String,
        Code::text(c.targets(), &token.text),
    )))
}

pub(super) fn symbol_operation(lhs: &Expression, rhs: &Expression, op: &str) -> Option<Expression> {
    if *rhs.ty() != Type::Symbol {
        return None;
    }
    compare(lhs, rhs, op)
}

pub(super) fn string_operation(lhs: &Expression, rhs: &Expression, op: &str) -> Option<Expression> {
    if *rhs.ty() != Type::String {
        return None;
    }
    match op {
        "+" => Some(binary(Type::String, lhs, rhs, "+", "+")),
        _ => compare(lhs, rhs, op),
    }
}

pub(super) fn symbol_cast(value: &Expression, target: &Type) -> Option<Expression> {
    let code = match target {
        Type::String => value.code().map(|b, v| match b {
            Backend::Go => format!("string({v})"),
            Backend::Js => v.to_string(),
        }),
        Type::Integer => value.code().map(|b, v| match b {
            Backend::Go => format!("int({v})"),
            Backend::Js => format!("{v}.codePointAt(0)"),
        }),
        _ => return None,
    };
    Some(Expression::new(target.clone(), code))
}

pub(super) fn string_cast(
    c: &mut Compiler<'_>,
    value: &Expression,
    target: &Type,
) -> Result<Option<Expression>> {
    let helper = match target {
        Type::Integer => Helper::Atoi,
        Type::Number => Helper::Atof,
        _ => return Ok(None),
    };
    c.require(helper)?;
    let code = value.code().map(|_, v| format!("{}({v})", helper.name()));
    Ok(Some(Expression::new(target.clone(), code)))
}

/// `s[i]`, wrapping `i` around the length in symbols.
pub(super) fn index(
    c: &mut Compiler<'_>,
    this: &Expression,
    index: &Expression,
) -> Result<Expression> {
    c.require(Helper::StringAt)?;
    let code = this
        .code()
        .zip(index.code(), |_, s, i| format!("skald_string_at({s}, {i})"));
    Ok(Expression::new(Type::Symbol, code))
}

pub(super) fn length(this: &Expression) -> Expression {
    let code = this.code().map(|b, s| match b {
        Backend::Go => format!("len([]rune({s}))"),
        Backend::Js => format!("[...{s}].length"),
    });
    Expression::new(Type::Integer, code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Targets;
    use crate::compiler::CompileOptions;
    use crate::error::ErrorKind;

    fn both() -> Compiler<'static> {
        Compiler::new(CompileOptions {
            targets: Targets::all(),
            ..CompileOptions::default()
        })
    }

    #[test]
    fn strings_concatenate_and_compare() {
        let mut compiler = both();
        let value = compiler.evaluate("\"a\" + \"b\"").unwrap();
        assert_eq!(*value.ty(), Type::String);
        assert_eq!(value.code().as_str(Backend::Js), "(\"a\" + \"b\")");
        let value = compiler.evaluate("'a' < 'b'").unwrap();
        assert_eq!(*value.ty(), Type::Logical);
        let error = compiler.evaluate("\"a\" * \"b\"").unwrap_err();
        assert!(matches!(error.kind(), Some(ErrorKind::UnsupportedOperator { .. })));
    }

    #[test]
    fn symbols_cast_per_backend() {
        let mut compiler = both();
        let value = compiler.evaluate("string('x')").unwrap();
        assert_eq!(value.code().as_str(Backend::Go), "string('x')");
        assert_eq!(value.code().as_str(Backend::Js), "'x'");
        let value = compiler.evaluate("integer('x')").unwrap();
        assert_eq!(value.code().as_str(Backend::Js), "'x'.codePointAt(0)");
    }

    #[test]
    fn strings_parse_through_helpers() {
        let mut compiler = both();
        let value = compiler.evaluate("integer(\"42\")").unwrap();
        assert_eq!(*value.ty(), Type::Integer);
        assert_eq!(value.code().as_str(Backend::Go), "skald_atoi(\"42\")");
        let value = compiler.evaluate("number(\"2.5\")").unwrap();
        assert_eq!(value.code().as_str(Backend::Js), "skald_atof(\"2.5\")");
    }
}
