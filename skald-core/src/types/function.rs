//! Function values and metatypes, the two kinds of callable values.

use super::Type;
use crate::backend::{Backend, Code};
use crate::compiler::Compiler;
use crate::error::{ErrorKind, Result};
use crate::expression::{Expression, Invocation};
use crate::lexer::Token;

/// A bare reference to a zero-parameter concept, such as `f = hello`.
pub(super) fn function_literal(c: &mut Compiler<'_>, token: &Token) -> Result<Option<Expression>> {
    if !token.is_word() || c.peek().is("(") {
        return Ok(None);
    }
    let Some((symbol, returns)) = c.function_value(&token.text)? else {
        return Ok(None);
    };
    let ty = Type::Function {
        name: symbol.clone(),
        returns: returns.map(Box::new),
    };
    Ok(Some(Expression::new(ty, Code::text(c.targets(), &symbol))))
}

pub(super) fn call_function(
    c: &mut Compiler<'_>,
    returns: Option<&Type>,
    value: &Expression,
    args: Vec<Expression>,
) -> Result<Invocation> {
    if !args.is_empty() {
        return Err(c.error(ErrorKind::ArityMismatch {
            name: value.code().as_str(Backend::Go).to_string(),
            expected: "0".to_string(),
            given: args.len(),
        }));
    }
    Ok(Invocation::new(
        value.code().map(|_, f| format!("{f}()")),
        returns.cloned(),
    ))
}

pub(super) fn zero(c: &mut Compiler<'_>, ty: &Type) -> Result<Expression> {
    let returned = match ty.subtype() {
        Some(returns) => Some((c.go_type(returns)?, returns.zero(c)?.into_code())),
        None => None,
    };
    let code = Code::render(c.targets(), |b| match (&returned, b) {
        (Some((native, value)), Backend::Go) => {
            format!("func() {native} {{ return {} }}", value.as_str(b))
        }
        (Some((_, value)), Backend::Js) => format!("() => {}", value.as_str(b)),
        (None, Backend::Go) => "func() {}".to_string(),
        (None, Backend::Js) => "() => {}".to_string(),
    });
    Ok(Expression::new(ty.clone(), code))
}

/// A type name used as a value, with its specification: `array[3].integer`.
pub(super) fn metatype_literal(c: &mut Compiler<'_>, token: &Token) -> Result<Option<Expression>> {
    if !token.is_word() {
        return Ok(None);
    }
    let Some(base) = c.lookup_type(&token.text) else {
        return Ok(None);
    };
    let ty = c.scan_type_specification(base)?;
    let code = Code::text(c.targets(), &format!("{:?}", ty.display()));
    Ok(Some(Expression::new(Type::Metatype(Box::new(ty)), code)))
}

/// Metatypes compare equal when they name the same type. The answer is
/// known while compiling.
pub(super) fn metatype_operation(
    c: &Compiler<'_>,
    lhs: &Expression,
    rhs: &Expression,
    op: &str,
) -> Option<Expression> {
    let (Type::Metatype(left), Type::Metatype(right)) = (lhs.ty(), rhs.ty()) else {
        return None;
    };
    let same = match op {
        "=" => left == right,
        "!" => left != right,
        _ => return None,
    };
    Some(Expression::new(
        Type::Logical,
        Code::text(c.targets(), if same { "true" } else { "false" }),
    ))
}

/// `integer()` builds a zero value, `integer(x)` casts `x`.
pub(super) fn call_metatype(
    c: &mut Compiler<'_>,
    inner: &Type,
    args: Vec<Expression>,
) -> Result<Invocation> {
    let mut args = args.into_iter();
    let value = match (args.next(), args.next()) {
        (None, _) => inner.zero(c)?,
        (Some(value), None) => c.cast(value, inner)?,
        (Some(_), Some(_)) => {
            return Err(c.error(ErrorKind::ArityMismatch {
                name: inner.display(),
                expected: "0 or 1".to_string(),
                given: 2 + args.count(),
            }));
        }
    };
    Ok(value.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Targets;
    use crate::compiler::CompileOptions;

    fn both() -> Compiler<'static> {
        Compiler::new(CompileOptions {
            targets: Targets::all(),
            ..CompileOptions::default()
        })
    }

    #[test]
    fn metatypes_compare_while_compiling() {
        let mut compiler = both();
        let value = compiler.evaluate("integer = integer").unwrap();
        assert_eq!(value.code().as_str(Backend::Go), "true");
        let value = compiler.evaluate("list.integer ! list.string").unwrap();
        assert_eq!(value.code().as_str(Backend::Js), "true");
    }

    #[test]
    fn metatype_calls_take_at_most_one_argument() {
        let error = both().evaluate("integer(1, 2)").unwrap_err();
        assert!(matches!(
            error.kind(),
            Some(ErrorKind::ArityMismatch { given: 2, .. })
        ));
    }

    #[test]
    fn function_zero_returns_the_result_zero() {
        let mut compiler = both();
        let ty = Type::Function {
            name: "f".to_string(),
            returns: Some(Box::new(Type::Integer)),
        };
        let value = ty.zero(&mut compiler).unwrap();
        assert_eq!(value.code().as_str(Backend::Go), "func() int { return 0 }");
        assert_eq!(value.code().as_str(Backend::Js), "() => 0");
    }
}
