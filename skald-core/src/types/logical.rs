use super::{Type, binary};
use crate::backend::{Backend, Code};
use crate::compiler::Compiler;
use crate::error::Result;
use crate::expression::Expression;
use crate::lexer::Token;

pub(super) fn literal(c: &mut Compiler<'_>, token: &Token) -> Result<Option<Expression>> {
    if token.is("true") || token.is("false") {
        return Ok(Some(Expression::new(
            Type::Logical,
            Code::text(c.targets(), &token.text),
        )));
    }
    if token.is("!") {
        let operand = c.scan_operand()?;
        let operand = c.coerce(operand, &Type::Logical)?;
        let code = operand.code().map(|_, v| format!("(!{v})"));
        return Ok(Some(Expression::new(Type::Logical, code)));
    }
    Ok(None)
}

pub(super) fn operation(lhs: &Expression, rhs: &Expression, op: &str) -> Option<Expression> {
    if *rhs.ty() != Type::Logical {
        return None;
    }
    let (go, js) = match op {
        "&" => ("&&", "&&"),
        "|" => ("||", "||"),
        // Exclusive or.
        "-" | "!" => ("!=", "!=="),
        "=" => ("==", "==="),
        _ => return None,
    };
    Some(binary(Type::Logical, lhs, rhs, go, js))
}

pub(super) fn cast(c: &mut Compiler<'_>, value: &Expression, target: &Type) -> Option<Expression> {
    match target {
        Type::String => {
            c.import(Backend::Go, "strconv");
            let code = value.code().map(|b, v| match b {
                Backend::Go => format!("strconv.FormatBool({v})"),
                Backend::Js => format!("String({v})"),
            });
            Some(Expression::new(Type::String, code))
        }
        _ => None,
    }
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
    fn negation_and_exclusive_or() {
        let mut compiler = both();
        let value = compiler.evaluate("!true").unwrap();
        assert_eq!(value.code().as_str(Backend::Go), "(!true)");
        let value = compiler.evaluate("true - false").unwrap();
        assert_eq!(value.code().as_str(Backend::Go), "(true != false)");
        assert_eq!(value.code().as_str(Backend::Js), "(true !== false)");
    }

    #[test]
    fn logical_to_string() {
        let mut compiler = both();
        let value = compiler.evaluate("string(false)").unwrap();
        assert_eq!(value.code().as_str(Backend::Go), "strconv.FormatBool(false)");
        assert_eq!(value.code().as_str(Backend::Js), "String(false)");
        assert!(compiler.tables().imports(Backend::Go).any(|p| p == "strconv"));
    }

    #[test]
    fn arithmetic_is_rejected() {
        let error = both().evaluate("true + false").unwrap_err();
        assert!(matches!(error.kind(), Some(ErrorKind::UnsupportedOperator { .. })));
    }
}
