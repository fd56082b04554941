//! Record types declared with `thing Name { ... }`.

use indexmap::IndexMap;

use super::Type;
use crate::backend::{Backend, Code, Helper};
use crate::compiler::Compiler;
use crate::error::{ErrorKind, Result};
use crate::expression::Expression;
use crate::lexer::Token;

/// A finished record type. Field order is declaration order.
#[derive(Debug)]
pub struct ThingDef {
    pub name: String,
    pub fields: IndexMap<String, Type>,
}

impl ThingDef {
    pub fn new(name: impl Into<String>, fields: IndexMap<String, Type>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// The Go struct declaration. JavaScript objects need none.
    pub(crate) fn declaration(&self, c: &Compiler<'_>) -> Result<Code> {
        let mut go = format!("type {} struct {{\n", self.name);
        if c.targets().enabled(Backend::Go) {
            for (field, ty) in &self.fields {
                go.push_str(&format!("\t{field} {}\n", c.go_type(ty)?));
            }
        }
        go.push_str("}\n\n");
        Ok(Code::render(c.targets(), |b| match b {
            Backend::Go => go.clone(),
            Backend::Js => String::new(),
        }))
    }

    /// Whether every field compares by value.
    pub fn comparable(&self) -> bool {
        self.fields.values().all(|ty| match ty {
            Type::Logical | Type::Integer | Type::Number | Type::Symbol | Type::String => true,
            Type::Thing(inner) => inner.comparable(),
            _ => false,
        })
    }

    /// Opening line of the constructor function.
    pub(crate) fn constructor_signature(&self, c: &Compiler<'_>) -> Code {
        Code::render(c.targets(), |b| match b {
            Backend::Go => format!("func {}() {} {{\n", constructor_name(&self.name), self.name),
            Backend::Js => format!("function {}() {{\n", constructor_name(&self.name)),
        })
    }

    /// Closing lines of the constructor: every field is a local by now.
    pub(crate) fn constructor_return(&self, c: &Compiler<'_>) -> Code {
        let pairs: Vec<String> = self
            .fields
            .keys()
            .map(|field| format!("{field}: {field}"))
            .collect();
        let pairs = pairs.join(", ");
        Code::render(c.targets(), |b| match b {
            Backend::Go => format!("\treturn {}{{{pairs}}}\n}}\n\n", self.name),
            Backend::Js => format!("\treturn {{ {pairs} }};\n}}\n\n"),
        })
    }
}

fn constructor_name(thing: &str) -> String {
    format!("new_{thing}")
}

pub(super) fn constructor_call(def: &ThingDef) -> String {
    format!("{}()", constructor_name(&def.name))
}

pub(super) fn member(
    c: &mut Compiler<'_>,
    def: &ThingDef,
    value: &Expression,
    field: &Token,
) -> Result<Expression> {
    let Some(ty) = def.fields.get(&field.text) else {
        return Err(c.error_at(
            field,
            ErrorKind::UndefinedName(format!("{}.{}", def.name, field.text)),
        ));
    };
    let code = value.code().map(|_, v| format!("{v}.{}", field.text));
    Ok(Expression::new(ty.clone(), code))
}

/// `=` and `!` compare field by field, so only things whose fields all
/// compare by value on every backend support them.
pub(super) fn operation(
    c: &mut Compiler<'_>,
    lhs: &Expression,
    rhs: &Expression,
    op: &str,
) -> Result<Option<Expression>> {
    let Type::Thing(def) = lhs.ty() else {
        return Ok(None);
    };
    if lhs.ty() != rhs.ty() || !matches!(op, "=" | "!") || !def.comparable() {
        return Ok(None);
    }
    if c.targets().enabled(Backend::Js) {
        c.require_on(Backend::Js, Helper::Same)?;
    }
    let negate = op == "!";
    let code = lhs.code().zip(rhs.code(), |b, l, r| match (b, negate) {
        (Backend::Go, false) => format!("({l} == {r})"),
        (Backend::Go, true) => format!("({l} != {r})"),
        (Backend::Js, false) => format!("skald_same({l}, {r})"),
        (Backend::Js, true) => format!("(!skald_same({l}, {r}))"),
    });
    Ok(Some(Expression::new(Type::Logical, code)))
}

/// Go structs copy on assignment; JavaScript objects need a spread.
pub(super) fn copy(value: Expression) -> Expression {
    let code = value.code().map(|b, v| match b {
        Backend::Go => v.to_string(),
        Backend::Js => format!("{{ ...{v} }}"),
    });
    Expression::new(value.ty().clone(), code)
}

#[cfg(test)]
mod tests {
    use crate::backend::{Backend, Targets};
    use crate::compiler::{CompileOptions, Output, compile_source};
    use crate::error::{ErrorKind, Result};

    fn compile(source: &str) -> Result<Output> {
        compile_source(
            "things.sk",
            source,
            &CompileOptions {
                targets: Targets::all(),
                ..CompileOptions::default()
            },
        )
    }

    #[test]
    fn scalar_things_compare_by_value() {
        let output = compile(
            "thing P {\n\tx = 1\n\tname = \"p\"\n}\na = P()\nb = P()\nprint(a = b, a ! b)\n",
        )
        .unwrap();
        let go = output.program(Backend::Go).unwrap();
        assert!(go.contains("fmt.Println((a == b), (a != b))"));
        assert!(!go.contains("skald_same"));
        let js = output.program(Backend::Js).unwrap();
        assert!(js.contains("console.log(skald_same(a, b), (!skald_same(a, b)));"));
        assert_eq!(js.matches("function skald_same").count(), 1);
    }

    #[test]
    fn nested_things_compare_when_their_fields_do() {
        let output = compile(
            "thing Inner {\n\tv = 0\n}\nthing Outer {\n\tinner = Inner()\n}\na = Outer()\nb = Outer()\nprint(a = b)\n",
        )
        .unwrap();
        assert!(output.program(Backend::Go).unwrap().contains("fmt.Println((a == b))"));
    }

    #[test]
    fn things_holding_lists_do_not_compare() {
        let error = compile(
            "thing Bag {\n\titems = list.integer()\n}\na = Bag()\nb = Bag()\nprint(a = b)\n",
        )
        .unwrap_err();
        assert!(matches!(
            error.kind(),
            Some(ErrorKind::UnsupportedOperator { operator, .. }) if operator == "="
        ));
    }

    #[test]
    fn missing_fields_are_undefined() {
        let error = compile("thing P {\n\tx = 1\n}\na = P()\nprint(a.y)\n").unwrap_err();
        assert_eq!(error.kind(), Some(&ErrorKind::UndefinedName("P.y".to_string())));
    }
}
