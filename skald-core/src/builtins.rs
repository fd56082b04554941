//! Built-in functions visible at the language level.
//!
//! Builtins are not concepts: each one is lowered directly to target
//! code by [`Compiler::invoke_builtin`], and none of them can be
//! referenced as a function value.

use crate::backend::{Backend, Code, Helper};
use crate::compiler::Compiler;
use crate::error::{ErrorKind, Result};
use crate::expression::{Expression, Invocation};
use crate::lexer::Token;
use crate::types::Type;

/// Kind of builtin, used to decide how to lower a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    /// Writes its arguments followed by a newline.
    Print,
    /// Writes its arguments without a newline.
    Out,
    /// Reads standard input up to a delimiter symbol.
    In,
    /// The element type of a collection, as a metatype.
    Subtype,
    /// The number of elements of a collection.
    Len,
}

/// Metadata about a single builtin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinDescriptor {
    pub name: &'static str,
    pub kind: BuiltinKind,
    /// Fewest and most arguments accepted. `None` for no upper bound.
    pub arity: (usize, Option<usize>),
}

impl BuiltinDescriptor {
    fn accepts(&self, given: usize) -> bool {
        let (min, max) = self.arity;
        given >= min && max.is_none_or(|max| given <= max)
    }

    fn expected(&self) -> String {
        match self.arity {
            (min, Some(max)) if min == max => min.to_string(),
            (min, Some(max)) => format!("{min} to {max}"),
            (min, None) => format!("at least {min}"),
        }
    }
}

pub const BUILTINS: &[BuiltinDescriptor] = &[
    BuiltinDescriptor {
        name: "print",
        kind: BuiltinKind::Print,
        arity: (0, None),
    },
    BuiltinDescriptor {
        name: "out",
        kind: BuiltinKind::Out,
        arity: (1, None),
    },
    BuiltinDescriptor {
        name: "in",
        kind: BuiltinKind::In,
        arity: (0, Some(1)),
    },
    BuiltinDescriptor {
        name: "subtype",
        kind: BuiltinKind::Subtype,
        arity: (1, Some(1)),
    },
    BuiltinDescriptor {
        name: "len",
        kind: BuiltinKind::Len,
        arity: (1, Some(1)),
    },
];

/// Look up a builtin by name. The table is small enough for a linear
/// search.
pub fn find_builtin(name: &str) -> Option<&'static BuiltinDescriptor> {
    BUILTINS.iter().find(|builtin| builtin.name == name)
}

impl Compiler<'_> {
    /// `builtin(args)`. The `(` has not been consumed yet.
    pub(crate) fn invoke_builtin(
        &mut self,
        builtin: &BuiltinDescriptor,
        at: &Token,
    ) -> Result<Invocation> {
        self.expect("(")?;
        let args = self.scan_call_arguments()?;
        if !builtin.accepts(args.len()) {
            return Err(self.error_at(
                at,
                ErrorKind::ArityMismatch {
                    name: builtin.name.to_string(),
                    expected: builtin.expected(),
                    given: args.len(),
                },
            ));
        }
        let mut args = args.into_iter();
        match (builtin.kind, args.next()) {
            (BuiltinKind::Print | BuiltinKind::Out, first) => {
                self.write_values(builtin.kind, first.into_iter().chain(args).collect())
            }
            (BuiltinKind::In, delimiter) => self.read_input(delimiter),
            (BuiltinKind::Subtype, Some(value)) => self.subtype_of(&value),
            (BuiltinKind::Len, Some(value)) => self.length_of(at, &value),
            (BuiltinKind::Subtype | BuiltinKind::Len, None) => Err(self.error_at(
                at,
                ErrorKind::ArityMismatch {
                    name: builtin.name.to_string(),
                    expected: builtin.expected(),
                    given: 0,
                },
            )),
        }
    }

    fn write_values(&mut self, kind: BuiltinKind, args: Vec<Expression>) -> Result<Invocation> {
        let mut printable = Vec::with_capacity(args.len());
        for value in args {
            if matches!(value.ty(), Type::Sequencer { .. }) {
                return Err(self.error(ErrorKind::Semantic(
                    "a sequencer cannot be printed".to_string(),
                )));
            }
            // Runes would print as numbers in Go.
            let code = match value.ty() {
                Type::Symbol => value.code().map(|b, v| match b {
                    Backend::Go => format!("string({v})"),
                    Backend::Js => v.to_string(),
                }),
                _ => value.into_code(),
            };
            printable.push(code);
        }
        self.import(Backend::Go, "fmt");
        let list = Code::join(self.targets(), &printable, ", ");
        let code = list.map(|b, list| match (b, kind) {
            (Backend::Go, BuiltinKind::Print) => format!("fmt.Println({list})"),
            (Backend::Go, _) => format!("fmt.Print({list})"),
            (Backend::Js, BuiltinKind::Print) => format!("console.log({list})"),
            (Backend::Js, _) => format!("process.stdout.write([{list}].join(\" \"))"),
        });
        Ok(Invocation::new(code, None))
    }

    fn read_input(&mut self, delimiter: Option<Expression>) -> Result<Invocation> {
        let delimiter = match delimiter {
            Some(value) => self.coerce(value, &Type::Symbol)?.into_code(),
            None => Code::text(self.targets(), "'\\n'"),
        };
        self.require(Helper::ReadUntil)?;
        let name = Helper::ReadUntil.name();
        Ok(Invocation::new(
            delimiter.map(|_, d| format!("{name}({d})")),
            Some(Type::String),
        ))
    }

    /// Non-collections have the `undefined` subtype.
    fn subtype_of(&mut self, value: &Expression) -> Result<Invocation> {
        let element = value.ty().subtype().cloned().unwrap_or(Type::Undefined);
        let code = Code::text(self.targets(), &format!("{:?}", element.display()));
        Ok(Invocation::new(code, Some(Type::Metatype(Box::new(element)))))
    }

    fn length_of(&mut self, at: &Token, value: &Expression) -> Result<Invocation> {
        let ty = value.ty().clone();
        let Some(collection) = ty.as_collection() else {
            return Err(self.error_at(
                at,
                ErrorKind::Semantic(format!("{} has no length", ty.display())),
            ));
        };
        Ok(collection.length(self, value).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Targets;
    use crate::compiler::{CompileOptions, compile_source};

    fn go(source: &str) -> String {
        compile_source("builtins.sk", source, &CompileOptions::default())
            .unwrap_or_else(|e| panic!("compile failed: {e}"))
            .program(Backend::Go)
            .unwrap()
            .to_string()
    }

    #[test]
    fn finds_builtins_by_name() {
        assert_eq!(find_builtin("print").map(|b| b.kind), Some(BuiltinKind::Print));
        assert!(find_builtin("printf").is_none());
    }

    #[test]
    fn print_converts_symbols_for_go() {
        let program = go("print('a', 1)\n");
        assert!(program.contains("fmt.Println(string('a'), 1)"));
        assert!(program.contains("import \"fmt\""));
    }

    #[test]
    fn out_omits_the_newline() {
        let program = go("out(\"a\")\n");
        assert!(program.contains("fmt.Print(\"a\")"));
    }

    #[test]
    fn input_reads_up_to_a_delimiter() {
        let program = go("line = in()\nword = in(' ')\n");
        assert!(program.contains("var line = skald_in('\\n')"));
        assert!(program.contains("var word = skald_in(' ')"));
        assert!(program.contains("import \"bufio\""));
        assert_eq!(program.matches("func skald_in").count(), 1);
    }

    #[test]
    fn input_is_not_available_in_javascript() {
        let error = compile_source(
            "builtins.sk",
            "line = in()\n",
            &CompileOptions {
                targets: Targets::only(Backend::Js),
                ..CompileOptions::default()
            },
        )
        .unwrap_err();
        assert!(matches!(
            error.kind(),
            Some(ErrorKind::Unsupported { backend: "js", .. })
        ));
    }

    #[test]
    fn length_of_a_literal_is_known() {
        let mut compiler = Compiler::new(CompileOptions::default());
        let value = compiler.evaluate("len([1, 2, 3])").unwrap();
        assert_eq!(value.constant(), Some(3));
        let value = compiler.evaluate("len(\"héllo\")").unwrap();
        assert_eq!(value.code().as_str(Backend::Go), "len([]rune(\"héllo\"))");
    }

    #[test]
    fn subtype_yields_a_metatype() {
        let mut compiler = Compiler::new(CompileOptions::default());
        let value = compiler.evaluate("subtype([1.5, 2.5])").unwrap();
        assert_eq!(*value.ty(), Type::Metatype(Box::new(Type::Number)));
        let value = compiler.evaluate("subtype(7)").unwrap();
        assert_eq!(*value.ty(), Type::Metatype(Box::new(Type::Undefined)));
    }

    #[test]
    fn arity_is_checked() {
        let error = compile_source("builtins.sk", "x = len()\n", &CompileOptions::default())
            .unwrap_err();
        assert!(matches!(error.kind(), Some(ErrorKind::ArityMismatch { .. })));
    }
}
