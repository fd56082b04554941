//! Sequences, arrays, lists and the sequencer marker.
//!
//! Indices wrap around the collection length. Reading from an empty
//! collection yields the element's zero value and writing to one does
//! nothing, so indexing never goes out of bounds.

use super::{SYMBOL, Type, text};
use crate::backend::{Backend, Code, Helper};
use crate::compiler::Compiler;
use crate::error::{ErrorKind, Result};
use crate::expression::Expression;
use crate::lexer::Token;

/// The collection view of a [`Type`].
#[derive(Debug, Clone, Copy)]
pub enum Collection<'t> {
    String,
    Sequence {
        size: Option<usize>,
        subtype: Option<&'t Type>,
    },
    Array {
        size: Option<usize>,
        subtype: Option<&'t Type>,
    },
    List {
        subtype: Option<&'t Type>,
        presize: Option<&'t Code>,
    },
}

impl<'t> Collection<'t> {
    fn kind(self) -> &'static str {
        match self {
            Collection::String => "string",
            Collection::Sequence { .. } => "sequence",
            Collection::Array { .. } => "array",
            Collection::List { .. } => "list",
        }
    }

    pub fn subtype(self) -> Option<&'t Type> {
        match self {
            Collection::String => Some(&SYMBOL),
            Collection::Sequence { subtype, .. }
            | Collection::Array { subtype, .. }
            | Collection::List { subtype, .. } => subtype,
        }
    }

    fn element(self, c: &Compiler<'_>) -> Result<&'t Type> {
        self.subtype().ok_or_else(|| {
            c.error(ErrorKind::Semantic(format!(
                "the element type of this {} is unknown",
                self.kind()
            )))
        })
    }

    fn known_size(self) -> Option<usize> {
        match self {
            Collection::Sequence { size, .. } | Collection::Array { size, .. } => size,
            _ => None,
        }
    }

    /// Lists and variadic sequences have no size known at compile time
    /// and may hold nothing at run time.
    fn may_be_empty(self) -> bool {
        matches!(
            self,
            Collection::List { .. } | Collection::Sequence { size: None, .. }
        )
    }

    /// `this[index]`
    pub(crate) fn index(
        self,
        c: &mut Compiler<'_>,
        this: &Expression,
        indices: Vec<Expression>,
    ) -> Result<Expression> {
        let index = single_index(c, self.kind(), indices)?;
        if let Collection::String = self {
            return text::index(c, this, &index);
        }
        let element = self.element(c)?.clone();
        if self.may_be_empty() {
            let zero = element.zero(c)?;
            c.require(Helper::At)?;
            let args = this.code().zip(index.code(), |_, a, i| format!("{a}, {i}"));
            let code = args.zip(zero.code(), |_, a, z| format!("skald_at({a}, {z})"));
            return Ok(Expression::new(element, code));
        }
        let position = self.position(c, this, &index)?;
        let code = this.code().zip(&position, |_, a, i| format!("{a}[{i}]"));
        Ok(Expression::new(element, code))
    }

    /// The wrapped position of `index`, folded when both the index and
    /// the size are known.
    fn position(self, c: &mut Compiler<'_>, this: &Expression, index: &Expression) -> Result<Code> {
        let size = self.known_size();
        if size == Some(0) {
            return Err(c.error(ErrorKind::Semantic(format!(
                "cannot index an empty {}",
                self.kind()
            ))));
        }
        if let (Some(i), Some(n)) = (index.constant(), size) {
            let wrapped = i.rem_euclid(n as i64);
            return Ok(Code::text(c.targets(), &wrapped.to_string()));
        }
        c.require(Helper::Wrap)?;
        let length = match size {
            Some(n) => Code::text(c.targets(), &n.to_string()),
            None => length_code(this),
        };
        Ok(index
            .code()
            .zip(&length, |_, i, n| format!("skald_wrap({i}, {n})")))
    }

    /// `this[index] = value`, or `this[+] = value` to append to a list.
    pub(crate) fn modify(
        self,
        c: &mut Compiler<'_>,
        this: &Expression,
        indices: Vec<Expression>,
        value: Expression,
    ) -> Result<()> {
        match self {
            Collection::String => Err(c.error(ErrorKind::Semantic(
                "strings are immutable".to_string(),
            ))),
            Collection::Sequence { .. } => Err(c.error(ErrorKind::Semantic(
                "sequences cannot be modified".to_string(),
            ))),
            Collection::List { .. }
                if matches!(indices.as_slice(), [marker] if matches!(marker.ty(), Type::Sequencer { .. })) =>
            {
                if !matches!(indices[0].ty(), Type::Sequencer { plus: true }) {
                    return Err(c.error(ErrorKind::Semantic(
                        "lists only grow with [+]".to_string(),
                    )));
                }
                let value = c.coerce(value, self.element(c)?)?;
                let code = this.code().zip(value.code(), |b, l, v| match b {
                    Backend::Go => format!("{l} = append({l}, {v})"),
                    Backend::Js => format!("{l}.push({v})"),
                });
                c.emit_statement(&code);
                Ok(())
            }
            Collection::Array { .. } | Collection::List { .. } => {
                let index = single_index(c, self.kind(), indices)?;
                let value = c.coerce(value, self.element(c)?)?;
                let position = self.position(c, this, &index)?;
                let target = this.code().zip(&position, |_, a, i| format!("{a}[{i}]"));
                let code = target.zip(value.code(), |_, t, v| format!("{t} = {v}"));
                if !self.may_be_empty() {
                    c.emit_statement(&code);
                    return Ok(());
                }
                let length = length_code(this);
                let guarded = length.zip(&code, |b, n, set| match b {
                    Backend::Go => format!("if {n} > 0 {{ {set} }}"),
                    Backend::Js => format!("if ({n} > 0) {{ {set}; }}"),
                });
                c.emit_line(&guarded);
                Ok(())
            }
        }
    }

    /// Resolve the bracketed arguments of a type specification such as
    /// `array[3]` or `list[n]`.
    pub(crate) fn specify(self, c: &mut Compiler<'_>, args: &[Expression]) -> Result<Type> {
        let subtype = self.subtype().cloned().map(Box::new);
        match (self, args) {
            (Collection::String, []) => Ok(Type::String),
            (Collection::Sequence { .. }, []) => Ok(Type::Sequence {
                size: None,
                subtype,
            }),
            (Collection::Array { .. }, []) => Ok(Type::Array {
                size: None,
                subtype,
            }),
            (Collection::Array { .. }, [size]) => {
                let size = size
                    .constant()
                    .filter(|_| *size.ty() == Type::Integer)
                    .and_then(|n| usize::try_from(n).ok())
                    .ok_or_else(|| {
                        c.error(ErrorKind::Semantic(
                            "array takes one constant, non-negative integer size".to_string(),
                        ))
                    })?;
                Ok(Type::Array {
                    size: Some(size),
                    subtype,
                })
            }
            (Collection::List { presize, .. }, []) => Ok(Type::List {
                subtype,
                presize: presize.cloned().map(Box::new),
            }),
            (Collection::List { .. }, [size]) if *size.ty() == Type::Integer => Ok(Type::List {
                subtype,
                presize: Some(Box::new(size.code().clone())),
            }),
            _ => Err(c.error(ErrorKind::Semantic(format!(
                "{} does not take these arguments",
                self.kind()
            )))),
        }
    }

    /// The same collection holding `subtype` elements.
    pub(crate) fn with_subtype(self, c: &Compiler<'_>, subtype: Type) -> Result<Type> {
        let subtype = Some(Box::new(subtype));
        Ok(match self {
            Collection::String => {
                return Err(c.error(ErrorKind::Semantic(
                    "string always holds symbols".to_string(),
                )));
            }
            Collection::Sequence { size, .. } => Type::Sequence { size, subtype },
            Collection::Array { size, .. } => Type::Array { size, subtype },
            Collection::List { presize, .. } => Type::List {
                subtype,
                presize: presize.cloned().map(Box::new),
            },
        })
    }

    pub(crate) fn length(self, c: &Compiler<'_>, this: &Expression) -> Expression {
        match (self, self.known_size()) {
            (Collection::String, _) => text::length(this),
            (_, Some(n)) => Expression::integer(n as i64, Code::text(c.targets(), &n.to_string())),
            _ => Expression::new(Type::Integer, length_code(this)),
        }
    }
}

fn length_code(this: &Expression) -> Code {
    this.code().map(|b, v| match b {
        Backend::Go => format!("len({v})"),
        Backend::Js => format!("{v}.length"),
    })
}

fn single_index(c: &Compiler<'_>, kind: &str, indices: Vec<Expression>) -> Result<Expression> {
    let mut indices = indices.into_iter();
    match (indices.next(), indices.next()) {
        (Some(index), None) if *index.ty() == Type::Integer => Ok(index),
        (Some(index), None) => Err(c.error(ErrorKind::TypeMismatch {
            expected: "integer".to_string(),
            found: index.ty().display(),
        })),
        _ => Err(c.error(ErrorKind::Semantic(format!(
            "{kind} takes exactly one integer index"
        )))),
    }
}

pub(super) fn sequence_literal(c: &mut Compiler<'_>, token: &Token) -> Result<Option<Expression>> {
    if !token.is("[") {
        return Ok(None);
    }
    if c.peek().is("]") {
        return Err(c.error_at(
            token,
            ErrorKind::Semantic("an empty sequence has no element type".to_string()),
        ));
    }
    let mut elements = Vec::new();
    loop {
        elements.push(c.scan_expression()?);
        if !c.scan_if(",") {
            c.expect("]")?;
            break;
        }
    }

    let subtype = elements[0].ty().clone();
    if let Some(odd) = elements.iter().find(|e| *e.ty() != subtype) {
        return Err(c.error_at(
            token,
            ErrorKind::TypeMismatch {
                expected: subtype.display(),
                found: odd.ty().display(),
            },
        ));
    }

    let element = c.go_type(&subtype)?;
    let items = Code::join(c.targets(), elements.iter().map(Expression::code), ", ");
    let code = items.map(|b, items| match b {
        Backend::Go => format!("[]{element}{{{items}}}"),
        Backend::Js => format!("[{items}]"),
    });
    let ty = Type::Sequence {
        size: Some(elements.len()),
        subtype: Some(Box::new(subtype)),
    };
    Ok(Some(Expression::new(ty, code)))
}

pub(super) fn sequencer_literal(c: &mut Compiler<'_>, token: &Token) -> Result<Option<Expression>> {
    if !(token.is("+") || token.is("-")) || !c.peek().is("]") {
        return Ok(None);
    }
    Ok(Some(Expression::new(
        Type::Sequencer {
            plus: token.is("+"),
        },
        Code::empty(c.targets()),
    )))
}

/// `a + b` concatenates two sequences of the same element type.
pub(super) fn sequence_operation(
    c: &mut Compiler<'_>,
    lhs: &Expression,
    rhs: &Expression,
    op: &str,
) -> Result<Option<Expression>> {
    let (
        Type::Sequence {
            size: left,
            subtype,
        },
        Type::Sequence { size: right, .. },
    ) = (lhs.ty(), rhs.ty())
    else {
        return Ok(None);
    };
    if op != "+" || lhs.ty() != rhs.ty() {
        return Ok(None);
    }
    let element = match subtype {
        Some(subtype) => c.go_type(subtype)?,
        None => return Ok(None),
    };
    let code = lhs.code().zip(rhs.code(), |b, l, r| match b {
        Backend::Go => format!("append(append([]{element}{{}}, {l}...), {r}...)"),
        Backend::Js => format!("[...{l}, ...{r}]"),
    });
    let size = (*left).zip(*right).map(|(l, r)| l + r);
    let ty = Type::Sequence {
        size,
        subtype: subtype.clone(),
    };
    Ok(Some(Expression::new(ty, code)))
}

/// Build an array or list from a sequence.
pub(super) fn cast_from(
    c: &mut Compiler<'_>,
    target: &Type,
    value: &Expression,
) -> Result<Option<Expression>> {
    let Type::Sequence {
        size: from_size,
        subtype: from_subtype,
    } = value.ty()
    else {
        return Ok(None);
    };
    let subtype = match (target.subtype(), from_subtype.as_deref()) {
        (Some(want), Some(have)) if want != have => {
            return Err(c.error(ErrorKind::TypeMismatch {
                expected: want.display(),
                found: have.display(),
            }));
        }
        (want, have) => want.or(have).cloned().map(Box::new),
    };

    let (ty, literal_prefix) = match target {
        Type::Array { size, .. } => {
            let size = match (*size, *from_size) {
                (Some(want), Some(have)) if want != have => {
                    return Err(c.error(ErrorKind::Semantic(format!(
                        "array size {want} does not match the sequence size {have}"
                    ))));
                }
                (Some(size), _) | (None, Some(size)) => size,
                (None, None) => {
                    return Err(c.error(ErrorKind::Semantic(
                        "array size cannot be inferred from this sequence".to_string(),
                    )));
                }
            };
            (
                Type::Array {
                    size: Some(size),
                    subtype,
                },
                format!("[{size}]"),
            )
        }
        Type::List { .. } => (
            Type::List {
                subtype,
                presize: None,
            },
            "[]".to_string(),
        ),
        _ => return Ok(None),
    };

    let native = c.go_type(&ty)?;
    let is_array = matches!(ty, Type::Array { .. });
    let code = value.code().map(|b, v| match b {
        // A sequence literal is rewritten in place.
        Backend::Go if v.starts_with("[]") => format!("{literal_prefix}{}", &v[2..]),
        Backend::Go if is_array => {
            format!("func() (a {native}) {{ copy(a[:], {v}); return }}()")
        }
        Backend::Go => format!("append({native}(nil), {v}...)"),
        Backend::Js => format!("[...{v}]"),
    });
    Ok(Some(Expression::new(ty, code)))
}

pub(super) fn zero(c: &mut Compiler<'_>, ty: &Type) -> Result<Expression> {
    let native = c.go_type(ty)?;
    let element_zero = match ty.subtype() {
        Some(subtype) => subtype.zero(c)?.into_code(),
        None => Code::text(c.targets(), "undefined"),
    };
    let code = match ty {
        Type::Array { size: None, .. } => {
            return Err(c.error(ErrorKind::Semantic(
                "array size must be known to build its zero value".to_string(),
            )));
        }
        Type::Array { size: Some(n), .. } => element_zero.map(|b, z| match b {
            Backend::Go => format!("{native}{{}}"),
            Backend::Js => format!("Array.from({{ length: {n} }}, () => {z})"),
        }),
        // A list starts with one element more than requested, so that
        // indexing a fresh list always has something to land on.
        Type::List {
            presize: Some(n), ..
        } => element_zero.zip(n, |b, z, n| match b {
            Backend::Go => format!("make({native}, ({n})+1)"),
            Backend::Js => format!("Array.from({{ length: ({n}) + 1 }}, () => {z})"),
        }),
        Type::List { presize: None, .. } => element_zero.map(|b, z| match b {
            Backend::Go => format!("make({native}, 1)"),
            Backend::Js => format!("[{z}]"),
        }),
        _ => Code::render(c.targets(), |b| match b {
            Backend::Go => format!("{native}{{}}"),
            Backend::Js => "[]".to_string(),
        }),
    };
    Ok(Expression::new(ty.clone(), code))
}

/// Arrays are values in Go but references in JavaScript; lists are
/// references in both.
pub(super) fn copy(c: &mut Compiler<'_>, value: Expression) -> Result<Expression> {
    if !names_a_place(&value) {
        return Ok(value);
    }
    let native = c.go_type(value.ty())?;
    let is_array = matches!(value.ty(), Type::Array { .. });
    let code = value.code().map(|b, v| match b {
        Backend::Go if is_array => v.to_string(),
        Backend::Go => format!("append({native}(nil), {v}...)"),
        Backend::Js => format!("[...{v}]"),
    });
    Ok(Expression::new(value.ty().clone(), code))
}

/// True when the value is read from a variable or field rather than
/// freshly built.
fn names_a_place(value: &Expression) -> bool {
    let code = value.code();
    code.targets().iter().all(|b| {
        let text = code.as_str(b);
        !text.is_empty()
            && text
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '.')
    })
}

#[cfg(test)]
mod tests {
    use crate::backend::{Backend, Targets};
    use crate::compiler::{CompileOptions, Output, compile_source};
    use crate::error::CoreError;

    fn both(source: &str) -> Output {
        compile_source(
            "collections.sk",
            source,
            &CompileOptions {
                targets: Targets::all(),
                ..CompileOptions::default()
            },
        )
        .unwrap_or_else(|e| panic!("compile failed: {e}"))
    }

    fn failure(source: &str) -> CoreError {
        compile_source("collections.sk", source, &CompileOptions::default()).unwrap_err()
    }

    #[test]
    fn fresh_zero_values_index_in_bounds() {
        let output = both(
            "s = string()\nxs = list.integer()\na = array[3].integer()\ni = 7\nprint(s[0], s[i], xs[0], xs[i], a[4], a[i])\n",
        );
        let go = output.program(Backend::Go).unwrap();
        assert!(go.contains("string(skald_string_at(s, 0)), string(skald_string_at(s, i))"));
        assert!(go.contains("skald_at(xs, 0, 0), skald_at(xs, i, 0)"));
        assert!(go.contains("a[1], a[skald_wrap(i, 3)])"));
        assert!(go.contains("func skald_at[T any](xs []T, i int, zero T) T {\n\tif len(xs) == 0 {"));
        let js = output.program(Backend::Js).unwrap();
        assert!(js.contains("skald_at(xs, 0, 0), skald_at(xs, i, 0), a[1], a[skald_wrap(i, 3)]);"));
        assert_eq!(js.matches("function skald_wrap").count(), 1);
    }

    #[test]
    fn empty_variadic_sequence_reads_the_zero_value() {
        let output = both("first(integer(xs...)): return xs[0]\nprint(first())\n");
        let go = output.program(Backend::Go).unwrap();
        assert!(go.contains("func first(xs ...int) int {\n\treturn skald_at(xs, 0, 0)\n}"));
        let js = output.program(Backend::Js).unwrap();
        assert!(js.contains("\treturn skald_at(xs, 0, 0);\n"));
    }

    #[test]
    fn zero_size_arrays_cannot_be_indexed() {
        let error = failure("a = array[0].integer()\nprint(a[0])\n");
        assert!(error.to_string().contains("cannot index an empty array"));
    }

    #[test]
    fn sequence_size_must_match_the_array() {
        let error = failure("a = array[2].integer([1, 2, 3])\n");
        assert!(
            error
                .to_string()
                .contains("array size 2 does not match the sequence size 3")
        );
        let go = both("a = array[3].integer([1, 2, 3])\n");
        assert!(go.program(Backend::Go).unwrap().contains("var a = [3]int{1, 2, 3}"));
    }

    #[test]
    fn strings_and_sequences_are_read_only() {
        let error = failure("s = \"abc\"\ns[0] = 'x'\n");
        assert!(error.to_string().contains("strings are immutable"));
        let error = failure("q = [1, 2]\nq[0] = 5\n");
        assert!(error.to_string().contains("sequences cannot be modified"));
    }

    #[test]
    fn lists_only_grow() {
        let error = failure("xs = list.integer()\nxs[-] = 1\n");
        assert!(error.to_string().contains("lists only grow with [+]"));
    }
}
