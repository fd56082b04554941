//! The closed set of value types.
//!
//! Every capability a type may have (literal parsing, operators,
//! casts, native names, zero values, copying, indexing) dispatches by
//! an exhaustive `match` over [`Type`]. A capability a type lacks
//! answers `Ok(None)` so the caller can report the proper error.

mod collection;
mod function;
mod logical;
mod numeric;
mod text;
mod thing;

use std::sync::Arc;

pub use collection::Collection;
pub use thing::ThingDef;

use crate::backend::{Backend, Code};
use crate::compiler::Compiler;
use crate::error::{ErrorKind, Result};
use crate::expression::{Expression, Invocation};
use crate::lexer::Token;

#[derive(Debug, Clone)]
pub enum Type {
    Undefined,
    Logical,
    Integer,
    Number,
    Symbol,
    String,
    /// A literal `[a, b]` list of values. Size is `None` for variadic
    /// parameters.
    Sequence {
        size: Option<usize>,
        subtype: Option<Box<Type>>,
    },
    Array {
        size: Option<usize>,
        subtype: Option<Box<Type>>,
    },
    /// A growable list. `presize` holds the element count requested by
    /// `list[n]`, as code evaluated when the zero value is built.
    List {
        subtype: Option<Box<Type>>,
        presize: Option<Box<Code>>,
    },
    Thing(Arc<ThingDef>),
    /// A reference to an instantiated zero-parameter concept.
    Function {
        name: String,
        returns: Option<Box<Type>>,
    },
    /// A type used as a value: `integer`, `array[3].string`.
    Metatype(Box<Type>),
    /// The `+` / `-` marker in `list[+] = value`.
    Sequencer { plus: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Undefined,
    Logical,
    Integer,
    Number,
    Symbol,
    String,
    Sequence,
    Array,
    List,
    Thing,
    Function,
    Metatype,
    Sequencer,
}

static SYMBOL: Type = Type::Symbol;

/// Literal parsers are consulted in this order and the first one that
/// accepts a token wins.
pub const LITERAL_ORDER: [TypeTag; 9] = [
    TypeTag::Sequence,
    TypeTag::Function,
    TypeTag::Integer,
    TypeTag::Number,
    TypeTag::Logical,
    TypeTag::Metatype,
    TypeTag::Sequencer,
    TypeTag::String,
    TypeTag::Symbol,
];

impl TypeTag {
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Undefined => "undefined",
            TypeTag::Logical => "logical",
            TypeTag::Integer => "integer",
            TypeTag::Number => "number",
            TypeTag::Symbol => "symbol",
            TypeTag::String => "string",
            TypeTag::Sequence => "sequence",
            TypeTag::Array => "array",
            TypeTag::List => "list",
            TypeTag::Thing => "thing",
            TypeTag::Function => "function",
            TypeTag::Metatype => "metatype",
            TypeTag::Sequencer => "sequencer",
        }
    }

    /// Try to read `token` as a literal of this type.
    pub(crate) fn parse_literal(
        self,
        c: &mut Compiler<'_>,
        token: &Token,
    ) -> Result<Option<Expression>> {
        match self {
            TypeTag::Sequence => collection::sequence_literal(c, token),
            TypeTag::Function => function::function_literal(c, token),
            TypeTag::Integer => numeric::integer_literal(c, token),
            TypeTag::Number => numeric::number_literal(c, token),
            TypeTag::Logical => logical::literal(c, token),
            TypeTag::Metatype => function::metatype_literal(c, token),
            TypeTag::Sequencer => collection::sequencer_literal(c, token),
            TypeTag::String => text::string_literal(c, token),
            TypeTag::Symbol => text::symbol_literal(c, token),
            TypeTag::Undefined | TypeTag::Array | TypeTag::List | TypeTag::Thing => Ok(None),
        }
    }
}

impl PartialEq for Type {
    /// Equality ignores sizes: two arrays of integers are the same type
    /// whatever their lengths. Things compare by name.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Sequence { subtype: a, .. }, Type::Sequence { subtype: b, .. })
            | (Type::Array { subtype: a, .. }, Type::Array { subtype: b, .. })
            | (Type::List { subtype: a, .. }, Type::List { subtype: b, .. }) => a == b,
            (Type::Thing(a), Type::Thing(b)) => a.name == b.name,
            (Type::Function { returns: a, .. }, Type::Function { returns: b, .. }) => a == b,
            (Type::Metatype(a), Type::Metatype(b)) => a == b,
            _ => self.tag() == other.tag(),
        }
    }
}

impl Type {
    pub fn tag(&self) -> TypeTag {
        match self {
            Type::Undefined => TypeTag::Undefined,
            Type::Logical => TypeTag::Logical,
            Type::Integer => TypeTag::Integer,
            Type::Number => TypeTag::Number,
            Type::Symbol => TypeTag::Symbol,
            Type::String => TypeTag::String,
            Type::Sequence { .. } => TypeTag::Sequence,
            Type::Array { .. } => TypeTag::Array,
            Type::List { .. } => TypeTag::List,
            Type::Thing(_) => TypeTag::Thing,
            Type::Function { .. } => TypeTag::Function,
            Type::Metatype(_) => TypeTag::Metatype,
            Type::Sequencer { .. } => TypeTag::Sequencer,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Type::Thing(def) => &def.name,
            _ => self.tag().name(),
        }
    }

    /// A type named by a bare word in source.
    pub fn builtin(name: &str) -> Option<Type> {
        Some(match name {
            "undefined" => Type::Undefined,
            "logical" => Type::Logical,
            "integer" => Type::Integer,
            "number" => Type::Number,
            "symbol" => Type::Symbol,
            "string" => Type::String,
            "sequence" => Type::Sequence {
                size: None,
                subtype: None,
            },
            "array" => Type::Array {
                size: None,
                subtype: None,
            },
            "list" => Type::List {
                subtype: None,
                presize: None,
            },
            _ => return None,
        })
    }

    /// Full name with size and subtype, as shown in diagnostics.
    pub fn display(&self) -> String {
        let sized = |size: &Option<usize>| size.map(|n| format!("[{n}]")).unwrap_or_default();
        let nested = |subtype: &Option<Box<Type>>| {
            subtype
                .as_ref()
                .map(|t| format!(".{}", t.display()))
                .unwrap_or_default()
        };
        match self {
            Type::Sequence { size, subtype } | Type::Array { size, subtype } => {
                format!("{}{}{}", self.name(), sized(size), nested(subtype))
            }
            Type::List { subtype, .. } | Type::Function { returns: subtype, .. } => {
                format!("{}{}", self.name(), nested(subtype))
            }
            Type::Metatype(inner) => format!("metatype.{}", inner.display()),
            _ => self.name().to_string(),
        }
    }

    pub fn subtype(&self) -> Option<&Type> {
        match self {
            Type::Sequence { subtype, .. }
            | Type::Array { subtype, .. }
            | Type::List { subtype, .. } => subtype.as_deref(),
            Type::Function { returns, .. } => returns.as_deref(),
            Type::Metatype(inner) => Some(inner),
            Type::String => Some(&SYMBOL),
            _ => None,
        }
    }

    /// Whether a value of `other` may stand where `self` is expected
    /// without a cast. A collection without a subtype takes any
    /// collection of the same kind.
    pub fn accepts(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Sequence { subtype: a, .. }, Type::Sequence { subtype: b, .. })
            | (Type::Array { subtype: a, .. }, Type::Array { subtype: b, .. })
            | (Type::List { subtype: a, .. }, Type::List { subtype: b, .. }) => match (a, b) {
                (None, _) => true,
                (Some(a), Some(b)) => a.accepts(b),
                (Some(_), None) => false,
            },
            _ => self == other,
        }
    }

    pub fn as_collection(&self) -> Option<Collection<'_>> {
        Some(match self {
            Type::String => Collection::String,
            Type::Sequence { size, subtype } => Collection::Sequence {
                size: *size,
                subtype: subtype.as_deref(),
            },
            Type::Array { size, subtype } => Collection::Array {
                size: *size,
                subtype: subtype.as_deref(),
            },
            Type::List { subtype, presize } => Collection::List {
                subtype: subtype.as_deref(),
                presize: presize.as_deref(),
            },
            _ => return None,
        })
    }

    /// The backend's spelling of this type, or `None` when the backend
    /// has no way to name it.
    pub fn native_name(&self, backend: Backend) -> Option<String> {
        match backend {
            Backend::Go => self.go_name(),
            Backend::Js => self.js_name().map(str::to_string),
        }
    }

    fn go_name(&self) -> Option<String> {
        Some(match self {
            Type::Undefined => "struct{}".to_string(),
            Type::Logical => "bool".to_string(),
            Type::Integer => "int".to_string(),
            Type::Number => "float64".to_string(),
            Type::Symbol => "rune".to_string(),
            Type::String | Type::Metatype(_) => "string".to_string(),
            Type::Sequence { subtype, .. } | Type::List { subtype, .. } => {
                format!("[]{}", subtype.as_ref()?.go_name()?)
            }
            Type::Array { size, subtype } => {
                format!("[{}]{}", (*size)?, subtype.as_ref()?.go_name()?)
            }
            Type::Thing(def) => def.name.clone(),
            Type::Function { returns, .. } => match returns {
                Some(returns) => format!("func() {}", returns.go_name()?),
                None => "func()".to_string(),
            },
            Type::Sequencer { .. } => return None,
        })
    }

    fn js_name(&self) -> Option<&'static str> {
        Some(match self {
            Type::Undefined => "undefined",
            Type::Logical => "boolean",
            Type::Integer | Type::Number => "number",
            Type::Symbol | Type::String | Type::Metatype(_) => "string",
            Type::Sequence { .. } | Type::Array { .. } | Type::List { .. } => "Array",
            Type::Thing(_) => "Object",
            Type::Function { .. } => "Function",
            Type::Sequencer { .. } => return None,
        })
    }

    /// Apply binary operator `op` with `lhs` (of this type) on the left.
    pub(crate) fn operation(
        &self,
        c: &mut Compiler<'_>,
        lhs: &Expression,
        rhs: &Expression,
        op: &str,
    ) -> Result<Option<Expression>> {
        match self {
            Type::Integer => numeric::integer_operation(c, lhs, rhs, op),
            Type::Number => numeric::number_operation(c, lhs, rhs, op),
            Type::Logical => Ok(logical::operation(lhs, rhs, op)),
            Type::Symbol => Ok(text::symbol_operation(lhs, rhs, op)),
            Type::String => Ok(text::string_operation(lhs, rhs, op)),
            Type::Sequence { .. } => collection::sequence_operation(c, lhs, rhs, op),
            Type::Metatype(_) => Ok(function::metatype_operation(c, lhs, rhs, op)),
            Type::Thing(_) => thing::operation(c, lhs, rhs, op),
            Type::Undefined
            | Type::Array { .. }
            | Type::List { .. }
            | Type::Function { .. }
            | Type::Sequencer { .. } => Ok(None),
        }
    }

    /// Unary minus.
    pub(crate) fn negate(&self, value: &Expression) -> Option<Expression> {
        match self {
            Type::Integer | Type::Number => Some(numeric::negate(value)),
            _ => None,
        }
    }

    /// Conversions this type knows how to perform toward `target`.
    pub(crate) fn cast_to(
        &self,
        c: &mut Compiler<'_>,
        value: &Expression,
        target: &Type,
    ) -> Result<Option<Expression>> {
        match self {
            Type::Integer => Ok(numeric::integer_cast(c, value, target)),
            Type::Number => Ok(numeric::number_cast(c, value, target)),
            Type::Logical => Ok(logical::cast(c, value, target)),
            Type::Symbol => Ok(text::symbol_cast(value, target)),
            Type::String => text::string_cast(c, value, target),
            _ => Ok(None),
        }
    }

    /// Conversions this type knows how to perform from `value`.
    pub(crate) fn cast_from(
        &self,
        c: &mut Compiler<'_>,
        value: &Expression,
    ) -> Result<Option<Expression>> {
        match self {
            Type::Array { .. } | Type::List { .. } => collection::cast_from(c, self, value),
            _ => Ok(None),
        }
    }

    /// The value a fresh variable of this type starts out with.
    pub(crate) fn zero(&self, c: &mut Compiler<'_>) -> Result<Expression> {
        let targets = c.targets();
        let code = match self {
            Type::Integer => return Ok(Expression::integer(0, Code::text(targets, "0"))),
            Type::Undefined => Code::render(targets, |b| b.pick("struct{}{}", "undefined").into()),
            Type::Logical => Code::text(targets, "false"),
            Type::Number => Code::render(targets, |b| b.pick("0.0", "0").into()),
            Type::Symbol => Code::render(targets, |b| b.pick("rune(0)", "\"\"").into()),
            Type::String => Code::text(targets, "\"\""),
            Type::Sequence { .. } | Type::Array { .. } | Type::List { .. } => {
                return collection::zero(c, self);
            }
            Type::Thing(def) => Code::text(targets, &thing::constructor_call(def)),
            Type::Function { .. } => return function::zero(c, self),
            Type::Metatype(inner) => Code::text(targets, &format!("{:?}", inner.display())),
            Type::Sequencer { .. } => {
                return Err(c.error(ErrorKind::Semantic(
                    "a sequencer has no value of its own".to_string(),
                )));
            }
        };
        Ok(Expression::new(self.clone(), code))
    }

    /// A copy of `value` that does not alias it, for assignment into a
    /// new variable.
    pub(crate) fn copy(&self, c: &mut Compiler<'_>, value: Expression) -> Result<Expression> {
        match self {
            Type::Array { .. } | Type::List { .. } => collection::copy(c, value),
            Type::Thing(_) => Ok(thing::copy(value)),
            _ => Ok(value),
        }
    }

    /// `value.field`
    pub(crate) fn member(
        &self,
        c: &mut Compiler<'_>,
        value: &Expression,
        field: &Token,
    ) -> Result<Option<Expression>> {
        match self {
            Type::Thing(def) => thing::member(c, def, value, field).map(Some),
            _ => Ok(None),
        }
    }

    /// `value(args)`. `None` when values of this type cannot be called.
    pub(crate) fn call(
        &self,
        c: &mut Compiler<'_>,
        value: &Expression,
        args: Vec<Expression>,
    ) -> Result<Option<Invocation>> {
        match self {
            Type::Function { returns, .. } => {
                function::call_function(c, returns.as_deref(), value, args).map(Some)
            }
            Type::Metatype(inner) => function::call_metatype(c, inner, args).map(Some),
            _ => Ok(None),
        }
    }
}

/// `(lhs op rhs)` with per-backend operator spellings.
pub(crate) fn binary(ty: Type, lhs: &Expression, rhs: &Expression, go: &str, js: &str) -> Expression {
    let code = lhs
        .code()
        .zip(rhs.code(), |b, l, r| format!("({l} {} {r})", b.pick(go, js)));
    Expression::new(ty, code)
}

/// Comparison operators shared by every ordered type.
pub(crate) fn compare(lhs: &Expression, rhs: &Expression, op: &str) -> Option<Expression> {
    let (go, js) = match op {
        "=" => ("==", "==="),
        "!" => ("!=", "!=="),
        "<" => ("<", "<"),
        ">" => (">", ">"),
        _ => return None,
    };
    Some(binary(Type::Logical, lhs, rhs, go, js))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Targets;
    use crate::compiler::CompileOptions;
    use proptest::prelude::*;

    fn array(size: Option<usize>, subtype: Type) -> Type {
        Type::Array {
            size,
            subtype: Some(Box::new(subtype)),
        }
    }

    #[test]
    fn equality_ignores_sizes() {
        assert_eq!(array(Some(3), Type::Integer), array(Some(5), Type::Integer));
        assert_ne!(array(Some(3), Type::Integer), array(Some(3), Type::String));
        assert_ne!(
            array(None, Type::Integer),
            Type::List {
                subtype: Some(Box::new(Type::Integer)),
                presize: None
            }
        );
    }

    #[test]
    fn display_includes_shape() {
        assert_eq!(array(Some(3), Type::Integer).display(), "array[3].integer");
        assert_eq!(
            Type::Metatype(Box::new(Type::String)).display(),
            "metatype.string"
        );
    }

    #[test]
    fn native_names_for_go() {
        assert_eq!(
            array(Some(3), Type::Integer).native_name(Backend::Go).as_deref(),
            Some("[3]int")
        );
        assert_eq!(array(None, Type::Integer).native_name(Backend::Go), None);
        assert_eq!(
            Type::Sequencer { plus: true }.native_name(Backend::Go),
            None
        );
    }

    #[test]
    fn untyped_collections_accept_any_subtype() {
        let any_list = Type::List {
            subtype: None,
            presize: None,
        };
        let strings = Type::List {
            subtype: Some(Box::new(Type::String)),
            presize: None,
        };
        assert!(any_list.accepts(&strings));
        assert!(!strings.accepts(&any_list));
    }

    fn leaf() -> impl Strategy<Value = Type> {
        prop_oneof![
            Just(Type::Logical),
            Just(Type::Integer),
            Just(Type::Number),
            Just(Type::Symbol),
            Just(Type::String),
        ]
    }

    fn any_type() -> impl Strategy<Value = Type> {
        leaf().prop_recursive(3, 8, 1, |inner| {
            prop_oneof![
                (proptest::option::of(0usize..8), inner.clone()).prop_map(|(size, t)| array(size, t)),
                inner.prop_map(|t| Type::List {
                    subtype: Some(Box::new(t)),
                    presize: None
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn casting_to_the_same_type_is_identity(ty in any_type()) {
            let mut compiler = Compiler::new(CompileOptions {
                targets: Targets::all(),
                ..CompileOptions::default()
            });
            let value = Expression::new(ty.clone(), Code::text(Targets::all(), "v"));
            let cast = compiler.cast(value.clone(), &ty).unwrap();
            prop_assert_eq!(cast, value);
        }
    }
}
