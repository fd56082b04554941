//! Typed expressions: generated code together with its type.

use crate::backend::Code;
use crate::types::Type;

/// The result of evaluating an expression. The type is fixed once the
/// expression is built; casts and copies produce a new expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    ty: Type,
    code: Code,
    /// The integer value, when it is known while compiling. Used to fold
    /// constant indices and to read sizes in type specifications.
    constant: Option<i64>,
}

impl Expression {
    pub fn new(ty: Type, code: Code) -> Self {
        Self {
            ty,
            code,
            constant: None,
        }
    }

    pub fn integer(value: i64, code: Code) -> Self {
        Self {
            ty: Type::Integer,
            code,
            constant: Some(value),
        }
    }

    pub fn with_constant(mut self, constant: Option<i64>) -> Self {
        self.constant = constant;
        self
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn code(&self) -> &Code {
        &self.code
    }

    pub fn constant(&self) -> Option<i64> {
        self.constant
    }

    pub fn into_code(self) -> Code {
        self.code
    }
}

/// The outcome of a call: the call itself and the type it yields, if it
/// yields anything.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub code: Code,
    pub returns: Option<Type>,
    constant: Option<i64>,
}

impl Invocation {
    pub fn new(code: Code, returns: Option<Type>) -> Self {
        Self {
            code,
            returns,
            constant: None,
        }
    }

    /// The call as a value. `None` when nothing is returned.
    pub fn into_expression(self) -> Option<Expression> {
        let Invocation {
            code,
            returns,
            constant,
        } = self;
        returns.map(|ty| Expression::new(ty, code).with_constant(constant))
    }
}

impl From<Expression> for Invocation {
    /// A call whose value was computed in place, such as a cast.
    fn from(value: Expression) -> Self {
        let constant = value.constant();
        Self {
            returns: Some(value.ty().clone()),
            code: value.into_code(),
            constant,
        }
    }
}
