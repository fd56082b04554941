//! Expression evaluation by operator precedence.
//!
//! Operands are read by [`Compiler::scan_primary`]; binary operators
//! are folded in by [`Compiler::shunt`], which recurses for operators
//! that bind tighter than the one on its left. Indexing, calls and
//! field access are postfix operators of the highest levels.

use tracing::trace;

use crate::backend::Code;
use crate::builtins::find_builtin;
use crate::compiler::Compiler;
use crate::error::{ErrorKind, Result};
use crate::expression::Expression;
use crate::lexer::{Token, TokenKind};
use crate::types::{LITERAL_ORDER, Type};

/// Alias expansions nested deeper than this are taken for a cycle.
const ALIAS_DEPTH: usize = 64;

/// Binding strength of the operator `token`. `Some(-1)` marks a token
/// that ends an expression, `None` a token that is no operator at all.
pub fn precedence(token: &Token) -> Option<i32> {
    match token.kind {
        TokenKind::Newline | TokenKind::Eof => return Some(-1),
        TokenKind::Punct | TokenKind::Word => {}
        _ => return None,
    }
    Some(match token.text.as_str() {
        "," | ")" | "]" | "}" | "{" | ":" | ";" | "in" | "to" => -1,
        "|" => 0,
        "&" => 1,
        "=" | "<" | ">" | "!" => 2,
        "+" | "-" => 3,
        "*" | "/" | "%" => 4,
        "^" => 5,
        "(" | "[" => 6,
        "." => 7,
        _ => return None,
    })
}

/// Postfix operators start at this level.
const POSTFIX: i32 = 6;

fn right_associative(token: &Token) -> bool {
    token.is("^")
}

impl Compiler<'_> {
    pub(crate) fn scan_expression(&mut self) -> Result<Expression> {
        let first = self.scan_primary()?;
        self.shunt(first, 0)
    }

    /// An operand together with its postfix operators, as taken by unary
    /// operators.
    pub(crate) fn scan_operand(&mut self) -> Result<Expression> {
        let primary = self.scan_primary()?;
        self.shunt(primary, POSTFIX)
    }

    /// Fold operators of level `min` or higher into `result`.
    pub(crate) fn shunt(&mut self, mut result: Expression, min: i32) -> Result<Expression> {
        loop {
            let operator = self.peek();
            let Some(level) = precedence(&operator) else {
                return Err(self.error_at(
                    &operator,
                    ErrorKind::UndefinedOperator(operator.describe()),
                ));
            };
            if level < min {
                return Ok(result);
            }
            self.next_token();

            if operator.is(".") {
                result = self.member_value(result)?;
                continue;
            }
            if operator.is("(") {
                result = self.call_value(result)?;
                continue;
            }
            if operator.is("[") {
                result = self.index_value(result)?;
                continue;
            }

            let mut rhs = self.scan_primary()?;
            loop {
                let next = self.peek();
                let Some(next_level) = precedence(&next) else {
                    break;
                };
                let binds_tighter = next_level > level
                    || (next_level == level && right_associative(&next));
                if !binds_tighter {
                    break;
                }
                let rhs_min = if next_level > level { level + 1 } else { level };
                rhs = self.shunt(rhs, rhs_min)?;
            }
            result = self.operate(&operator, result, rhs)?;
        }
    }

    fn operate(&mut self, operator: &Token, lhs: Expression, rhs: Expression) -> Result<Expression> {
        let ty = lhs.ty().clone();
        match ty.operation(self, &lhs, &rhs, &operator.text)? {
            Some(value) => {
                trace!(operator = %operator.text, ty = %value.ty().display(), "operation");
                Ok(value)
            }
            None => Err(self.error_at(
                operator,
                ErrorKind::UnsupportedOperator {
                    operator: operator.text.clone(),
                    left: lhs.ty().display(),
                    right: rhs.ty().display(),
                },
            )),
        }
    }

    /// One operand: a group, a negation, a name or a literal.
    pub(crate) fn scan_primary(&mut self) -> Result<Expression> {
        let token = self.next_token();

        if token.is("(") {
            let inner = self.scan_expression()?;
            self.expect(")")?;
            return Ok(inner);
        }

        if token.is("-") && !self.peek().is("]") {
            let operand = self.scan_operand()?;
            return operand.ty().negate(&operand).ok_or_else(|| {
                self.error_at(
                    &token,
                    ErrorKind::Semantic(format!("cannot negate {}", operand.ty().display())),
                )
            });
        }

        if token.is_word() {
            if let Some(tokens) = self.alias(&token.text) {
                self.expand_alias(&token, tokens)?;
                return self.scan_primary();
            }
            if let Some(ty) = self.variable(&token.text) {
                let code = Code::text(self.targets(), &token.text);
                return Ok(Expression::new(ty, code));
            }
        }

        for tag in LITERAL_ORDER {
            if let Some(literal) = tag.parse_literal(self, &token)? {
                return Ok(literal);
            }
        }

        if token.is_word() {
            if let Some(value) = self.scan_named_call(&token)? {
                return Ok(value);
            }
        }

        match token.kind {
            TokenKind::Word => Err(self.error_at(&token, ErrorKind::UndefinedName(token.text.clone()))),
            _ => Err(self.error_at(
                &token,
                ErrorKind::SyntaxExpectation {
                    expected: "an expression".to_string(),
                    found: token.describe(),
                },
            )),
        }
    }

    /// `concept(...)`, `builtin(...)` or `package.concept(...)` used as a
    /// value.
    fn scan_named_call(&mut self, token: &Token) -> Result<Option<Expression>> {
        let name = token.text.as_str();
        let package = self.context.package.clone();
        let next = self.peek();
        let builtin = find_builtin(name).filter(|_| next.is("("));
        let invocation = if next.is("(") && self.concept_exists(&package, name) {
            self.invoke_concept(&package, name)?
        } else if let Some(builtin) = builtin {
            self.invoke_builtin(builtin, token)?
        } else if next.is(".") && self.tables.has_package(name) {
            self.next_token();
            let member = self.expect_word("a concept name")?;
            if !self.concept_exists(name, &member.text) {
                return Err(self.error_at(
                    &member,
                    ErrorKind::UndefinedName(format!("{name}.{}", member.text)),
                ));
            }
            self.invoke_concept(name, &member.text)?
        } else {
            return Ok(None);
        };
        let value = invocation
            .into_expression()
            .ok_or_else(|| self.error_at(token, ErrorKind::NoReturnValue(token.text.clone())))?;
        Ok(Some(value))
    }

    pub(crate) fn alias(&self, name: &str) -> Option<Vec<Token>> {
        self.tables.alias(&self.context.package, name)
    }

    pub(crate) fn expand_alias(&mut self, token: &Token, tokens: Vec<Token>) -> Result<()> {
        if self.context.source.depth() > ALIAS_DEPTH {
            return Err(self.error_at(
                token,
                ErrorKind::Semantic(format!("alias {} expands into itself", token.text)),
            ));
        }
        self.context.source.push(tokens);
        Ok(())
    }

    fn member_value(&mut self, value: Expression) -> Result<Expression> {
        let field = self.expect_word("a field name")?;
        let ty = value.ty().clone();
        match ty.member(self, &value, &field)? {
            Some(member) => Ok(member),
            None => Err(self.error_at(
                &field,
                ErrorKind::Semantic(format!("{} has no fields", ty.display())),
            )),
        }
    }

    fn call_value(&mut self, callee: Expression) -> Result<Expression> {
        let args = self.scan_call_arguments()?;
        let ty = callee.ty().clone();
        let Some(invocation) = ty.call(self, &callee, args)? else {
            return Err(self.error(ErrorKind::Semantic(format!(
                "{} cannot be called",
                ty.display()
            ))));
        };
        invocation
            .into_expression()
            .ok_or_else(|| self.error(ErrorKind::NoReturnValue(ty.display())))
    }

    fn index_value(&mut self, value: Expression) -> Result<Expression> {
        let indices = self.scan_index_list()?;
        let ty = value.ty().clone();
        let Some(collection) = ty.as_collection() else {
            return Err(self.error(ErrorKind::Semantic(format!(
                "{} cannot be indexed",
                ty.display()
            ))));
        };
        collection.index(self, &value, indices)
    }

    /// Arguments after an opening `(`, up to and including the `)`.
    pub(crate) fn scan_call_arguments(&mut self) -> Result<Vec<Expression>> {
        let mut args = Vec::new();
        if self.scan_if(")") {
            return Ok(args);
        }
        loop {
            args.push(self.scan_expression()?);
            if !self.scan_if(",") {
                self.expect(")")?;
                return Ok(args);
            }
        }
    }

    /// Indices after an opening `[`, up to and including the `]`.
    pub(crate) fn scan_index_list(&mut self) -> Result<Vec<Expression>> {
        let mut indices = Vec::new();
        if self.scan_if("]") {
            return Ok(indices);
        }
        loop {
            indices.push(self.scan_expression()?);
            if !self.scan_if(",") {
                self.expect("]")?;
                return Ok(indices);
            }
        }
    }

    /// A type named in source: a builtin type or a thing of the current
    /// package.
    pub(crate) fn lookup_type(&self, name: &str) -> Option<Type> {
        Type::builtin(name).or_else(|| {
            self.tables
                .thing(&self.context.package, name)
                .map(Type::Thing)
        })
    }

    /// The rest of a type specification after its base name:
    /// `[size]` arguments and a `.subtype`, as in `array[3].integer`.
    pub(crate) fn scan_type_specification(&mut self, base: Type) -> Result<Type> {
        let args = if self.scan_if("[") {
            self.scan_index_list()?
        } else {
            Vec::new()
        };

        let subtype = if base.as_collection().is_some() && self.peek().is(".") {
            self.next_token();
            let word = self.expect_word("a type name")?;
            let Some(inner) = self.lookup_type(&word.text) else {
                return Err(self.error_at(&word, ErrorKind::UndefinedName(word.text.clone())));
            };
            Some(self.scan_type_specification(inner)?)
        } else {
            None
        };

        let Some(collection) = base.as_collection() else {
            if !args.is_empty() {
                return Err(self.error(ErrorKind::Semantic(format!(
                    "{} does not take arguments",
                    base.display()
                ))));
            }
            return Ok(base);
        };
        let ty = collection.specify(self, &args)?;
        match (subtype, ty.as_collection()) {
            (Some(subtype), Some(collection)) => collection.with_subtype(self, subtype),
            _ => Ok(ty),
        }
    }
}
