//! Lexical scopes and compile contexts.
//!
//! A [`Context`] is everything needed to compile one stream of tokens:
//! the token source, the scope stack and what a `return` has produced so
//! far. Compiling a concept body or an imported file pushes a fresh
//! context; the outer one waits on the compiler's frame stack.

use indexmap::IndexMap;
use tracing::trace;

use crate::backend::Code;
use crate::buffer::Region;
use crate::compiler::Compiler;
use crate::error::Result;
use crate::scanner::TokenSource;
use crate::types::{ThingDef, Type};

/// Work to do when a scope closes. Runs after the scope is popped and
/// sees the scope that was closed.
#[derive(Debug, Clone)]
pub enum Cleanup {
    /// Emit a closing line, such as the `}` of a loop.
    Close(Code),
    /// Turn the variables of the closed scope into the fields of a thing.
    FinishThing(String),
}

#[derive(Debug, Default)]
pub struct Scope {
    variables: IndexMap<String, Type>,
    cleanups: Vec<Cleanup>,
}

impl Scope {
    pub fn get(&self, name: &str) -> Option<&Type> {
        self.variables.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, ty: Type) {
        self.variables.insert(name.into(), ty);
    }

    /// Variables in definition order.
    pub fn variables(&self) -> impl Iterator<Item = (&str, &Type)> {
        self.variables.iter().map(|(name, ty)| (name.as_str(), ty))
    }
}

#[derive(Debug)]
pub struct Context {
    pub(crate) source: TokenSource,
    pub(crate) scopes: Vec<Scope>,
    /// Type of the latest `return` compiled in this context.
    pub(crate) returns: Option<Type>,
    pub(crate) package: String,
    /// Symbol of the concept whose body this context compiles.
    pub(crate) instantiating: Option<String>,
    /// Whether a `main` block may appear here.
    pub(crate) entry_allowed: bool,
}

impl Context {
    pub fn new(source: TokenSource, package: impl Into<String>) -> Self {
        Self {
            source,
            scopes: Vec::new(),
            returns: None,
            package: package.into(),
            instantiating: None,
            entry_allowed: false,
        }
    }

    /// A context with nothing to scan.
    pub fn detached() -> Self {
        Self::new(TokenSource::new(Vec::new()), "")
    }
}

impl Compiler<'_> {
    pub(crate) fn gain_scope(&mut self) {
        self.context.scopes.push(Scope::default());
    }

    /// Pop the innermost scope and run its cleanups, last registered
    /// first.
    pub(crate) fn lose_scope(&mut self) -> Result<()> {
        let Some(mut scope) = self.context.scopes.pop() else {
            return Ok(());
        };
        while let Some(cleanup) = scope.cleanups.pop() {
            self.run_cleanup(cleanup, &scope)?;
        }
        Ok(())
    }

    pub(crate) fn defer(&mut self, cleanup: Cleanup) {
        if let Some(scope) = self.context.scopes.last_mut() {
            scope.cleanups.push(cleanup);
        }
    }

    fn run_cleanup(&mut self, cleanup: Cleanup, scope: &Scope) -> Result<()> {
        match cleanup {
            Cleanup::Close(code) => {
                self.emit_line(&code);
                Ok(())
            }
            Cleanup::FinishThing(name) => self.finish_thing(name, scope),
        }
    }

    /// Registers the thing whose constructor body just closed, writes
    /// its declaration into the Head and the constructor's `return`.
    fn finish_thing(&mut self, name: String, scope: &Scope) -> Result<()> {
        let fields = scope
            .variables()
            .map(|(field, ty)| (field.to_string(), ty.clone()))
            .collect();
        let def = ThingDef::new(name, fields);
        let declaration = def.declaration(self)?;
        let constructor_return = def.constructor_return(self);
        self.buffers.current_mut().write(Region::Head, &declaration);
        self.buffers
            .current_mut()
            .write(Region::Body, &constructor_return);
        trace!(thing = %def.name, fields = def.fields.len(), "thing finished");
        let package = self.context.package.clone();
        self.tables
            .package_mut(&package)
            .things
            .insert(def.name.clone(), def.into());
        Ok(())
    }

    /// The innermost binding of `name`.
    pub(crate) fn variable(&self, name: &str) -> Option<Type> {
        self.context
            .scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .cloned()
    }

    pub(crate) fn bind(&mut self, name: &str, ty: Type) {
        if let Some(scope) = self.context.scopes.last_mut() {
            scope.insert(name, ty);
        }
    }

    /// Indentation of generated statements: one tab per open scope.
    pub(crate) fn indent(&self) -> String {
        "\t".repeat(self.context.scopes.len())
    }
}
