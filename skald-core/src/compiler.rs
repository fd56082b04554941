//! The compiler state and the entry points for compiling one source.
//!
//! A [`Compiler`] reads tokens through its current [`Context`], writes
//! generated code into a [`BufferStack`] and records declarations in
//! its [`Tables`]. Expression evaluation, statements and concepts live
//! in their own modules as further `impl Compiler` blocks.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::MutexGuard;
use tracing::{debug, trace};

use crate::backend::{Backend, Code, Helper, Targets};
use crate::buffer::{Buffer, BufferStack, Region};
use crate::error::{CoreError, ErrorKind, Result};
use crate::expression::Expression;
use crate::lexer::{Token, lex};
use crate::package::Rendezvous;
use crate::scanner::TokenSource;
use crate::scope::{Context, Scope};
use crate::span::SourceFile;
use crate::tables::{Tables, TablesRef};
use crate::types::Type;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    pub targets: Targets,
    /// Directory `import` statements resolve package names against.
    pub root: PathBuf,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            targets: Targets::default(),
            root: PathBuf::from("."),
        }
    }
}

/// Generated programs, one per enabled backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    programs: BTreeMap<Backend, String>,
}

impl Output {
    pub fn program(&self, backend: Backend) -> Option<&str> {
        self.programs.get(&backend).map(String::as_str)
    }

    pub fn programs(&self) -> impl Iterator<Item = (Backend, &str)> {
        self.programs
            .iter()
            .map(|(backend, text)| (*backend, text.as_str()))
    }

    pub fn write_to(&self, backend: Backend, sink: &mut impl io::Write) -> io::Result<()> {
        sink.write_all(self.program(backend).unwrap_or_default().as_bytes())
    }
}

pub struct Compiler<'a> {
    pub(crate) options: CompileOptions,
    pub(crate) context: Context,
    pub(crate) frames: Vec<Context>,
    pub(crate) buffers: BufferStack,
    pub(crate) tables: TablesRef<'a>,
    pub(crate) gate: Option<&'a Rendezvous>,
    /// Set once a `main` block was compiled.
    pub(crate) entry: bool,
}

impl Compiler<'static> {
    /// A compiler with tables of its own.
    pub fn new(options: CompileOptions) -> Self {
        Self::with_tables(options, TablesRef::Owned(Box::default()), None)
    }
}

impl<'a> Compiler<'a> {
    /// A package worker: it compiles against the locked shared tables
    /// and meets its siblings at `gate`.
    pub(crate) fn shared(
        options: CompileOptions,
        tables: MutexGuard<'a, Tables>,
        gate: &'a Rendezvous,
    ) -> Self {
        Self::with_tables(options, TablesRef::Shared(tables), Some(gate))
    }

    fn with_tables(
        options: CompileOptions,
        tables: TablesRef<'a>,
        gate: Option<&'a Rendezvous>,
    ) -> Self {
        let buffers = BufferStack::new(options.targets);
        Self {
            options,
            context: Context::detached(),
            frames: Vec::new(),
            buffers,
            tables,
            gate,
            entry: false,
        }
    }

    pub fn targets(&self) -> Targets {
        self.options.targets
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    /// Compile a whole file into the root package.
    pub fn compile_unit(&mut self, file: Arc<SourceFile>) -> Result<()> {
        self.compile_in_package(&file, "")
    }

    pub(crate) fn compile_in_package(&mut self, file: &Arc<SourceFile>, package: &str) -> Result<()> {
        let tokens = self.open_unit(file, package)?;
        let compiled = self
            .declare(&tokens)
            .and_then(|()| self.compile_statements());
        match compiled {
            Ok(()) => self.close_unit(),
            Err(error) => {
                self.pop_context();
                Err(error)
            }
        }
    }

    /// Lex `file` and make it the current context.
    pub(crate) fn open_unit(&mut self, file: &Arc<SourceFile>, package: &str) -> Result<Arc<[Token]>> {
        debug!(file = %file.name, package, "compiling unit");
        let tokens: Arc<[Token]> = lex(file)?.into();
        let mut context = Context::new(TokenSource::from_shared(Arc::clone(&tokens), 0), package);
        context.scopes.push(Scope::default());
        context.entry_allowed = package.is_empty();
        self.push_context(context);
        Ok(tokens)
    }

    pub(crate) fn close_unit(&mut self) -> Result<()> {
        let closed = self.lose_scope();
        self.pop_context();
        closed
    }

    pub(crate) fn push_context(&mut self, context: Context) {
        let outer = std::mem::replace(&mut self.context, context);
        self.frames.push(outer);
    }

    pub(crate) fn pop_context(&mut self) -> Context {
        let outer = self.frames.pop().unwrap_or_else(Context::detached);
        std::mem::replace(&mut self.context, outer)
    }

    /// Runs `f` with the shared tables unlocked.
    pub(crate) fn park<U>(&mut self, f: impl FnOnce() -> U) -> U {
        self.tables.unlocked(f)
    }

    /// Fails once a sibling file of a package compile has failed.
    pub(crate) fn check_cancelled(&self) -> Result<()> {
        match self.gate {
            Some(gate) if gate.is_cancelled() => Err(CoreError::Cancelled(
                self.context.source.here().file.name.clone(),
            )),
            _ => Ok(()),
        }
    }

    pub fn finish(self) -> Output {
        let targets = self.targets();
        let buffer = self.buffers.into_buffer();
        materialize(buffer, &self.tables, targets)
    }

    pub(crate) fn into_buffer(self) -> Buffer {
        self.buffers.into_buffer()
    }

    // Diagnostics

    pub(crate) fn error(&self, kind: ErrorKind) -> CoreError {
        CoreError::compile(kind, self.context.source.here().location())
    }

    pub(crate) fn error_at(&self, token: &Token, kind: ErrorKind) -> CoreError {
        CoreError::compile(kind, token.position.location())
    }

    // Tokens

    pub(crate) fn peek(&mut self) -> Token {
        self.context.source.peek().clone()
    }

    pub(crate) fn next_token(&mut self) -> Token {
        self.context.source.next()
    }

    pub(crate) fn scan_if(&mut self, text: &str) -> bool {
        self.context.source.scan_if(text)
    }

    pub(crate) fn expect(&mut self, text: &str) -> Result<Token> {
        let token = self.next_token();
        if token.is(text) {
            return Ok(token);
        }
        Err(self.error_at(
            &token,
            ErrorKind::SyntaxExpectation {
                expected: format!("'{text}'"),
                found: token.describe(),
            },
        ))
    }

    pub(crate) fn expect_word(&mut self, what: &str) -> Result<Token> {
        let token = self.next_token();
        if token.is_word() {
            return Ok(token);
        }
        Err(self.error_at(
            &token,
            ErrorKind::SyntaxExpectation {
                expected: what.to_string(),
                found: token.describe(),
            },
        ))
    }

    // Output

    pub(crate) fn write(&mut self, region: Region, code: &Code) {
        self.buffers.current_mut().write(region, code);
    }

    /// One indented line per backend into the Body. Empty fragments
    /// write nothing.
    pub(crate) fn emit_line(&mut self, code: &Code) {
        let indent = self.indent();
        let line = code.map(|_, text| {
            if text.is_empty() {
                String::new()
            } else {
                format!("{indent}{text}\n")
            }
        });
        self.write(Region::Body, &line);
    }

    /// Like [`emit_line`](Self::emit_line), terminating JavaScript
    /// statements with `;`.
    pub(crate) fn emit_statement(&mut self, code: &Code) {
        let statement = code.map(|b, text| match b {
            Backend::Js if !text.is_empty() => format!("{text};"),
            _ => text.to_string(),
        });
        self.emit_line(&statement);
    }

    /// Compile into a scratch buffer whose Body lands in the Neck behind
    /// the prefix the closure hands back, like a function. The scratch
    /// buffer is dumped on failure as well, so the stack stays balanced.
    pub(crate) fn flipped<T>(
        &mut self,
        compile: impl FnOnce(&mut Self) -> Result<(T, Option<Code>)>,
    ) -> Result<T> {
        let handle = self.buffers.flip();
        match compile(self) {
            Ok((value, prefix)) => {
                self.buffers.dump_to_head(handle, prefix.as_ref());
                Ok(value)
            }
            Err(error) => {
                self.buffers.dump(handle);
                Err(error)
            }
        }
    }

    /// Emit a runtime helper, and the helpers and imports it needs, the
    /// first time it is used.
    pub(crate) fn require(&mut self, helper: Helper) -> Result<()> {
        for backend in self.targets().iter() {
            self.require_on(backend, helper)?;
        }
        Ok(())
    }

    /// [`require`](Self::require) for one backend only.
    pub(crate) fn require_on(&mut self, backend: Backend, helper: Helper) -> Result<()> {
        for dependency in helper.requires() {
            self.require_on(backend, *dependency)?;
        }
        let Some(source) = helper.source(backend) else {
            return Err(self.error(ErrorKind::Unsupported {
                feature: format!("{}()", helper.name()),
                backend: backend.name(),
            }));
        };
        if self.tables.mark_helper(backend, helper) {
            trace!(helper = helper.name(), %backend, "helper emitted");
            for package in helper.imports(backend) {
                self.tables.add_import(backend, package);
            }
            self.buffers
                .current_mut()
                .write_str(Region::Neck, backend, source);
        }
        Ok(())
    }

    /// Record a native import for `backend` when it is enabled.
    pub(crate) fn import(&mut self, backend: Backend, package: &str) {
        if self.targets().enabled(backend) {
            self.tables.add_import(backend, package);
        }
    }

    pub(crate) fn native_type(&self, ty: &Type, backend: Backend) -> Result<String> {
        ty.native_name(backend).ok_or_else(|| {
            self.error(ErrorKind::Unsupported {
                feature: format!("values of type {}", ty.display()),
                backend: backend.name(),
            })
        })
    }

    /// The Go spelling of `ty`, or `""` when Go is not emitted.
    pub(crate) fn go_type(&self, ty: &Type) -> Result<String> {
        if !self.targets().enabled(Backend::Go) {
            return Ok(String::new());
        }
        self.native_type(ty, Backend::Go)
    }

    // Conversions

    /// Convert `value` to `target`: unchanged when the target already
    /// accepts it, else by the source type's casts, else by the target's.
    pub(crate) fn cast(&mut self, value: Expression, target: &Type) -> Result<Expression> {
        if target.accepts(value.ty()) {
            return Ok(value);
        }
        let from = value.ty().clone();
        if let Some(cast) = from.cast_to(self, &value, target)? {
            return Ok(cast);
        }
        if let Some(cast) = target.cast_from(self, &value)? {
            return Ok(cast);
        }
        Err(self.error(ErrorKind::UnsupportedCast {
            from: from.display(),
            to: target.display(),
        }))
    }

    /// A cast where the value was required to be of type `target`. A
    /// missing conversion reads as a type mismatch.
    pub(crate) fn coerce(&mut self, value: Expression, target: &Type) -> Result<Expression> {
        let found = value.ty().display();
        match self.cast(value, target) {
            Err(error) if matches!(error.kind(), Some(ErrorKind::UnsupportedCast { .. })) => {
                Err(self.error(ErrorKind::TypeMismatch {
                    expected: target.display(),
                    found,
                }))
            }
            other => other,
        }
    }

    /// Evaluate one expression against the current scopes, opening a
    /// root scope when there is none.
    #[cfg(test)]
    pub(crate) fn evaluate(&mut self, text: &str) -> Result<Expression> {
        let file = SourceFile::new("<expression>", text);
        let tokens = lex(&file)?;
        if self.context.scopes.is_empty() {
            self.gain_scope();
        }
        let outer = std::mem::replace(&mut self.context.source, TokenSource::new(tokens));
        let value = self.scan_expression();
        self.context.source = outer;
        value
    }
}

/// Compile a source text held in memory.
pub fn compile_source(name: &str, text: &str, options: &CompileOptions) -> Result<Output> {
    let mut compiler = Compiler::new(options.clone());
    compiler.compile_unit(SourceFile::new(name, text))?;
    Ok(compiler.finish())
}

/// Compile a single source file.
pub fn compile_file(path: impl AsRef<Path>, options: &CompileOptions) -> Result<Output> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(CoreError::MissingSource(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    compile_source(&path.display().to_string(), &text, options)
}

/// Assemble the final programs: prologue, then Head, Neck, the Body
/// wrapped in the entry function, then Tail.
pub(crate) fn materialize(mut buffer: Buffer, tables: &Tables, targets: Targets) -> Output {
    buffer.write(
        Region::Tail,
        &Code::render(targets, |b| b.pick("", "\nmain();\n").to_string()),
    );
    let programs = targets
        .iter()
        .map(|backend| (backend, render(&buffer, tables, backend)))
        .collect();
    Output { programs }
}

fn render(buffer: &Buffer, tables: &Tables, backend: Backend) -> String {
    let mut out = String::new();
    match backend {
        Backend::Go => {
            out.push_str("package main\n\n");
            let imports: Vec<&str> = tables.imports(backend).collect();
            if !imports.is_empty() {
                for package in imports {
                    out.push_str(&format!("import {package:?}\n"));
                }
                out.push('\n');
            }
        }
        Backend::Js => out.push_str("\"use strict\";\n\n"),
    }
    out.push_str(buffer.region(Region::Head).as_str(backend));
    out.push_str(buffer.region(Region::Neck).as_str(backend));
    out.push_str(backend.pick("func main() {\n", "function main() {\n"));
    out.push_str(buffer.region(Region::Body).as_str(backend));
    out.push_str("}\n");
    out.push_str(buffer.region(Region::Tail).as_str(backend));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(targets: Targets) -> CompileOptions {
        CompileOptions {
            targets,
            ..CompileOptions::default()
        }
    }

    fn go(source: &str) -> String {
        let output = compile_source("test.sk", source, &CompileOptions::default())
            .unwrap_or_else(|e| panic!("compile failed: {e}"));
        output.program(Backend::Go).unwrap().to_string()
    }

    #[test]
    fn go_program_has_prologue_and_entry() {
        let program = go("print(5 + 3)\n");
        assert!(program.starts_with("package main\n\nimport \"fmt\"\n"));
        assert!(program.contains("func main() {\n\tfmt.Println((5 + 3))\n}\n"));
    }

    #[test]
    fn js_program_calls_main_at_the_end() {
        let output = compile_source("test.sk", "print(\"hi\")\n", &options(Targets::only(Backend::Js))).unwrap();
        let program = output.program(Backend::Js).unwrap();
        assert!(program.starts_with("\"use strict\";"));
        assert!(program.contains("\tconsole.log(\"hi\");\n"));
        assert!(program.trim_end().ends_with("main();"));
        assert!(output.program(Backend::Go).is_none());
    }

    #[test]
    fn both_backends_from_one_compile() {
        let output = compile_source("test.sk", "x = 2 ^ 3\n", &options(Targets::all())).unwrap();
        assert!(output.program(Backend::Go).unwrap().contains("func skald_pow(a, b int) int"));
        assert!(output.program(Backend::Js).unwrap().contains("function skald_pow(a, b)"));
    }

    #[test]
    fn helpers_are_emitted_once() {
        let program = go("a = 7 / 2\nb = 9 / 4\n");
        assert_eq!(program.matches("func skald_div").count(), 1);
    }

    #[test]
    fn undefined_name_reports_position() {
        let error = compile_source("test.sk", "x = 1\n  foo()\n", &CompileOptions::default()).unwrap_err();
        assert_eq!(error.kind(), Some(&ErrorKind::UndefinedName("foo".to_string())));
        let diagnostic = error.diagnostic().unwrap();
        assert_eq!(diagnostic.location.line, 2);
        assert_eq!(diagnostic.location.column, 3);
        assert!(error.to_string().starts_with("test.sk:2:3: foo is undefined"));
    }

    #[test]
    fn missing_file_is_reported() {
        let error = compile_file("/nonexistent/never.sk", &CompileOptions::default()).unwrap_err();
        assert!(matches!(error, CoreError::MissingSource(_)));
    }

    #[test]
    fn compiles_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.sk");
        fs::write(&path, "main {\n\tprint(\"hello\")\n}\n").unwrap();
        let output = compile_file(&path, &CompileOptions::default()).unwrap();
        let mut written = Vec::new();
        output.write_to(Backend::Go, &mut written).unwrap();
        let program = String::from_utf8(written).unwrap();
        assert!(program.contains("fmt.Println(\"hello\")"));
    }

    #[test]
    fn coerce_reports_type_mismatch() {
        let mut compiler = Compiler::new(CompileOptions::default());
        let value = compiler.evaluate("true").unwrap();
        let error = compiler
            .coerce(value, &Type::Array { size: None, subtype: None })
            .unwrap_err();
        assert!(matches!(error.kind(), Some(ErrorKind::TypeMismatch { .. })));
    }
}
