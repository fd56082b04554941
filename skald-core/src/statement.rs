//! Statements and blocks.
//!
//! A statement starts with a keyword or a name and runs to the end of
//! its line. Blocks are `{ ... }` across lines or `: statement` on the
//! same line; each block opens a scope.

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::backend::{Backend, Code, Targets};
use crate::builtins::find_builtin;
use crate::compiler::Compiler;
use crate::error::{CoreError, ErrorKind, Result};
use crate::expression::Expression;
use crate::lexer::{Token, TokenKind};
use crate::package::SOURCE_EXTENSION;
use crate::scope::Cleanup;
use crate::span::SourceFile;
use crate::types::Type;

/// Words that start statements or separate their parts.
pub const KEYWORDS: &[&str] = &[
    "main", "return", "if", "else", "for", "in", "to", "import", "alias", "thing", "true",
    "false",
];

/// Names generated code depends on in one of the targets.
const TARGET_WORDS: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "fallthrough", "func",
    "go", "goto", "interface", "map", "package", "range", "select", "struct", "switch", "type",
    "var", "nil", "append", "make", "copy", "cap", "int", "bool", "rune", "float64", "fmt",
    "strconv", "math", "os", "bufio", "function", "let", "new", "delete", "typeof", "class",
    "this", "void", "with", "yield", "await", "instanceof", "try", "catch", "finally", "throw",
    "do", "while", "export", "extends", "super", "null", "enum", "static", "arguments", "eval",
    "console", "process", "Math", "Array", "String", "Object", "Number",
];

impl Compiler<'_> {
    /// Statements up to the end of the current token stream.
    pub(crate) fn compile_statements(&mut self) -> Result<()> {
        loop {
            self.check_cancelled()?;
            let token = self.peek();
            match token.kind {
                TokenKind::Eof => return Ok(()),
                TokenKind::Newline => {
                    self.next_token();
                }
                _ => self.compile_statement()?,
            }
        }
    }

    pub(crate) fn compile_statement(&mut self) -> Result<()> {
        let token = self.next_token();
        if token.kind != TokenKind::Word {
            return Err(self.error_at(
                &token,
                ErrorKind::SyntaxExpectation {
                    expected: "a statement".to_string(),
                    found: token.describe(),
                },
            ));
        }
        match token.text.as_str() {
            "main" => self.compile_main(&token)?,
            "return" => self.compile_return(&token)?,
            "if" => self.compile_if()?,
            "for" => self.compile_for()?,
            "import" => self.compile_import(&token)?,
            "alias" => self.compile_alias()?,
            "thing" => self.compile_thing(&token)?,
            _ => self.compile_word_statement(&token)?,
        }
        self.end_statement()
    }

    /// A statement ends at a newline, a `;`, a closing brace or the end
    /// of input. A nested single-line block may have eaten the newline
    /// already.
    fn end_statement(&mut self) -> Result<()> {
        let token = self.peek();
        if token.kind == TokenKind::Newline || token.is(";") {
            self.next_token();
            return Ok(());
        }
        if token.kind == TokenKind::Eof || token.is("}") {
            return Ok(());
        }
        if self
            .context
            .source
            .last()
            .is_some_and(|last| last.kind == TokenKind::Newline)
        {
            return Ok(());
        }
        Err(self.error_at(
            &token,
            ErrorKind::SyntaxExpectation {
                expected: "end of line".to_string(),
                found: token.describe(),
            },
        ))
    }

    /// A block in a scope of its own. `bindings` are defined in that
    /// scope before the first statement, `cleanup` runs when it closes.
    pub(crate) fn compile_block(
        &mut self,
        cleanup: Option<Cleanup>,
        bindings: Vec<(String, Type)>,
    ) -> Result<()> {
        self.gain_scope();
        if let Some(cleanup) = cleanup {
            self.defer(cleanup);
        }
        for (name, ty) in bindings {
            self.bind(&name, ty);
            self.emit_line(&discard(self.targets(), &name));
        }
        self.compile_block_body()?;
        self.lose_scope()
    }

    fn compile_block_body(&mut self) -> Result<()> {
        if self.scan_if(":") {
            return self.compile_statement();
        }
        self.expect("{")?;
        loop {
            self.check_cancelled()?;
            let token = self.peek();
            if token.is("}") {
                self.next_token();
                return Ok(());
            }
            match token.kind {
                TokenKind::Newline => {
                    self.next_token();
                }
                TokenKind::Eof => {
                    return Err(self.error_at(
                        &token,
                        ErrorKind::SyntaxExpectation {
                            expected: "'}'".to_string(),
                            found: token.describe(),
                        },
                    ));
                }
                _ => self.compile_statement()?,
            }
        }
    }

    /// `main { ... }`: the program entry. In a package compile it waits
    /// until every other file is compiled.
    fn compile_main(&mut self, token: &Token) -> Result<()> {
        if !self.context.entry_allowed || self.context.scopes.len() != 1 {
            return Err(self.error_at(
                token,
                ErrorKind::Semantic("main must be at the top level of the program".to_string()),
            ));
        }
        if self.entry {
            return Err(self.error_at(
                token,
                ErrorKind::Semantic("main is defined more than once".to_string()),
            ));
        }
        self.entry = true;
        self.await_siblings(token)?;
        self.compile_block(None, Vec::new())
    }

    fn await_siblings(&mut self, token: &Token) -> Result<()> {
        let Some(gate) = self.gate else {
            return Ok(());
        };
        if !gate.claim_entry() {
            return Err(self.error_at(
                token,
                ErrorKind::Semantic("main is defined in more than one file".to_string()),
            ));
        }
        let file = token.position.file.name.clone();
        debug!(file = %file, "entry reached, waiting for the rest of the package");
        if self.park(|| gate.wait_for_siblings()) {
            Ok(())
        } else {
            Err(CoreError::Cancelled(file))
        }
    }

    fn compile_return(&mut self, token: &Token) -> Result<()> {
        if self.context.instantiating.is_none() {
            return Err(self.error_at(
                token,
                ErrorKind::Semantic("return outside of a concept".to_string()),
            ));
        }
        let next = self.peek();
        if next.ends_line() || next.is("}") || next.is(";") {
            self.emit_statement(&Code::text(self.targets(), "return"));
            return Ok(());
        }
        let value = self.scan_expression()?;
        if matches!(value.ty(), Type::Sequencer { .. }) {
            return Err(self.error_at(
                token,
                ErrorKind::Semantic("a sequencer cannot be returned".to_string()),
            ));
        }
        self.context.returns = Some(value.ty().clone());
        self.emit_statement(&value.code().map(|_, v| format!("return {v}")));
        Ok(())
    }

    /// `if c { } else if d { } else { }`
    fn compile_if(&mut self) -> Result<()> {
        let mut opener = "";
        loop {
            let condition = self.scan_expression()?;
            let condition = self.coerce(condition, &Type::Logical)?;
            let header = condition.code().map(|b, c| match b {
                Backend::Go => format!("{opener}if {c} {{"),
                Backend::Js => format!("{opener}if ({c}) {{"),
            });
            self.emit_line(&header);
            self.compile_block(None, Vec::new())?;
            if !self.scan_if("else") {
                break;
            }
            if self.scan_if("if") {
                opener = "} else ";
                continue;
            }
            self.emit_line(&Code::text(self.targets(), "} else {"));
            self.compile_block(None, Vec::new())?;
            break;
        }
        self.emit_line(&Code::text(self.targets(), "}"));
        Ok(())
    }

    /// `for x in collection { }` and `for i in a to b { }`
    fn compile_for(&mut self) -> Result<()> {
        let name = self.expect_word("a loop variable")?;
        self.check_definable(&name)?;
        self.expect("in")?;
        let start = self.scan_expression()?;
        let close = Cleanup::Close(Code::text(self.targets(), "}"));
        let n = name.text.as_str();

        if self.scan_if("to") {
            let start = self.coerce(start, &Type::Integer)?;
            let end = self.scan_expression()?;
            let end = self.coerce(end, &Type::Integer)?;
            let header = start.code().zip(end.code(), |b, s, e| match b {
                Backend::Go => format!("for {n} := {s}; {n} <= {e}; {n}++ {{"),
                Backend::Js => format!("for (let {n} = {s}; {n} <= {e}; {n}++) {{"),
            });
            self.emit_line(&header);
            return self.compile_block(Some(close), vec![(name.text.clone(), Type::Integer)]);
        }

        let ty = start.ty().clone();
        let Some(element) = ty.as_collection().and_then(|c| c.subtype().cloned()) else {
            return Err(self.error(ErrorKind::Semantic(format!(
                "cannot iterate over {}",
                ty.display()
            ))));
        };
        let header = start.code().map(|b, s| match b {
            Backend::Go => format!("for _, {n} := range {s} {{"),
            Backend::Js => format!("for (const {n} of {s}) {{"),
        });
        self.emit_line(&header);
        self.compile_block(Some(close), vec![(name.text.clone(), element)])
    }

    /// `import name`: compile `name.sk` or `name/name.sk` below the
    /// root directory once, as package `name`.
    fn compile_import(&mut self, token: &Token) -> Result<()> {
        let name = self.expect_word("a package name")?;
        if self.context.scopes.len() != 1 || self.context.instantiating.is_some() {
            return Err(self.error_at(
                token,
                ErrorKind::Semantic("import must be at the top level".to_string()),
            ));
        }
        if !self.tables.begin_package(&name.text) {
            debug!(package = %name.text, "already imported");
            return Ok(());
        }
        let Some(path) = self.locate_package(&name.text) else {
            return Err(self.error_at(
                &name,
                ErrorKind::UndefinedName(format!("package {}", name.text)),
            ));
        };
        debug!(package = %name.text, path = %path.display(), "importing");
        let text = fs::read_to_string(&path)?;
        let file = SourceFile::new(path.display().to_string(), text);
        self.compile_in_package(&file, &name.text)
    }

    fn locate_package(&self, name: &str) -> Option<PathBuf> {
        let root = &self.options.root;
        let file = format!("{name}.{SOURCE_EXTENSION}");
        [root.join(&file), root.join(name).join(&file)]
            .into_iter()
            .find(|path| path.is_file())
    }

    /// `alias name = tokens...`: `name` reads as the rest of the line.
    fn compile_alias(&mut self) -> Result<()> {
        let name = self.expect_word("an alias name")?;
        self.check_definable(&name)?;
        self.expect("=")?;
        let mut tokens = Vec::new();
        while !self.peek().ends_line() {
            tokens.push(self.next_token());
        }
        if tokens.is_empty() {
            let next = self.peek();
            return Err(self.error_at(
                &next,
                ErrorKind::SyntaxExpectation {
                    expected: "the aliased text".to_string(),
                    found: next.describe(),
                },
            ));
        }
        let package = self.context.package.clone();
        self.tables
            .package_mut(&package)
            .aliases
            .insert(name.text, tokens);
        Ok(())
    }

    /// `thing Name { field = value ... }`: the block is the body of the
    /// constructor, and every variable it defines becomes a field.
    fn compile_thing(&mut self, token: &Token) -> Result<()> {
        let name = self.expect_word("a thing name")?;
        self.check_definable(&name)?;
        if self.context.scopes.len() != 1 || self.context.instantiating.is_some() {
            return Err(self.error_at(
                token,
                ErrorKind::Semantic("things must be declared at the top level".to_string()),
            ));
        }

        // The constructor sees none of the program's variables.
        let outer = std::mem::take(&mut self.context.scopes);
        let compiled = self.flipped(|c| {
            c.compile_block(Some(Cleanup::FinishThing(name.text.clone())), Vec::new())?;
            let Some(Type::Thing(def)) = c.lookup_type(&name.text) else {
                return Err(c.error(ErrorKind::UndefinedName(name.text.clone())));
            };
            Ok(((), Some(def.constructor_signature(c))))
        });
        self.context.scopes = outer;
        compiled
    }

    /// Statements that start with a name: calls and assignments.
    fn compile_word_statement(&mut self, token: &Token) -> Result<()> {
        if let Some(tokens) = self.alias(&token.text) {
            self.expand_alias(token, tokens)?;
            return self.compile_statement();
        }
        let next = self.peek();
        if next.is("(") {
            return self.compile_call_statement(token);
        }
        if self.scan_if("=") {
            return self.compile_assignment(token);
        }
        if self.scan_if("[") {
            return self.compile_element_assignment(token);
        }
        if next.is(".") && self.variable(&token.text).is_none() && self.tables.has_package(&token.text) {
            self.next_token();
            let member = self.expect_word("a concept name")?;
            if !self.concept_exists(&token.text, &member.text) {
                return Err(self.error_at(
                    &member,
                    ErrorKind::UndefinedName(format!("{}.{}", token.text, member.text)),
                ));
            }
            let invocation = self.invoke_concept(&token.text, &member.text)?;
            self.emit_statement(&invocation.code);
            return Ok(());
        }
        if self.scan_if(".") {
            return self.compile_field_assignment(token);
        }
        if self.variable(&token.text).is_none() {
            return Err(self.error_at(token, ErrorKind::UndefinedName(token.text.clone())));
        }
        Err(self.error_at(
            &next,
            ErrorKind::SyntaxExpectation {
                expected: "'=', '(' or '['".to_string(),
                found: next.describe(),
            },
        ))
    }

    fn compile_call_statement(&mut self, token: &Token) -> Result<()> {
        if self.is_definition_site(token) {
            return self.skip_definition();
        }
        let package = self.context.package.clone();
        let invocation = if let Some(builtin) = find_builtin(&token.text) {
            self.invoke_builtin(builtin, token)?
        } else if self.concept_exists(&package, &token.text) {
            self.invoke_concept(&package, &token.text)?
        } else if let Some(ty) = self.variable(&token.text) {
            self.expect("(")?;
            let args = self.scan_call_arguments()?;
            let callee = Expression::new(ty.clone(), Code::text(self.targets(), &token.text));
            let Some(invocation) = ty.call(self, &callee, args)? else {
                return Err(self.error_at(
                    token,
                    ErrorKind::Semantic(format!("{} cannot be called", ty.display())),
                ));
            };
            invocation
        } else {
            return Err(self.error_at(token, ErrorKind::UndefinedName(token.text.clone())));
        };
        self.emit_statement(&invocation.code);
        Ok(())
    }

    /// `name = value`: defines `name` on first assignment, assigns with
    /// a cast to its type afterwards.
    fn compile_assignment(&mut self, token: &Token) -> Result<()> {
        let name = token.text.as_str();
        let value = self.scan_expression()?;
        if let Some(ty) = self.variable(name) {
            let value = self.coerce(value, &ty)?;
            let value = ty.copy(self, value)?;
            self.emit_statement(&value.code().map(|_, v| format!("{name} = {v}")));
            return Ok(());
        }

        self.check_definable(token)?;
        if matches!(value.ty(), Type::Sequencer { .. } | Type::Undefined) {
            return Err(self.error_at(
                token,
                ErrorKind::Semantic(format!(
                    "cannot define {name} from a value of type {}",
                    value.ty().display()
                )),
            ));
        }
        let ty = value.ty().clone();
        let value = ty.copy(self, value)?;
        let declaration = value.code().map(|b, v| match b {
            Backend::Go => format!("var {name} = {v}"),
            Backend::Js => format!("let {name} = {v}"),
        });
        self.emit_statement(&declaration);
        self.emit_line(&discard(self.targets(), name));
        self.bind(name, ty);
        Ok(())
    }

    /// `name[index] = value` or `name[+] = value`, after the `[`.
    fn compile_element_assignment(&mut self, token: &Token) -> Result<()> {
        let Some(ty) = self.variable(&token.text) else {
            return Err(self.error_at(token, ErrorKind::UndefinedName(token.text.clone())));
        };
        let indices = self.scan_index_list()?;
        self.expect("=")?;
        let value = self.scan_expression()?;
        let Some(collection) = ty.as_collection() else {
            return Err(self.error_at(
                token,
                ErrorKind::Semantic(format!("{} cannot be indexed", ty.display())),
            ));
        };
        let this = Expression::new(ty.clone(), Code::text(self.targets(), &token.text));
        collection.modify(self, &this, indices, value)
    }

    /// `name.field = value`, after the `.`.
    fn compile_field_assignment(&mut self, token: &Token) -> Result<()> {
        let Some(ty) = self.variable(&token.text) else {
            return Err(self.error_at(token, ErrorKind::UndefinedName(token.text.clone())));
        };
        let field = self.expect_word("a field name")?;
        self.expect("=")?;
        let value = self.scan_expression()?;
        let Type::Thing(def) = &ty else {
            return Err(self.error_at(
                token,
                ErrorKind::Semantic(format!("{} has no fields", ty.display())),
            ));
        };
        let Some(field_ty) = def.fields.get(&field.text).cloned() else {
            return Err(self.error_at(
                &field,
                ErrorKind::UndefinedName(format!("{}.{}", def.name, field.text)),
            ));
        };
        let value = self.coerce(value, &field_ty)?;
        let target = format!("{}.{}", token.text, field.text);
        self.emit_statement(&value.code().map(|_, v| format!("{target} = {v}")));
        Ok(())
    }

    /// Rejects names that would clash with keywords, types, builtins or
    /// what the targets reserve.
    pub(crate) fn check_definable(&self, token: &Token) -> Result<()> {
        let name = token.text.as_str();
        let reserved = KEYWORDS.contains(&name)
            || TARGET_WORDS.contains(&name)
            || Type::builtin(name).is_some()
            || find_builtin(name).is_some()
            || name.starts_with("skald_")
            || name.starts_with("new_");
        if reserved {
            return Err(self.error_at(token, ErrorKind::Semantic(format!("{name} is reserved"))));
        }
        if self.lookup_type(name).is_some() {
            return Err(self.error_at(
                token,
                ErrorKind::Semantic(format!("{name} is already a type")),
            ));
        }
        Ok(())
    }
}

/// Go rejects unused locals; `_ = name` counts as a use.
fn discard(targets: Targets, name: &str) -> Code {
    Code::render(targets, |b| match b {
        Backend::Go => format!("_ = {name}"),
        Backend::Js => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{CompileOptions, compile_source};

    fn go(source: &str) -> String {
        compile_source("statements.sk", source, &CompileOptions::default())
            .unwrap_or_else(|e| panic!("compile failed: {e}"))
            .program(Backend::Go)
            .unwrap()
            .to_string()
    }

    fn js(source: &str) -> String {
        let options = CompileOptions {
            targets: Targets::only(Backend::Js),
            ..CompileOptions::default()
        };
        compile_source("statements.sk", source, &options)
            .unwrap_or_else(|e| panic!("compile failed: {e}"))
            .program(Backend::Js)
            .unwrap()
            .to_string()
    }

    fn error(source: &str) -> CoreError {
        compile_source("statements.sk", source, &CompileOptions::default()).unwrap_err()
    }

    #[test]
    fn first_assignment_defines() {
        let program = go("x = 5\nx = 7\n");
        assert!(program.contains("\tvar x = 5\n\t_ = x\n\tx = 7\n"));
        let program = js("x = 5\nx = 7\n");
        assert!(program.contains("\tlet x = 5;\n\tx = 7;\n"));
    }

    #[test]
    fn later_assignments_are_cast() {
        let program = go("y = 2.5\nx = 5\nx = y\n");
        assert!(program.contains("\tx = int(y)\n"));
        let failure = error("x = 5\nx = [1, 2]\n");
        assert!(matches!(failure.kind(), Some(ErrorKind::TypeMismatch { .. })));
    }

    #[test]
    fn if_else_chain() {
        let program = go("x = 3\nif x > 2 {\n\tprint(1)\n} else if x > 1 {\n\tprint(2)\n} else {\n\tprint(3)\n}\n");
        assert!(program.contains(
            "\tif (x > 2) {\n\t\tfmt.Println(1)\n\t} else if (x > 1) {\n\t\tfmt.Println(2)\n\t} else {\n\t\tfmt.Println(3)\n\t}\n"
        ));
    }

    #[test]
    fn conditions_must_be_logical() {
        let failure = error("if \"yes\" {\n}\n");
        assert!(matches!(failure.kind(), Some(ErrorKind::TypeMismatch { .. })));
    }

    #[test]
    fn counting_loop() {
        let program = go("for i in 1 to 3: print(i)\n");
        assert!(program.contains("\tfor i := 1; i <= 3; i++ {\n\t\t_ = i\n\t\tfmt.Println(i)\n\t}\n"));
        let program = js("for i in 1 to 3: print(i)\n");
        assert!(program.contains("\tfor (let i = 1; i <= 3; i++) {\n\t\tconsole.log(i);\n\t}\n"));
    }

    #[test]
    fn loop_over_a_collection() {
        let program = go("for s in [\"a\", \"b\"] {\n\tprint(s)\n}\n");
        assert!(program.contains("\tfor _, s := range []string{\"a\", \"b\"} {\n"));
        let program = js("for c in \"hey\": out(c)\n");
        assert!(program.contains("\tfor (const c of \"hey\") {\n"));
    }

    #[test]
    fn lists_grow_with_sequencer() {
        let program = go("xs = list.integer()\nxs[+] = 4\nxs[0] = 1\n");
        assert!(program.contains("\tvar xs = make([]int, 1)\n"));
        assert!(program.contains("\txs = append(xs, 4)\n"));
        assert!(program.contains("\tif len(xs) > 0 { xs[skald_wrap(0, len(xs))] = 1 }\n"));
    }

    #[test]
    fn reassignment_copies_lists_and_things() {
        let source = "thing Cell {\n\tv = 0\n}\nxs = list.integer()\nys = list.integer()\nxs = ys\na = Cell()\nb = Cell()\na = b\n";
        let program = go(source);
        assert!(program.contains("\txs = append([]int(nil), ys...)\n"));
        assert!(program.contains("\ta = b\n"));
        let program = js(source);
        assert!(program.contains("\txs = [...ys];\n"));
        assert!(program.contains("\ta = { ...b };\n"));
    }

    #[test]
    fn writes_to_an_empty_list_are_skipped() {
        let program = js("xs = list.integer()\ni = 3\nxs[i] = 1\n");
        assert!(program.contains("\tif (xs.length > 0) { xs[skald_wrap(i, xs.length)] = 1; }\n"));
    }

    #[test]
    fn things_build_structs_and_constructors() {
        let program = go("thing Point {\n\tx = 0\n\tname = \"origin\"\n}\np = Point()\np.x = 3\nprint(p.x)\n");
        assert!(program.contains("type Point struct {\n\tx int\n\tname string\n}\n"));
        let constructor = program.find("func new_Point() Point {\n").unwrap();
        let fields = program.find("\treturn Point{x: x, name: name}\n}").unwrap();
        assert!(constructor < fields);
        assert!(program.contains("\tvar p = new_Point()\n"));
        assert!(program.contains("\tp.x = 3\n"));
        assert!(program.contains("\tfmt.Println(p.x)\n"));
    }

    #[test]
    fn things_in_javascript_are_objects() {
        let program = js("thing Pair {\n\ta = 1\n\tb = 2\n}\nq = Pair()\n");
        assert!(program.contains("function new_Pair() {\n\tlet a = 1;\n\tlet b = 2;\n\treturn { a: a, b: b };\n}"));
    }

    #[test]
    fn aliases_expand_in_place() {
        let program = go("alias greet = print\ngreet(\"hi\")\nalias answer = 6 * 7\nx = answer\n");
        assert!(program.contains("\tfmt.Println(\"hi\")\n"));
        assert!(program.contains("\tvar x = (6 * 7)\n"));
    }

    #[test]
    fn main_block_compiles_into_the_entry() {
        let program = go("main {\n\tprint(1)\n}\n");
        assert!(program.contains("func main() {\n\t\tfmt.Println(1)\n}\n"));
        let failure = error("main {\n}\nmain {\n}\n");
        assert!(failure.to_string().contains("main is defined more than once"));
    }

    #[test]
    fn unused_concepts_are_not_emitted() {
        let program = go("unused(x): return x\nprint(1)\n");
        assert!(!program.contains("unused"));
    }

    #[test]
    fn reserved_names_are_rejected() {
        assert!(error("func = 3\n").to_string().contains("func is reserved"));
        assert!(error("integer = 3\n").to_string().contains("integer is reserved"));
    }

    #[test]
    fn return_needs_a_concept() {
        assert!(error("return 1\n").to_string().contains("return outside of a concept"));
    }

    #[test]
    fn statements_end_at_the_line() {
        let failure = error("x = 1 2\n");
        assert!(matches!(failure.kind(), Some(ErrorKind::UndefinedOperator(_))));
        let failure = error("print(1) print(2)\n");
        assert!(matches!(
            failure.kind(),
            Some(ErrorKind::SyntaxExpectation { .. })
        ));
    }

    #[test]
    fn imports_compile_a_package_once() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("geometry.sk"), "double(x): return x * 2\n").unwrap();
        let options = CompileOptions {
            root: dir.path().to_path_buf(),
            ..CompileOptions::default()
        };
        let output = compile_source(
            "main.sk",
            "import geometry\nimport geometry\nprint(geometry.double(4))\n",
            &options,
        )
        .unwrap();
        let program = output.program(Backend::Go).unwrap();
        assert_eq!(program.matches("func geometry_double(x int) int {").count(), 1);
        assert!(program.contains("fmt.Println(geometry_double(4))"));
    }

    #[test]
    fn missing_package_is_undefined() {
        let failure = error("import nowhere\n");
        assert_eq!(
            failure.kind(),
            Some(&ErrorKind::UndefinedName("package nowhere".to_string()))
        );
    }
}
