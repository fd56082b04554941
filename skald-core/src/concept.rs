//! Concepts: generic functions instantiated on first use.
//!
//! Definitions are collected by a declaration pass before a file is
//! compiled, so a concept may be called above the line that defines it.
//! The first call compiles the captured body with the argument types of
//! that call and fixes the signature; later calls reuse it.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::backend::{Backend, Code};
use crate::buffer::Region;
use crate::cache::Cache;
use crate::compiler::Compiler;
use crate::error::{ErrorKind, Result};
use crate::expression::{Expression, Invocation};
use crate::lexer::{Token, TokenKind};
use crate::scanner::TokenSource;
use crate::scope::{Context, Scope};
use crate::span::Position;
use crate::statement::KEYWORDS;
use crate::types::Type;

/// One declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub binder: String,
    /// Arguments are cast to this type when given.
    pub filter: Option<Type>,
    /// Binds every remaining argument as a sequence. Only the last
    /// parameter may be variadic.
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConceptState {
    Defined,
    Instantiating,
    Instantiated { returns: Option<Type> },
}

#[derive(Debug, Clone)]
pub struct Concept {
    pub name: String,
    pub package: String,
    pub arguments: Vec<Argument>,
    pub cache: Cache,
    pub state: ConceptState,
    /// How many times the body was compiled. Never more than one.
    pub instantiations: usize,
    pub(crate) defined_at: Position,
}

impl Concept {
    /// The name generated code calls the concept by.
    pub fn symbol(&self) -> String {
        if self.package.is_empty() {
            self.name.clone()
        } else {
            format!("{}_{}", self.package, self.name)
        }
    }

    fn fixed_arity(&self) -> usize {
        self.arguments.iter().filter(|a| !a.variadic).count()
    }

    fn is_variadic(&self) -> bool {
        self.arguments.last().is_some_and(|a| a.variadic)
    }

    fn expected_arity(&self) -> String {
        let fixed = self.fixed_arity();
        if self.is_variadic() {
            format!("at least {fixed}")
        } else {
            fixed.to_string()
        }
    }
}

/// Index of the `)` closing the `(` at `open`.
fn matching_paren(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (index, token) in tokens.iter().enumerate().skip(open) {
        if token.kind == TokenKind::Eof {
            return None;
        }
        if token.is("(") {
            depth += 1;
        } else if token.is(")") {
            depth -= 1;
            if depth == 0 {
                return Some(index);
            }
        }
    }
    None
}

impl Compiler<'_> {
    /// Declaration pass: register every top-level `name(params) { ... }`
    /// of `tokens` with the current package.
    pub(crate) fn declare(&mut self, tokens: &Arc<[Token]>) -> Result<()> {
        let mut depth = 0usize;
        let mut index = 0;
        while let Some(token) = tokens.get(index) {
            let line_start = index == 0 || tokens[index - 1].kind == TokenKind::Newline;
            if depth == 0
                && line_start
                && token.is_word()
                && !KEYWORDS.contains(&token.text.as_str())
                && tokens.get(index + 1).is_some_and(|t| t.is("("))
                && matching_paren(tokens, index + 1)
                    .and_then(|close| tokens.get(close + 1))
                    .is_some_and(|t| t.is("{") || t.is(":"))
            {
                index = self.declare_concept(tokens, index)?;
                continue;
            }
            if token.is("{") {
                depth += 1;
            } else if token.is("}") {
                depth = depth.saturating_sub(1);
            }
            index += 1;
        }
        Ok(())
    }

    /// Declare the concept named at `start`. Returns the index just past
    /// its body.
    fn declare_concept(&mut self, tokens: &Arc<[Token]>, start: usize) -> Result<usize> {
        let name = tokens[start].clone();
        self.check_definable(&name)?;
        let package = self.context.package.clone();
        if self.concept_exists(&package, &name.text) {
            return Err(self.error_at(
                &name,
                ErrorKind::Semantic(format!("{} is already defined", name.text)),
            ));
        }

        let source = TokenSource::from_shared(Arc::clone(tokens), start + 2);
        self.push_context(Context::new(source, package.clone()));
        let scanned = self.scan_definition();
        self.pop_context();
        let (arguments, cache, resume) = scanned?;

        debug!(
            concept = %name.text,
            package = %package,
            parameters = arguments.len(),
            "concept declared"
        );
        let concept = Concept {
            name: name.text.clone(),
            package: package.clone(),
            arguments,
            cache,
            state: ConceptState::Defined,
            instantiations: 0,
            defined_at: name.position.clone(),
        };
        self.tables
            .package_mut(&package)
            .concepts
            .insert(name.text, concept);
        Ok(resume)
    }

    fn scan_definition(&mut self) -> Result<(Vec<Argument>, Cache, usize)> {
        let arguments = self.scan_parameters()?;
        let cache = Cache::capture(&mut self.context.source)?;
        Ok((arguments, cache, self.context.source.cursor()))
    }

    /// Parameters after the opening `(`, up to and including the `)`.
    /// Accepted forms are `name`, `name(type)`, `type(a, b)` and a
    /// trailing `...` on the last one.
    pub(crate) fn scan_parameters(&mut self) -> Result<Vec<Argument>> {
        let mut arguments: Vec<Argument> = Vec::new();
        if self.scan_if(")") {
            return Ok(arguments);
        }
        loop {
            let word = self.expect_word("a parameter name")?;
            if let Some(base) = self.lookup_type(&word.text) {
                let filter = self.scan_type_specification(base)?;
                self.expect("(")?;
                loop {
                    let binder = self.scan_binder()?;
                    let variadic = self.scan_if("...");
                    arguments.push(Argument {
                        binder,
                        filter: Some(filter.clone()),
                        variadic,
                    });
                    if !self.scan_if(",") {
                        self.expect(")")?;
                        break;
                    }
                }
            } else {
                self.check_definable(&word)?;
                let mut variadic = self.scan_if("...");
                let filter = if self.scan_if("(") {
                    let type_name = self.expect_word("a type name")?;
                    let Some(base) = self.lookup_type(&type_name.text) else {
                        return Err(self.error_at(
                            &type_name,
                            ErrorKind::UndefinedName(type_name.text.clone()),
                        ));
                    };
                    let filter = self.scan_type_specification(base)?;
                    self.expect(")")?;
                    Some(filter)
                } else {
                    None
                };
                variadic |= self.scan_if("...");
                arguments.push(Argument {
                    binder: word.text,
                    filter,
                    variadic,
                });
            }
            if !self.scan_if(",") {
                self.expect(")")?;
                break;
            }
        }

        if let Some(position) = arguments.iter().position(|a| a.variadic) {
            if position + 1 != arguments.len() {
                return Err(self.error(ErrorKind::Semantic(format!(
                    "variadic parameter {} must come last",
                    arguments[position].binder
                ))));
            }
        }
        for (index, argument) in arguments.iter().enumerate() {
            if arguments[..index].iter().any(|a| a.binder == argument.binder) {
                return Err(self.error(ErrorKind::Semantic(format!(
                    "parameter {} is declared twice",
                    argument.binder
                ))));
            }
        }
        Ok(arguments)
    }

    fn scan_binder(&mut self) -> Result<String> {
        let binder = self.expect_word("a parameter name")?;
        self.check_definable(&binder)?;
        Ok(binder.text)
    }

    pub(crate) fn concept_exists(&self, package: &str, name: &str) -> bool {
        self.tables.concept(package, name).is_some()
    }

    /// True when `token` is the name of a definition found by the
    /// declaration pass, as opposed to a call.
    pub(crate) fn is_definition_site(&self, token: &Token) -> bool {
        self.tables
            .concept(&self.context.package, &token.text)
            .is_some_and(|concept| concept.defined_at.same(&token.position))
    }

    /// Step over a definition during the compile pass: the parameter
    /// list and the captured body.
    pub(crate) fn skip_definition(&mut self) -> Result<()> {
        let open = self.expect("(")?;
        let mut depth = 1usize;
        while depth > 0 {
            let token = self.next_token();
            if token.kind == TokenKind::Eof {
                return Err(self.error_at(
                    &open,
                    ErrorKind::SyntaxExpectation {
                        expected: "')'".to_string(),
                        found: token.describe(),
                    },
                ));
            }
            if token.is("(") {
                depth += 1;
            } else if token.is(")") {
                depth -= 1;
            }
        }
        Cache::capture(&mut self.context.source)?;
        Ok(())
    }

    /// `name(args)` where `name` is a concept of `package`. The `(` has
    /// not been consumed yet.
    pub(crate) fn invoke_concept(&mut self, package: &str, name: &str) -> Result<Invocation> {
        let Some(concept) = self.tables.concept(package, name).cloned() else {
            return Err(self.error(ErrorKind::UndefinedName(name.to_string())));
        };
        self.expect("(")?;
        let args = self.scan_call_arguments()?;
        let (parameters, passed) = self.bind_arguments(&concept, args)?;
        let returns = self.instantiate(&concept, parameters)?;

        let symbol = concept.symbol();
        let list = Code::join(self.targets(), passed.iter().map(Expression::code), ", ");
        Ok(Invocation::new(
            list.map(|_, args| format!("{symbol}({args})")),
            returns,
        ))
    }

    /// Check the call against the parameter list and apply filters.
    /// Returns the parameter types of this call and the argument values.
    fn bind_arguments(
        &mut self,
        concept: &Concept,
        args: Vec<Expression>,
    ) -> Result<(Vec<Type>, Vec<Expression>)> {
        let fixed = concept.fixed_arity();
        let arity_matches = if concept.is_variadic() {
            args.len() >= fixed
        } else {
            args.len() == fixed
        };
        if !arity_matches {
            return Err(self.error(ErrorKind::ArityMismatch {
                name: concept.name.clone(),
                expected: concept.expected_arity(),
                given: args.len(),
            }));
        }

        let mut parameters = Vec::with_capacity(concept.arguments.len());
        let mut passed = Vec::with_capacity(args.len());
        let mut args = args.into_iter();
        for (argument, value) in concept.arguments[..fixed].iter().zip(args.by_ref()) {
            let value = match &argument.filter {
                Some(filter) => self.coerce(value, filter)?,
                None => value,
            };
            parameters.push(value.ty().clone());
            passed.push(value);
        }

        if let Some(argument) = concept.arguments.last().filter(|a| a.variadic) {
            let rest: Vec<Expression> = args.collect();
            let element = match &argument.filter {
                Some(filter) => filter.clone(),
                None => match rest.first() {
                    Some(first) => first.ty().clone(),
                    None => {
                        return Err(self.error(ErrorKind::Semantic(format!(
                            "cannot infer the type of {} from an empty argument list",
                            argument.binder
                        ))));
                    }
                },
            };
            for value in rest {
                let value = self.coerce(value, &element)?;
                passed.push(value);
            }
            parameters.push(Type::Sequence {
                size: None,
                subtype: Some(Box::new(element)),
            });
        }
        Ok((parameters, passed))
    }

    /// The return type of `concept`, compiling its body first if this is
    /// the first call.
    fn instantiate(&mut self, concept: &Concept, parameters: Vec<Type>) -> Result<Option<Type>> {
        let symbol = concept.symbol();
        let state = self
            .tables
            .concept(&concept.package, &concept.name)
            .map(|c| c.state.clone());
        match state {
            Some(ConceptState::Instantiated { returns }) => {
                trace!(concept = %symbol, "instantiation reused");
                return Ok(returns);
            }
            Some(ConceptState::Instantiating) => {
                trace!(concept = %symbol, "recursive call");
                return Ok(self.pending_return(&symbol));
            }
            Some(ConceptState::Defined) | None => {}
        }

        if let Some(stored) = self.tables.concept_mut(&concept.package, &concept.name) {
            stored.state = ConceptState::Instantiating;
            stored.instantiations += 1;
        }
        debug!(
            concept = %symbol,
            file = %concept.cache.file,
            line = concept.cache.line,
            "instantiating"
        );

        let mut scope = Scope::default();
        for (argument, ty) in concept.arguments.iter().zip(&parameters) {
            scope.insert(argument.binder.as_str(), ty.clone());
        }
        let mut context = Context::new(concept.cache.replay(), concept.package.clone());
        context.scopes.push(scope);
        context.instantiating = Some(symbol.clone());

        let returns = self.flipped(|c| {
            let returns = c.compile_body(context)?;
            c.write(Region::Body, &Code::text(c.targets(), "}\n\n"));
            let signature = c.signature(concept, &parameters, returns.as_ref())?;
            Ok((returns, Some(signature)))
        })?;

        if let Some(stored) = self.tables.concept_mut(&concept.package, &concept.name) {
            stored.state = ConceptState::Instantiated {
                returns: returns.clone(),
            };
        }
        Ok(returns)
    }

    /// Compile a concept body in `context`. Returns the type of its last
    /// `return`.
    fn compile_body(&mut self, context: Context) -> Result<Option<Type>> {
        self.push_context(context);
        let compiled = self
            .compile_statements()
            .and_then(|()| self.lose_scope());
        let context = self.pop_context();
        compiled?;
        Ok(context.returns)
    }

    /// The return type recorded so far by the body of `symbol`, which is
    /// still being compiled further up the frame stack.
    fn pending_return(&self, symbol: &str) -> Option<Type> {
        std::iter::once(&self.context)
            .chain(self.frames.iter().rev())
            .find(|context| context.instantiating.as_deref() == Some(symbol))
            .and_then(|context| context.returns.clone())
    }

    /// The function header of an instantiation.
    fn signature(
        &self,
        concept: &Concept,
        parameters: &[Type],
        returns: Option<&Type>,
    ) -> Result<Code> {
        let targets = self.targets();
        let symbol = concept.symbol();
        let bound: Vec<(&Argument, &Type)> = concept.arguments.iter().zip(parameters).collect();

        let mut go_parameters = Vec::new();
        let mut go_returns = String::new();
        if targets.enabled(Backend::Go) {
            for (argument, ty) in &bound {
                let native = match (argument.variadic, ty.subtype()) {
                    (true, Some(element)) => format!("...{}", self.go_type(element)?),
                    _ => self.go_type(ty)?,
                };
                go_parameters.push(format!("{} {native}", argument.binder));
            }
            if let Some(returns) = returns {
                go_returns = format!(" {}", self.go_type(returns)?);
            }
        }

        let js_doc = |ty: &Type| ty.native_name(Backend::Js).unwrap_or_else(|| "*".to_string());
        let mut doc: Vec<String> = bound
            .iter()
            .map(|(argument, ty)| match (argument.variadic, ty.subtype()) {
                (true, Some(element)) => {
                    format!("@param {{...{}}} {}", js_doc(element), argument.binder)
                }
                _ => format!("@param {{{}}} {}", js_doc(ty), argument.binder),
            })
            .collect();
        if let Some(returns) = returns {
            doc.push(format!("@returns {{{}}}", js_doc(returns)));
        }
        let js_parameters: Vec<String> = bound
            .iter()
            .map(|(argument, _)| {
                if argument.variadic {
                    format!("...{}", argument.binder)
                } else {
                    argument.binder.clone()
                }
            })
            .collect();

        Ok(Code::render(targets, |b| match b {
            Backend::Go => format!(
                "func {symbol}({}){go_returns} {{\n",
                go_parameters.join(", ")
            ),
            Backend::Js => {
                let doc = if doc.is_empty() {
                    String::new()
                } else {
                    format!("/** {} */\n", doc.join(" "))
                };
                format!("{doc}function {symbol}({}) {{\n", js_parameters.join(", "))
            }
        }))
    }

    /// A zero-parameter concept of the current package referenced by
    /// name: its symbol and return type.
    pub(crate) fn function_value(&mut self, name: &str) -> Result<Option<(String, Option<Type>)>> {
        let package = self.context.package.clone();
        let Some(concept) = self.tables.concept(&package, name).cloned() else {
            return Ok(None);
        };
        if !concept.arguments.is_empty() {
            return Ok(None);
        }
        let returns = self.instantiate(&concept, Vec::new())?;
        Ok(Some((concept.symbol(), returns)))
    }

    /// State of a concept of the root package.
    pub fn concept_state(&self, name: &str) -> Option<(ConceptState, usize)> {
        self.tables
            .concept("", name)
            .map(|concept| (concept.state.clone(), concept.instantiations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Targets;
    use crate::compiler::{CompileOptions, compile_source};
    use crate::span::SourceFile;

    fn compiled(source: &str) -> Compiler<'static> {
        let mut compiler = Compiler::new(CompileOptions::default());
        compiler
            .compile_unit(SourceFile::new("concepts.sk", source))
            .unwrap_or_else(|e| panic!("compile failed: {e}"));
        compiler
    }

    fn go(source: &str) -> String {
        compile_source("concepts.sk", source, &CompileOptions::default())
            .unwrap_or_else(|e| panic!("compile failed: {e}"))
            .program(Backend::Go)
            .unwrap()
            .to_string()
    }

    #[test]
    fn declaration_pass_finds_definitions() {
        let compiler = compiled("add(a, b) {\n\treturn a + b\n}\nshout(x): print(x)\n");
        assert_eq!(compiler.concept_state("add"), Some((ConceptState::Defined, 0)));
        assert_eq!(compiler.concept_state("shout"), Some((ConceptState::Defined, 0)));
    }

    #[test]
    fn first_call_fixes_the_signature() {
        let mut compiler = compiled("add(a, b) {\n\treturn a + b\n}\n");
        let first = compiler.evaluate("add(1, 2)").unwrap();
        assert_eq!(*first.ty(), Type::Integer);
        let second = compiler.evaluate("add(3, 4)").unwrap();
        assert_eq!(*second.ty(), Type::Integer);
        assert_eq!(second.code().as_str(Backend::Go), "add(3, 4)");
        assert_eq!(
            compiler.concept_state("add"),
            Some((
                ConceptState::Instantiated {
                    returns: Some(Type::Integer)
                },
                1
            ))
        );
    }

    #[test]
    fn later_calls_reuse_the_first_signature() {
        let mut compiler = compiled("add(a, b) {\n\treturn a + b\n}\n");
        compiler.evaluate("add(1, 2)").unwrap();
        // The memoized instantiation does not recompile for strings.
        let value = compiler.evaluate("add(\"a\", \"b\")").unwrap();
        assert_eq!(*value.ty(), Type::Integer);
        assert_eq!(compiler.concept_state("add").map(|(_, n)| n), Some(1));
    }

    #[test]
    fn signature_precedes_body() {
        let program = go("add(a, b) {\n\treturn a + b\n}\nprint(add(1, 2))\n");
        let signature = program.find("func add(a int, b int) int {").unwrap();
        let body = program.find("\treturn (a + b)\n}").unwrap();
        assert!(signature < body);
        assert!(program.find("func main()").unwrap() > body);
    }

    #[test]
    fn string_parameter_gives_a_string_function() {
        let source = "greeting(x(string)) {\n\treturn x\n}\n";
        let program = go(&format!("{source}print(greeting(\"hi\"))\n"));
        assert!(program.contains("func greeting(x string) string {\n\treturn x\n}"));
        let mut compiler = compiled(source);
        let value = compiler.evaluate("greeting(\"hi\")").unwrap();
        assert_eq!(*value.ty(), Type::String);
        assert_eq!(value.code().as_str(Backend::Go), "greeting(\"hi\")");
    }

    #[test]
    fn filters_cast_arguments() {
        let mut compiler = compiled("greeting(x(string)) {\n\treturn \"hello, \" + x\n}\n");
        let value = compiler.evaluate("greeting(42)").unwrap();
        assert_eq!(*value.ty(), Type::String);
        assert_eq!(value.code().as_str(Backend::Go), "greeting(strconv.Itoa(42))");
    }

    #[test]
    fn grouped_filters_apply_to_each_binder() {
        let mut compiler = compiled("pair(number(a, b)): return a * b\n");
        let value = compiler.evaluate("pair(1, 2)").unwrap();
        assert_eq!(*value.ty(), Type::Number);
        assert_eq!(value.code().as_str(Backend::Go), "pair(float64(1), float64(2))");
    }

    #[test]
    fn arity_is_checked() {
        let mut compiler = compiled("add(a, b): return a + b\n");
        let error = compiler.evaluate("add(1)").unwrap_err();
        assert_eq!(
            error.kind(),
            Some(&ErrorKind::ArityMismatch {
                name: "add".to_string(),
                expected: "2".to_string(),
                given: 1
            })
        );
    }

    #[test]
    fn variadic_parameters_collect_the_rest() {
        let program = go("sum(first, rest...) {\n\ttotal = first\n\tfor x in rest: total = total + x\n\treturn total\n}\nprint(sum(1, 2, 3))\n");
        assert!(program.contains("func sum(first int, rest ...int) int {"));
        assert!(program.contains("fmt.Println(sum(1, 2, 3))"));
    }

    #[test]
    fn variadic_must_be_last() {
        let error = compile_source(
            "concepts.sk",
            "bad(rest..., last): return last\n",
            &CompileOptions::default(),
        )
        .unwrap_err();
        assert!(error.to_string().contains("must come last"));
    }

    #[test]
    fn recursion_sees_the_pending_return_type() {
        let program = go(
            "fact(n) {\n\tif n < 2 {\n\t\treturn 1\n\t}\n\treturn n * fact(n - 1)\n}\nprint(fact(5))\n",
        );
        assert!(program.contains("func fact(n int) int {"));
        assert!(program.contains("return (n * fact((n - 1)))"));
    }

    #[test]
    fn calls_may_precede_definitions() {
        let program = go("print(twice(4))\ntwice(x): return x * 2\n");
        assert!(program.contains("func twice(x int) int {"));
    }

    #[test]
    fn concepts_without_results_cannot_be_values() {
        let mut compiler = compiled("shout(x): print(x)\n");
        let error = compiler.evaluate("shout(1)").unwrap_err();
        assert_eq!(
            error.kind(),
            Some(&ErrorKind::NoReturnValue("shout".to_string()))
        );
    }

    #[test]
    fn zero_parameter_concepts_are_function_values() {
        let mut compiler = compiled("seven(): return 7\n");
        let value = compiler.evaluate("seven").unwrap();
        assert_eq!(value.code().as_str(Backend::Go), "seven");
        assert!(matches!(value.ty(), Type::Function { .. }));
        let called = compiler.evaluate("seven()").unwrap();
        assert_eq!(*called.ty(), Type::Integer);
    }

    #[test]
    fn javascript_signature_carries_doc_types() {
        let output = compile_source(
            "concepts.sk",
            "add(a, b): return a + b\nprint(add(1, 2))\n",
            &CompileOptions {
                targets: Targets::only(Backend::Js),
                ..CompileOptions::default()
            },
        )
        .unwrap();
        let program = output.program(Backend::Js).unwrap();
        assert!(program.contains(
            "/** @param {number} a @param {number} b @returns {number} */\nfunction add(a, b) {\n"
        ));
        assert!(program.contains("\treturn (a + b);\n}"));
    }

    #[test]
    fn duplicate_definitions_are_rejected() {
        let error = compile_source(
            "concepts.sk",
            "f(): return 1\nf(): return 2\n",
            &CompileOptions::default(),
        )
        .unwrap_err();
        assert!(error.to_string().contains("f is already defined"));
    }
}
