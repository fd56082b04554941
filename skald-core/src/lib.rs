//! Core of the Skald language toolchain.
//!
//! Skald compiles straight from tokens to target source text in a
//! single pass. The pipeline is roughly:
//!
//!   source .sk
//!     -> lexer          (tokens)
//!     -> concept        (declare pass: generic functions and their bodies)
//!     -> statement      (compile pass, evaluating expressions by shunting)
//!     -> buffer         (Head / Neck / Body / Tail per backend)
//!     -> compiler       (Go and JavaScript programs)
//!
//! A directory compiles as one program through [`compile_package`].
//! Higher-level tools (the CLI) should depend on this crate rather than
//! reimplementing the pipeline.

// ---------------------------------------------------------------------
// Error handling and source positions
// ---------------------------------------------------------------------

pub mod error;
pub mod span;

// ---------------------------------------------------------------------
// Front-end: lexing and token streams
// ---------------------------------------------------------------------

pub mod cache;
pub mod lexer;
pub mod scanner;

// ---------------------------------------------------------------------
// Semantic layers: types, values, scopes and declarations
// ---------------------------------------------------------------------

pub mod expression;
pub mod scope;
pub mod tables;
pub mod types;

// ---------------------------------------------------------------------
// Compilation: expressions, statements, concepts and builtins
// ---------------------------------------------------------------------

pub mod builtins;
pub mod concept;
pub mod shunting;
pub mod statement;

// ---------------------------------------------------------------------
// Back-end: output buffers, target code and orchestration
// ---------------------------------------------------------------------

pub mod backend;
pub mod buffer;
pub mod compiler;
pub mod package;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use backend::{Backend, Targets};
pub use compiler::{CompileOptions, Compiler, Output, compile_file, compile_source};
pub use error::{CoreError, Diagnostic, ErrorKind, Result};
pub use package::{SOURCE_EXTENSION, compile_package};
