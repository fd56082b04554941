use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::span::Location;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to read source: {0}")]
    SourceIo(#[from] std::io::Error),
    #[error("source path was not found at {0}")]
    MissingSource(PathBuf),
    #[error("no .{extension} files found in {dir}")]
    EmptyPackage {
        dir: PathBuf,
        extension: &'static str,
    },
    #[error("unsupported backend: {0}")]
    UnsupportedBackend(String),
    #[error("compile of {0} was cancelled after another file failed")]
    Cancelled(String),
    #[error("a compile task panicked")]
    TaskPanicked,
    #[error("{0}")]
    Compile(Box<Diagnostic>),
}

impl CoreError {
    pub fn compile(kind: ErrorKind, location: Location) -> Self {
        CoreError::Compile(Box::new(Diagnostic { kind, location }))
    }

    /// The structured kind of a compile error, if this is one.
    pub fn kind(&self) -> Option<&ErrorKind> {
        self.diagnostic().map(|diagnostic| &diagnostic.kind)
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            CoreError::Compile(diagnostic) => Some(diagnostic),
            _ => None,
        }
    }
}

/// What went wrong in a compile error. Every kind is fatal to the
/// compile that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("expected {expected}, found {found}")]
    SyntaxExpectation { expected: String, found: String },
    #[error("{0} is undefined")]
    UndefinedName(String),
    #[error("undefined operator {0}")]
    UndefinedOperator(String),
    #[error("type mismatch: got {found}, expecting {expected}")]
    TypeMismatch { expected: String, found: String },
    #[error("operator {operator} does not apply to {left} and {right}")]
    UnsupportedOperator {
        operator: String,
        left: String,
        right: String,
    },
    #[error("cannot cast {from} to {to}")]
    UnsupportedCast { from: String, to: String },
    #[error("{name} expects {expected} arguments but received {given}")]
    ArityMismatch {
        name: String,
        expected: String,
        given: usize,
    },
    #[error("{0} does not return any values and cannot be used in an expression")]
    NoReturnValue(String),
    #[error("{feature} is not supported by the {backend} backend")]
    Unsupported {
        feature: String,
        backend: &'static str,
    },
    #[error("{0}")]
    Semantic(String),
}

/// A compile error with the place it was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub location: Location,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: {}", self.location, self.kind)?;
        // Tabs are flattened so the caret lines up with the column.
        let line = self.location.source_line.replace('\t', " ");
        writeln!(f, "  {line}")?;
        let pad = " ".repeat(self.location.column.saturating_sub(1) as usize);
        write!(f, "  {pad}^")
    }
}

impl std::error::Error for Diagnostic {}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_points_at_column() {
        let error = CoreError::compile(
            ErrorKind::UndefinedName("foo".into()),
            Location {
                file: "main.sk".into(),
                line: 2,
                column: 5,
                source_line: "\tx = foo()".into(),
            },
        );
        let rendered = error.to_string();
        assert!(rendered.starts_with("main.sk:2:5: foo is undefined"));
        assert!(rendered.ends_with("\n   x = foo()\n      ^"));
        assert_eq!(
            error.kind(),
            Some(&ErrorKind::UndefinedName("foo".into()))
        );
    }
}
