//! Source files and positions used by tokens and diagnostics.

use std::fmt;
use std::sync::Arc;

/// A source file kept alive for the whole compile so diagnostics can
/// quote the offending line.
#[derive(Debug)]
pub struct SourceFile {
    pub name: String,
    pub text: String,
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Arc<Self> {
        let text = text.into();
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(index, _)| index + 1));
        Arc::new(Self {
            name: name.into(),
            text,
            line_starts,
        })
    }

    /// Returns the text of a 1-based line without its terminator.
    pub fn line(&self, line: u32) -> &str {
        let index = (line as usize).saturating_sub(1);
        let Some(&start) = self.line_starts.get(index) else {
            return "";
        };
        let end = self
            .line_starts
            .get(index + 1)
            .map_or(self.text.len(), |next| next - 1);
        self.text[start..end].trim_end_matches('\r')
    }
}

/// Where a token starts. Lines and columns are 1-based; columns count
/// characters, not bytes.
#[derive(Debug, Clone)]
pub struct Position {
    pub file: Arc<SourceFile>,
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(file: Arc<SourceFile>, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }

    /// True when both positions point at the same spot of the same file.
    pub fn same(&self, other: &Position) -> bool {
        Arc::ptr_eq(&self.file, &other.file)
            && self.line == other.line
            && self.column == other.column
    }

    pub fn location(&self) -> Location {
        Location {
            file: self.file.name.clone(),
            line: self.line,
            column: self.column,
            source_line: self.file.line(self.line).to_string(),
        }
    }
}

/// A detached, printable copy of a [`Position`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub source_line: String,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_one_based_and_trimmed() {
        let file = SourceFile::new("demo.sk", "first\r\nsecond\nthird");
        assert_eq!(file.line(1), "first");
        assert_eq!(file.line(2), "second");
        assert_eq!(file.line(3), "third");
        assert_eq!(file.line(9), "");
    }
}
