//! Diagnostics
//!
//! Every compile-time failure carries a `Diagnostic` rendered to stderr as
//! `<file>:<line>:<col>: <severity>: <message>`. Lines and columns are
//! 1-based in output (stored 0-based internally, like the token stream).

use std::fmt;
use std::path::PathBuf;

/// A position in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Loc {
    /// 0-based line
    pub line: usize,
    /// 0-based column
    pub column: usize,
    /// Byte offset from the start of the file
    pub offset: usize,
}

impl Loc {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Loc { line, column, offset }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Stable code, e.g. "lex", "parse", "sema"
    pub code: &'static str,
    pub message: String,
    pub file: PathBuf,
    pub loc: Loc,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn error(code: &'static str, message: impl Into<String>, file: impl Into<PathBuf>, loc: Loc) -> Self {
        Diagnostic {
            severity: Severity::Error,
            code,
            message: message.into(),
            file: file.into(),
            loc,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}: {}",
            self.file.display(),
            self.loc.line + 1,
            self.loc.column + 1,
            self.severity,
            self.message
        )?;
        for note in &self.notes {
            write!(f, "\n{}:{}:{}: note: {}", self.file.display(), self.loc.line + 1, self.loc.column + 1, note)?;
        }
        Ok(())
    }
}

/// Compile-time failure taxonomy. Every variant is recoverable within a
/// single file: the driver reports the first error and stops that file.
#[derive(Debug)]
pub enum CompileError {
    Lex(Diagnostic),
    Parse(Diagnostic),
    Sema(Diagnostic),
    /// Compiler bug or environment failure (exit code 2).
    Internal(String),
}

impl CompileError {
    /// Process exit code for this error class.
    pub fn exit_code(&self) -> i32 {
        match self {
            CompileError::Internal(_) => 2,
            _ => 1,
        }
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            CompileError::Lex(d) | CompileError::Parse(d) | CompileError::Sema(d) => Some(d),
            CompileError::Internal(_) => None,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Lex(d) | CompileError::Parse(d) | CompileError::Sema(d) => write!(f, "{}", d),
            CompileError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for CompileError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_one_based_positions() {
        let d = Diagnostic::error("lex", "unterminated string", "demo.py", Loc::new(4, 7, 120));
        assert_eq!(d.to_string(), "demo.py:5:8: error: unterminated string");
    }

    #[test]
    fn notes_render_on_following_lines() {
        let d = Diagnostic::error("parse", "unexpected token", "a.py", Loc::default())
            .with_note("expected one of: ')', ','");
        let text = d.to_string();
        assert!(text.contains("a.py:1:1: error: unexpected token"));
        assert!(text.contains("note: expected one of"));
    }

    #[test]
    fn exit_codes() {
        let d = Diagnostic::error("sema", "x", "a.py", Loc::default());
        assert_eq!(CompileError::Sema(d).exit_code(), 1);
        assert_eq!(CompileError::Internal("boom".into()).exit_code(), 2);
    }
}
