//! Code generation errors

use std::fmt;

/// Failures inside code generation. Anything here is a compiler bug (the
/// type checker should have rejected the input), so the driver maps it to
/// an internal error with exit code 2.
#[derive(Debug)]
pub enum CodeGenError {
    /// An expression reached codegen without an inferred type or binding.
    MissingSemaInfo(String),
    /// A construct survived sema that codegen cannot lower.
    Unsupported(String),
    Fmt(std::fmt::Error),
}

impl fmt::Display for CodeGenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeGenError::MissingSemaInfo(what) => {
                write!(f, "missing semantic information for {}", what)
            }
            CodeGenError::Unsupported(what) => write!(f, "cannot lower {}", what),
            CodeGenError::Fmt(e) => write!(f, "formatting failure: {}", e),
        }
    }
}

impl From<std::fmt::Error> for CodeGenError {
    fn from(e: std::fmt::Error) -> Self {
        CodeGenError::Fmt(e)
    }
}

impl std::error::Error for CodeGenError {}
