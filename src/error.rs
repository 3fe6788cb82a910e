//! Compiler error type.
//!
//! Every stage of the pipeline (tokenizer, parser, type checker, IR
//! generator) reports failures through [`CompileError`]. Each variant
//! carries the source location where the failure was detected, when one
//! is available.

use std::fmt;

use crate::token::SourceLocation;

/// A failure at some stage of compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    Lex(SourceLocation, String),
    Parse(SourceLocation, String),
    Type(SourceLocation, String),
    Lowering(SourceLocation, String),
}

impl CompileError {
    pub fn lex(loc: SourceLocation, msg: impl Into<String>) -> Self {
        CompileError::Lex(loc, msg.into())
    }

    pub fn parse(loc: SourceLocation, msg: impl Into<String>) -> Self {
        CompileError::Parse(loc, msg.into())
    }

    pub fn type_error(loc: SourceLocation, msg: impl Into<String>) -> Self {
        CompileError::Type(loc, msg.into())
    }

    pub fn lowering(loc: SourceLocation, msg: impl Into<String>) -> Self {
        CompileError::Lowering(loc, msg.into())
    }

    pub fn location(&self) -> SourceLocation {
        match self {
            CompileError::Lex(loc, _)
            | CompileError::Parse(loc, _)
            | CompileError::Type(loc, _)
            | CompileError::Lowering(loc, _) => *loc,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Lex(loc, msg) => write!(f, "lexical error at {loc}: {msg}"),
            CompileError::Parse(loc, msg) => write!(f, "parse error at {loc}: {msg}"),
            CompileError::Type(loc, msg) => write!(f, "type error at {loc}: {msg}"),
            CompileError::Lowering(loc, msg) => write!(f, "lowering error at {loc}: {msg}"),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<fmt::Error> for CompileError {
    fn from(e: fmt::Error) -> Self {
        CompileError::Lowering(SourceLocation::synthetic(), e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_location_and_message() {
        let loc = SourceLocation::new(3, 5);
        let err = CompileError::type_error(loc, "expected Int, got Bool");
        let text = err.to_string();
        assert!(text.contains("type error"));
        assert!(text.contains("3"));
        assert!(text.contains("expected Int, got Bool"));
    }

    #[test]
    fn test_location_accessor() {
        let loc = SourceLocation::new(1, 1);
        let err = CompileError::parse(loc, "unexpected token");
        assert_eq!(err.location(), loc);
    }
}
