//! Diagnostics.
//!
//! One `thiserror` enum per error taxonomy in the spec (lexical, syntactic,
//! import, semantic, dialect), unified under [`LogicaError`], plus a
//! separate [`EngineError`] for pass-through failures from the downstream
//! SQL engine — those are never parsed or retried, so they do not belong to
//! the same enum as the compiler's own diagnostics.

use crate::span::SourceSpan;
use thiserror::Error;

/// Maximum context shown around an offending span in rendered diagnostics.
pub const SNIPPET_CONTEXT: usize = 300;

#[derive(Debug, Error)]
pub enum LogicaError {
    #[error("lexical error: {message}\n{}", .span.snippet(SNIPPET_CONTEXT))]
    Lexical { message: String, span: SourceSpan },

    #[error("syntax error: {message}\n{}", .span.snippet(SNIPPET_CONTEXT))]
    Syntactic { message: String, span: SourceSpan },

    #[error("import error: {message}")]
    Import { message: String, chain: Vec<String> },

    #[error("semantic error: {message}\n{}", .span.snippet(SNIPPET_CONTEXT))]
    Semantic { message: String, span: SourceSpan },

    #[error("dialect error: {message}")]
    Dialect { message: String },
}

impl LogicaError {
    pub fn lexical(message: impl Into<String>, span: SourceSpan) -> Self {
        LogicaError::Lexical {
            message: message.into(),
            span,
        }
    }

    pub fn syntactic(message: impl Into<String>, span: SourceSpan) -> Self {
        LogicaError::Syntactic {
            message: message.into(),
            span,
        }
    }

    pub fn import(message: impl Into<String>, chain: Vec<String>) -> Self {
        LogicaError::Import {
            message: message.into(),
            chain,
        }
    }

    pub fn semantic(message: impl Into<String>, span: SourceSpan) -> Self {
        LogicaError::Semantic {
            message: message.into(),
            span,
        }
    }

    pub fn dialect(message: impl Into<String>) -> Self {
        LogicaError::Dialect {
            message: message.into(),
        }
    }

    /// The offending span, when this error kind carries one.
    pub fn span(&self) -> Option<&SourceSpan> {
        match self {
            LogicaError::Lexical { span, .. }
            | LogicaError::Syntactic { span, .. }
            | LogicaError::Semantic { span, .. } => Some(span),
            LogicaError::Import { .. } | LogicaError::Dialect { .. } => None,
        }
    }
}

/// A diagnostic surfaced verbatim from the target engine. Never constructed
/// by the compiler itself; this type exists so callers can distinguish
/// "your program is wrong" (`LogicaError`) from "the engine rejected our
/// SQL" (`EngineError`), per the spec's "engine-side errors are propagated
/// but not parsed or retried" policy.
#[derive(Debug, Error)]
#[error("engine error at {sql_position}: {message}")]
pub struct EngineError {
    pub message: String,
    pub sql_position: String,
}

pub type LogicaResult<T> = Result<T, LogicaError>;
