//! Diagnostics collected while transpiling
//!
//! Non-fatal problems are recorded as [`Diagnostic`]s and processing goes
//! on. Whether errors fail the run is decided by the caller. Problems that
//! make the rest of the file meaningless are returned as [`TranspileError`].

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// A recoverable problem in an annotated source
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    #[error("Illegal characters in '{name}' replaced by X (now '{replacement}')")]
    IllegalCharacters { name: String, replacement: String },

    #[error("Annotation without a directive")]
    EmptyDirective,

    #[error("Command without a name")]
    EmptyName,

    #[error("Command '{name}' starts inside command '{open}'")]
    NestedCommand { name: String, open: String },

    #[error("Closing brace outside of a command")]
    StrayClose,

    #[error("Command '{name}' closed inside a hidden block")]
    CloseInsideHidden { name: String },

    #[error("Hidden block ends outside of a hidden block")]
    StrayCloseHidden,

    #[error("Command '{name}' is never closed")]
    UnterminatedCommand { name: String },

    #[error("{depth} prefix(es) still open at end of file")]
    UnbalancedPrefixes { depth: usize },
}

impl DiagnosticKind {
    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticKind::IllegalCharacters { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// A diagnostic tied to a source line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// 1-based line number
    pub line: usize,
    pub severity: Severity,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
    /// The offending line, trimmed
    pub text: String,
}

impl Diagnostic {
    pub fn new(line: usize, text: impl Into<String>, kind: DiagnosticKind) -> Self {
        Self {
            line,
            severity: kind.severity(),
            kind,
            text: text.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

/// Conditions that abort the run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranspileError {
    #[error("Line {line} starts a hidden block outside of a command: {text}")]
    HiddenOutsideCommand { line: usize, text: String },

    #[error("Line {line} pops a prefix but none is active: {text}")]
    PrefixUnderflow { line: usize, text: String },
}
