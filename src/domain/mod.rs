//! Domain model for lagtex
//!
//! Contains the transpiler and the change detector without any I/O concerns.
//!
//! ## Pipeline
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Classify lines | [`scan`] | annotation, blank or content |
//! | Parse directives | [`directive`] | [`Directive`] |
//! | Resolve names | [`name`] | qualified, sanitized macro names |
//! | Transpile | [`transpile`] | `.lagda.tex` document + [`Diagnostic`]s |
//! | Record macros | [`registry`] | ordered list of macro names |
//!
//! [`ChangeDetector`] works on file digests and is independent of the rest.

pub mod change;
pub mod diagnostic;
pub mod directive;
pub mod markup;
pub mod name;
pub mod registry;
pub mod scan;
pub mod transpile;

pub use change::{digest, CachePolicy, ChangeDetector, DigestMap};
pub use diagnostic::{Diagnostic, DiagnosticKind, Severity, TranspileError};
pub use directive::Directive;
pub use name::PrefixStack;
pub use registry::CommandRegistry;
pub use scan::{LineKind, SourceLine};
pub use transpile::{transpile, FileContext, Mode, Transpiled};
