//! Line classification
//!
//! Every source line is either an annotation (`--!` or `-- !`), blank, or
//! content that is passed through verbatim.

use super::directive::{Directive, SIGIL};

/// Agda line comment opening every annotation
pub const COMMENT: &str = "--";

/// Classification of a single source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// An annotation; `None` if the directive body is empty
    Annotation(Option<Directive>),
    Blank,
    Content,
}

/// A classified source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine<'a> {
    /// 1-based line number
    pub number: usize,
    pub raw: &'a str,
    pub trimmed: &'a str,
    pub kind: LineKind,
}

/// Returns the directive body if `trimmed` is an annotation
fn annotation_body(trimmed: &str) -> Option<&str> {
    let rest = trimmed.strip_prefix(COMMENT)?;
    let rest = rest.strip_prefix(' ').unwrap_or(rest);
    rest.strip_prefix(SIGIL).map(str::trim)
}

/// Classifies a single line
pub fn classify(raw: &str) -> LineKind {
    let trimmed = raw.trim();
    if let Some(body) = annotation_body(trimmed) {
        LineKind::Annotation(Directive::parse(body))
    } else if trimmed.is_empty() {
        LineKind::Blank
    } else {
        LineKind::Content
    }
}

/// Splits `source` into classified lines
pub fn scan(source: &str) -> impl Iterator<Item = SourceLine<'_>> {
    source.lines().enumerate().map(|(index, raw)| SourceLine {
        number: index + 1,
        raw,
        trimmed: raw.trim(),
        kind: classify(raw),
    })
}
