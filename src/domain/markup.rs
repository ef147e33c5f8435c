//! LaTeX fragments emitted around source lines
//!
//! Commands become `\NewDocumentCommand` definitions with a star argument:
//! `\name` wraps the code in `AgdaAlign`/`AgdaSuppressSpace`, `\name*` does
//! not, so starred uses can share an alignment group.

pub const HEADER: &str = "\\usepackage{xparse}\n\n";

pub const HIDDEN_OPEN: &str = "\\begin{code}[hide]\n";

pub const CODE_CLOSE: &str = "\\end{code}\n";

pub const COMMAND_FOOTER: &str =
    "\\end{code}\n\\IfBooleanF{#1}{\\end{AgdaSuppressSpace}\\end{AgdaAlign}}}\n";

/// Opener of the visible code environment of a command
pub fn code_open(inline: bool) -> &'static str {
    if inline {
        "\\begin{code}[inline]\n"
    } else {
        "\\begin{code}\n"
    }
}

/// Macro definition header, including the opening code environment
pub fn command_header(name: &str, inline: bool) -> String {
    format!(
        "\\NewDocumentCommand\\{}{{s}}{{\\IfBooleanF{{#1}}{{\\begin{{AgdaAlign}}\\begin{{AgdaSuppressSpace}}}}\n{}",
        name,
        code_open(inline)
    )
}
