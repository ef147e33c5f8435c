//! Annotation-driven transpilation
//!
//! Turns an annotated Agda source into a literate `.lagda.tex` document.
//! Each file is processed with a fresh [`FileContext`]; only the
//! [`CommandRegistry`] is shared between files.
//!
//! ## Modes
//!
//! | Mode      | Meaning                                         |
//! |-----------|-------------------------------------------------|
//! | `None`    | no block open                                   |
//! | `Hidden`  | code is type checked but not shown              |
//! | `Command` | code is the body of the most recent macro       |
//!
//! Content outside of any command is hidden. A command opened by a bare
//! name closes itself at the next blank line or at the end of the file.

use serde::Serialize;

use super::diagnostic::{Diagnostic, DiagnosticKind, TranspileError};
use super::directive::Directive;
use super::markup;
use super::name::{self, PrefixStack};
use super::registry::CommandRegistry;
use super::scan::{scan, LineKind, SourceLine};

/// Rendering mode of the current line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    None,
    /// `within_command` is set when entered from a command via `[`,
    /// in which case `]` returns to that command
    Hidden { within_command: bool },
    Command,
}

#[derive(Debug, Clone)]
struct ActiveCommand {
    name: String,
    inline: bool,
    line: usize,
}

/// Result of transpiling one file
#[derive(Debug, Clone, Serialize)]
pub struct Transpiled {
    /// The generated `.lagda.tex` document
    pub document: String,

    /// Qualified names of the commands opened in this file
    pub commands: Vec<String>,

    pub diagnostics: Vec<Diagnostic>,
}

/// Per-file transpiler state
#[derive(Debug)]
pub struct FileContext {
    mode: Mode,
    prefixes: PrefixStack,
    pending_auto_close: bool,
    command: Option<ActiveCommand>,
    document: String,
    commands: Vec<String>,
    diagnostics: Vec<Diagnostic>,
}

impl Default for FileContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FileContext {
    pub fn new() -> Self {
        Self {
            mode: Mode::None,
            prefixes: PrefixStack::new(),
            pending_auto_close: false,
            command: None,
            document: String::from(markup::HEADER),
            commands: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn prefixes(&self) -> &PrefixStack {
        &self.prefixes
    }

    pub fn pending_auto_close(&self) -> bool {
        self.pending_auto_close
    }

    /// Processes one classified line
    pub fn line(
        &mut self,
        line: &SourceLine<'_>,
        registry: &mut CommandRegistry,
    ) -> Result<(), TranspileError> {
        match &line.kind {
            LineKind::Annotation(Some(directive)) => self.directive(directive, line, registry)?,
            LineKind::Annotation(None) => self.report(line, DiagnosticKind::EmptyDirective),
            LineKind::Blank => {
                if self.mode == Mode::Command && self.pending_auto_close {
                    self.close_command();
                }
                self.document.push('\n');
            }
            LineKind::Content => {
                if self.mode == Mode::None {
                    self.document.push_str(markup::HIDDEN_OPEN);
                    self.mode = Mode::Hidden {
                        within_command: false,
                    };
                }
                self.document.push_str(line.raw);
                self.document.push('\n');
            }
        }
        Ok(())
    }

    fn directive(
        &mut self,
        directive: &Directive,
        line: &SourceLine<'_>,
        registry: &mut CommandRegistry,
    ) -> Result<(), TranspileError> {
        match directive {
            Directive::OpenCommand { name, inline } => {
                self.open_command(name, *inline, line, registry);
            }
            Directive::ImplicitOpenCommand { name, inline } => {
                if self.open_command(name, *inline, line, registry) {
                    self.pending_auto_close = true;
                }
            }
            Directive::Close => self.close(line),
            Directive::PushPrefix { name } => {
                // Still pushed so that the matching `<` stays balanced.
                if name.is_empty() {
                    self.report(line, DiagnosticKind::EmptyName);
                }
                let prefix = self.checked_ident(name, line);
                self.prefixes.push(prefix);
            }
            Directive::PopPrefix => {
                if self.prefixes.pop().is_none() {
                    return Err(TranspileError::PrefixUnderflow {
                        line: line.number,
                        text: line.trimmed.to_string(),
                    });
                }
            }
            Directive::OpenHidden => {
                if self.mode != Mode::Command {
                    return Err(TranspileError::HiddenOutsideCommand {
                        line: line.number,
                        text: line.trimmed.to_string(),
                    });
                }
                self.document.push_str(markup::CODE_CLOSE);
                self.document.push_str(markup::HIDDEN_OPEN);
                self.mode = Mode::Hidden {
                    within_command: true,
                };
            }
            Directive::CloseHidden => {
                let inline = self.command.as_ref().map(|c| c.inline);
                match (self.mode, inline) {
                    (Mode::Hidden { within_command: true }, Some(inline)) => {
                        self.document.push_str(markup::CODE_CLOSE);
                        self.document.push_str(markup::code_open(inline));
                        self.mode = Mode::Command;
                    }
                    _ => self.report(line, DiagnosticKind::StrayCloseHidden),
                }
            }
        }
        Ok(())
    }

    /// Opens a command; returns false if the directive was dropped
    fn open_command(
        &mut self,
        name: &str,
        inline: bool,
        line: &SourceLine<'_>,
        registry: &mut CommandRegistry,
    ) -> bool {
        if name.is_empty() {
            self.report(line, DiagnosticKind::EmptyName);
            return false;
        }
        let local = self.checked_ident(name, line);
        let qualified = self.prefixes.qualify(&local);
        registry.record(qualified.clone());
        self.commands.push(qualified.clone());

        let nested = match self.mode {
            Mode::None => false,
            Mode::Hidden { within_command } => {
                self.document.push_str(markup::CODE_CLOSE);
                within_command
            }
            Mode::Command => true,
        };
        if nested {
            // The open command is abandoned and the new one takes its place.
            let open = self
                .command
                .as_ref()
                .map(|c| c.name.clone())
                .unwrap_or_default();
            self.report(
                line,
                DiagnosticKind::NestedCommand {
                    name: qualified.clone(),
                    open,
                },
            );
        }

        self.document
            .push_str(&markup::command_header(&qualified, inline));
        self.command = Some(ActiveCommand {
            name: qualified,
            inline,
            line: line.number,
        });
        self.mode = Mode::Command;
        true
    }

    fn close(&mut self, line: &SourceLine<'_>) {
        match self.mode {
            Mode::Command => self.close_command(),
            Mode::Hidden {
                within_command: true,
            } => {
                let name = self
                    .command
                    .as_ref()
                    .map(|c| c.name.clone())
                    .unwrap_or_default();
                self.report(line, DiagnosticKind::CloseInsideHidden { name });
                self.close_command();
            }
            Mode::Hidden {
                within_command: false,
            } => {
                self.report(line, DiagnosticKind::StrayClose);
                self.document.push_str(markup::CODE_CLOSE);
                self.reset();
            }
            Mode::None => {
                self.report(line, DiagnosticKind::StrayClose);
                self.reset();
            }
        }
    }

    /// Emits the footer of the current command
    fn close_command(&mut self) {
        self.document.push_str(markup::COMMAND_FOOTER);
        self.reset();
    }

    fn reset(&mut self) {
        self.mode = Mode::None;
        self.pending_auto_close = false;
        self.command = None;
    }

    /// Applies the end-of-file rules and returns the result
    pub fn finish(mut self, last_line: usize) -> Transpiled {
        match self.mode {
            Mode::Hidden {
                within_command: false,
            } => {
                self.document.push_str(markup::CODE_CLOSE);
                self.mode = Mode::None;
            }
            Mode::Hidden {
                within_command: true,
            } => {
                if self.pending_auto_close {
                    self.close_command();
                } else {
                    self.document.push_str(markup::CODE_CLOSE);
                    self.mode = Mode::Command;
                }
            }
            Mode::Command if self.pending_auto_close => self.close_command(),
            Mode::Command | Mode::None => {}
        }

        if let Some(command) = self.command.take() {
            self.diagnostics.push(Diagnostic::new(
                command.line,
                String::new(),
                DiagnosticKind::UnterminatedCommand { name: command.name },
            ));
        }

        if !self.prefixes.is_empty() {
            self.diagnostics.push(Diagnostic::new(
                last_line,
                String::new(),
                DiagnosticKind::UnbalancedPrefixes {
                    depth: self.prefixes.len(),
                },
            ));
        }

        Transpiled {
            document: self.document,
            commands: self.commands,
            diagnostics: self.diagnostics,
        }
    }

    fn checked_ident(&mut self, ident: &str, line: &SourceLine<'_>) -> String {
        let sanitized = name::sanitize(ident);
        if sanitized.replaced {
            self.report(
                line,
                DiagnosticKind::IllegalCharacters {
                    name: ident.to_string(),
                    replacement: sanitized.name.clone(),
                },
            );
        }
        sanitized.name
    }

    fn report(&mut self, line: &SourceLine<'_>, kind: DiagnosticKind) {
        self.diagnostics
            .push(Diagnostic::new(line.number, line.trimmed, kind));
    }
}

/// Transpiles one annotated source, recording opened commands in `registry`
pub fn transpile(
    source: &str,
    registry: &mut CommandRegistry,
) -> Result<Transpiled, TranspileError> {
    let mut context = FileContext::new();
    let mut last_line = 0;

    for line in scan(source) {
        last_line = line.number;
        context.line(&line, registry)?;
    }

    Ok(context.finish(last_line))
}
