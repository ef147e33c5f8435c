//! Directive grammar
//!
//! The body of an annotation (everything after the marker) is one of:
//!
//! | Body        | Directive                           |
//! |-------------|-------------------------------------|
//! | `name{`     | open a command named `name`         |
//! | `}`         | close the current command           |
//! | `>name`     | push a name prefix                  |
//! | `<`         | pop the innermost prefix            |
//! | `[`         | start a hidden part inside a command |
//! | `]`         | end the hidden part                 |
//! | `name`      | open a command closed at the next blank line |
//!
//! A leading `!` marks the command as inline. The symbols are tested in the
//! order of the table, so `a{ >b` opens a command.

/// Character introducing a directive and flagging inline commands
pub const SIGIL: char = '!';

/// A parsed annotation directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    OpenCommand { name: String, inline: bool },
    Close,
    PushPrefix { name: String },
    PopPrefix,
    OpenHidden,
    CloseHidden,
    ImplicitOpenCommand { name: String, inline: bool },
}

/// Structural symbols in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Symbol {
    Open,
    Close,
    Push,
    Pop,
    HideStart,
    HideEnd,
}

impl Symbol {
    const PRIORITY: [Symbol; 6] = [
        Symbol::Open,
        Symbol::Close,
        Symbol::Push,
        Symbol::Pop,
        Symbol::HideStart,
        Symbol::HideEnd,
    ];

    fn as_char(self) -> char {
        match self {
            Symbol::Open => '{',
            Symbol::Close => '}',
            Symbol::Push => '>',
            Symbol::Pop => '<',
            Symbol::HideStart => '[',
            Symbol::HideEnd => ']',
        }
    }

    /// First symbol, by priority, contained anywhere in `body`
    fn find(body: &str) -> Option<Symbol> {
        Self::PRIORITY
            .into_iter()
            .find(|symbol| body.contains(symbol.as_char()))
    }
}

fn first_token(text: &str) -> &str {
    text.split_whitespace().next().unwrap_or("")
}

impl Directive {
    /// Parses a directive body (the trimmed text after the marker)
    ///
    /// Returns `None` for an empty body.
    pub fn parse(body: &str) -> Option<Self> {
        let body = body.trim();
        let (inline, body) = match body.strip_prefix(SIGIL) {
            Some(rest) => (true, rest.trim()),
            None => (false, body),
        };

        if body.is_empty() {
            return None;
        }

        let operand = first_token(body);

        let directive = match Symbol::find(body) {
            Some(Symbol::Open) => {
                let name = operand.split('{').next().unwrap_or_default();
                Directive::OpenCommand {
                    name: name.to_string(),
                    inline,
                }
            }
            Some(Symbol::Close) => Directive::Close,
            Some(Symbol::Push) => {
                let spaced = body.replacen(Symbol::Push.as_char(), " ", 1);
                Directive::PushPrefix {
                    name: first_token(&spaced).to_string(),
                }
            }
            Some(Symbol::Pop) => Directive::PopPrefix,
            Some(Symbol::HideStart) => Directive::OpenHidden,
            Some(Symbol::HideEnd) => Directive::CloseHidden,
            None => Directive::ImplicitOpenCommand {
                name: operand.to_string(),
                inline,
            },
        };

        Some(directive)
    }
}
