//! Macro name resolution
//!
//! LaTeX control sequences may only consist of letters, so every local
//! identifier is checked and, if needed, rewritten before it becomes part of
//! a macro name. Qualification concatenates the active prefixes (outermost
//! first) directly in front of the local name: prefixes `A`, `B` and the
//! local name `c` give `ABc`.

/// Character substituted for every character that is not an ASCII letter
pub const PLACEHOLDER: char = 'X';

/// Result of sanitizing a local identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    /// The identifier with every illegal character replaced
    pub name: String,

    /// Whether any character had to be replaced
    pub replaced: bool,
}

/// Replaces every non ASCII letter in `name` by [`PLACEHOLDER`]
///
/// The result has the same number of characters as the input.
pub fn sanitize(name: &str) -> Sanitized {
    let mut replaced = false;
    let name = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphabetic() {
                c
            } else {
                replaced = true;
                PLACEHOLDER
            }
        })
        .collect();

    Sanitized { name, replaced }
}

/// Builds the fully qualified name for `local` under `prefixes`
///
/// `prefixes` is in push order, so the earliest pushed prefix comes first.
pub fn qualify<S: AsRef<str>>(prefixes: &[S], local: &str) -> String {
    let capacity = prefixes.iter().map(|p| p.as_ref().len()).sum::<usize>() + local.len();
    let mut qualified = String::with_capacity(capacity);
    for prefix in prefixes {
        qualified.push_str(prefix.as_ref());
    }
    qualified.push_str(local);
    qualified
}

/// Stack of active name prefixes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixStack {
    prefixes: Vec<String>,
}

impl PrefixStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a prefix; it applies to every command opened until popped
    pub fn push(&mut self, prefix: impl Into<String>) {
        self.prefixes.push(prefix.into());
    }

    /// Pops the most recently pushed prefix
    pub fn pop(&mut self) -> Option<String> {
        self.prefixes.pop()
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    /// Active prefixes, outermost first
    pub fn as_slice(&self) -> &[String] {
        &self.prefixes
    }

    /// Qualifies `local` with every active prefix
    pub fn qualify(&self, local: &str) -> String {
        qualify(&self.prefixes, local)
    }
}
