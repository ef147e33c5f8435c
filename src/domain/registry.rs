//! Registry of generated macros
//!
//! Names are appended in the order commands are opened, across all files
//! of one invocation. Duplicates are kept.

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CommandRegistry {
    names: Vec<String>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a fully qualified macro name
    pub fn record(&mut self, name: impl Into<String>) {
        self.names.push(name.into());
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Renders the index file: one `\name` per line, in open order
    pub fn render_index(&self) -> String {
        self.names
            .iter()
            .map(|name| format!("\\{}\n", name))
            .collect()
    }
}
