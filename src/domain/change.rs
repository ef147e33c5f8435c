//! Change detection
//!
//! Decides per source file whether the external compiler has to run again.
//! A file is skipped iff its current digest equals the digest recorded for
//! the same path by the previous run. The map persisted at the end of a run
//! either replaces the previous one or is merged into it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Hex encoded content digest of `bytes`
pub fn digest(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Path (relative to the project root) to digest
pub type DigestMap = BTreeMap<String, String>;

/// What happens to entries of the previous run for files not seen now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Persist exactly the files of the current run
    #[default]
    Replace,
    /// Keep entries of files not part of the current run
    Merge,
}

/// Compares the current run against the previous one
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    previous: DigestMap,
    current: DigestMap,
    policy: CachePolicy,
    force: bool,
}

impl ChangeDetector {
    /// Creates a detector; with `force` nothing is skipped
    ///
    /// The previous map is still merged into the persisted one under
    /// [`CachePolicy::Merge`].
    pub fn new(previous: DigestMap, policy: CachePolicy, force: bool) -> Self {
        Self {
            previous,
            current: DigestMap::new(),
            policy,
            force,
        }
    }

    /// Records the digest of `path` and returns true if compilation may be skipped
    pub fn record(&mut self, path: impl Into<String>, digest: impl Into<String>) -> bool {
        let path = path.into();
        let digest = digest.into();
        let unchanged = !self.force && self.previous.get(&path) == Some(&digest);
        self.current.insert(path, digest);
        unchanged
    }

    /// Forgets the digest of `path`, so the next run compiles it again
    pub fn invalidate(&mut self, path: &str) {
        self.current.remove(path);
        self.previous.remove(path);
    }

    /// The map to persist for the next run
    pub fn into_persisted(self) -> DigestMap {
        match self.policy {
            CachePolicy::Replace => self.current,
            CachePolicy::Merge => {
                let mut merged = self.previous;
                merged.extend(self.current);
                merged
            }
        }
    }
}
