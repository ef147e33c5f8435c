//! # Storage Layer
//!
//! Everything lagtex reads from or writes to disk.
//!
//! ## Files
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Config | TOML | `lagtex.toml` at the project root |
//! | Digests of the last run | JSON object | `.lagtex-hashes.json` (configurable) |
//! | Generated sources | `.lagda.tex` | scratch workspace, next to each source |
//! | Macro index | one `\name` per line | `--index` |
//! | Export | `.sty` or `.tex` | `<output_dir>/agda-generated.sty` |
//!
//! ## Key Types
//!
//! - [`Project`] - Root resolution and source location
//! - [`HashStore`] - Read/write the digest cache (atomic, locked writes)
//! - [`Workspace`] - Scratch copy of the project tree
//! - [`Config`] - Project and global configuration

mod config;
mod export;
mod hashes;
mod project;
mod workspace;

pub use config::{
    CompilerConfig, Config, ConfigError, GlobalConfig, ProjectConfig, CONFIG_DIR_ENV, CONFIG_FILE,
};
pub use export::{generated_files, render_export, write_export, write_index, DEFAULT_EXPORT_FILE};
pub use hashes::{digest_file, HashCacheError, HashStore};
pub use project::{Project, ProjectError, SourceFile, TARGET_EXTENSION, VCS_DIR};
pub use workspace::Workspace;
