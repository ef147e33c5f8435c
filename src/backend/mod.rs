//! # Compiler Backend
//!
//! The typesetting compiler turning `.lagda.tex` files into `.tex` files.
//!
//! ## Overview
//!
//! The backend runs once per changed source, in input order, with the
//! scratch workspace as working directory:
//!
//! ```text
//! agda --latex --only-scope-checking --latex-dir=<output_dir> src/Nat.lagda.tex
//! ```
//!
//! The program and leading arguments come from the `[compiler]` config
//! section; `--latex-dir` and the target are always appended.
//!
//! ## Key Types
//!
//! - [`Compiler`] - Trait implemented by backends
//! - [`ProcessCompiler`] - Runs an external program
//! - [`CompileJob`] - One target to compile
//! - [`CompileOutcome`] - Exit status and captured output

mod process;

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

pub use process::ProcessCompiler;

/// One generated file to compile
#[derive(Debug, Clone, Copy)]
pub struct CompileJob<'a> {
    /// Directory the compiler runs in
    pub workdir: &'a Path,

    /// Target relative to `workdir`
    pub target: &'a Path,

    /// Absolute directory for generated `.tex` files
    pub output_dir: &'a Path,
}

/// Result of a compiler run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CompileOutcome {
    Success {
        stdout: String,
    },
    Failed {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

/// A typesetting compiler
pub trait Compiler {
    /// Human readable command line, for logs
    fn describe(&self) -> String;

    /// Compiles one target; `Err` only if the compiler could not be run
    fn compile(&self, job: &CompileJob<'_>) -> Result<CompileOutcome>;
}
