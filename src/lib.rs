//! lagtex - annotated Agda sources to reusable LaTeX macros
//!
//! Lines starting with `--!` in an Agda source mark regions that become
//! `\NewDocumentCommand` macros in a generated literate LaTeX file. The
//! generated files are compiled by Agda's LaTeX backend and collected into a
//! single package a paper can load.

pub mod backend;
pub mod build;
pub mod cli;
pub mod domain;
pub mod storage;

pub use build::{build, BuildOptions, BuildReport};
pub use domain::{transpile, CommandRegistry, Diagnostic, Transpiled, TranspileError};
