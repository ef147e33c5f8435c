//! Main CLI application structure

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use super::output::{Output, OutputFormat};
use super::{build_cmd, cache_cmd, check_cmd};
use crate::storage::Config;

#[derive(Parser)]
#[command(name = "lagtex")]
#[command(author, version, about = "Turn annotated Agda sources into reusable LaTeX macros")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (defaults to the nearest ancestor containing .git)
    #[arg(long, short = 'r', global = true, env = "LAGTEX_ROOT")]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transpile sources, run the compiler on changed files and export macros
    Build(build_cmd::BuildArgs),

    /// Transpile sources and report diagnostics without writing anything
    Check {
        /// Annotated source files
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Print the generated documents
        #[arg(long)]
        print: bool,

        /// Fail on any error diagnostic
        #[arg(long)]
        strict: bool,
    },

    /// Manage the file hash cache
    #[command(subcommand)]
    Cache(cache_cmd::CacheCommands),
}

/// Makes a command line path absolute against the current directory
pub(crate) fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("Failed to resolve path: {}", path.display()))
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let format = match cli.format {
        Some(format) => format,
        None => Config::load()?.global.default_format,
    };
    let output = Output::new(format, cli.verbose);

    output.verbose("lagtex starting");

    match cli.command {
        Commands::Build(args) => build_cmd::run(args, cli.root.as_deref(), &output)?,
        Commands::Check {
            sources,
            print,
            strict,
        } => {
            output.verbose_ctx(
                "check",
                &format!("Checking {} file(s), strict={}", sources.len(), strict),
            );
            check_cmd::run(&sources, print, strict, &output)?
        }
        Commands::Cache(cmd) => cache_cmd::run(cmd, cli.root.as_deref(), &output)?,
    }

    output.verbose("Command completed successfully");
    Ok(())
}
