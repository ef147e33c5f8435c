//! Build command

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;

use super::app::absolute;
use super::output::Output;
use crate::backend::{Compiler, ProcessCompiler};
use crate::build::{build, BuildOptions, BuildReport, FileStatus};
use crate::domain::CachePolicy;
use crate::storage::Project;

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Annotated source files, all below the project root
    #[arg(required = true)]
    pub sources: Vec<PathBuf>,

    /// Directory the compiler writes generated .tex files to
    #[arg(long, short = 'o')]
    pub output_dir: Option<PathBuf>,

    /// File that \inputs all generated files
    #[arg(long, short = 'e')]
    pub export_file: Option<PathBuf>,

    /// Write full paths into the export file
    #[arg(long, short = 'f')]
    pub full_path: bool,

    /// Scratch directory (a fresh temporary directory by default)
    #[arg(long, short = 't')]
    pub temp_dir: Option<PathBuf>,

    /// Keep the scratch directory
    #[arg(long, short = 'k')]
    pub keep_temp_dir: bool,

    /// Write the list of generated macros to this file
    #[arg(long, short = 'i')]
    pub index: Option<PathBuf>,

    /// Only transpile and report what would be compiled
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// Ignore cached hashes and compile every source
    #[arg(long, short = 'c')]
    pub clear: bool,

    /// Fail on any error diagnostic
    #[arg(long)]
    pub strict: bool,

    /// Whether the hash cache keeps entries of files not built now
    #[arg(long, value_enum)]
    pub cache_policy: Option<CachePolicy>,
}

impl BuildArgs {
    /// Layers the flags over the project configuration
    fn options(self, project: &Project) -> Result<BuildOptions> {
        let mut options = BuildOptions::from_config(project, self.sources);

        if let Some(dir) = self.output_dir {
            options.output_dir = absolute(&dir)?;
        }
        if let Some(file) = self.export_file {
            options.export_file = Some(absolute(&file)?);
        }
        if let Some(index) = self.index {
            options.index = Some(absolute(&index)?);
        }
        if let Some(dir) = self.temp_dir {
            options.temp_dir = Some(absolute(&dir)?);
        }
        if let Some(policy) = self.cache_policy {
            options.cache_policy = policy;
        }

        options.full_path |= self.full_path;
        options.strict |= self.strict;
        options.keep_temp_dir = self.keep_temp_dir;
        options.force = self.clear;
        options.dry_run = self.dry_run;

        Ok(options)
    }
}

pub fn run(args: BuildArgs, root: Option<&Path>, output: &Output) -> Result<()> {
    let project = Project::discover(root)?;
    let options = args.options(&project)?;
    let compiler = ProcessCompiler::from(&project.config().compiler());
    output.verbose_ctx("build", &format!("compiler = {}", compiler.describe()));

    let report = build(&project, &options, &compiler, output)?;

    if output.is_json() {
        output.data(&report);
    } else {
        print_summary(&report, output);
    }

    Ok(())
}

fn print_summary(report: &BuildReport, output: &Output) {
    if report.dry_run {
        for file in &report.files {
            let state = match file.status {
                FileStatus::Skipped => "unchanged",
                _ => "would compile",
            };
            output.line(&format!("  {} ({})", file.path, state));
        }
        output.line(&format!("Commands: {}", report.commands.len()));
        for name in &report.commands {
            output.line(&format!("  \\{}", name));
        }
        output.success(&format!(
            "Dry run: {} of {} file(s) would be compiled",
            report.count(FileStatus::Pending),
            report.files.len()
        ));
        return;
    }

    if let Some(dir) = &report.scratch_dir {
        output.line(&format!("Kept scratch directory {}", dir.display()));
    }
    if let Some(export) = &report.export_file {
        output.line(&format!("Exported {} file(s) to {}", report.exported, export.display()));
    }

    let failed = report.count(FileStatus::Failed);
    let mut summary = format!(
        "Built {} file(s): {} compiled, {} unchanged",
        report.files.len(),
        report.count(FileStatus::Compiled),
        report.count(FileStatus::Skipped)
    );
    if failed > 0 {
        summary.push_str(&format!(", {} failed", failed));
    }
    if report.error_count() + report.warning_count() > 0 {
        summary.push_str(&format!(
            " ({} error(s), {} warning(s))",
            report.error_count(),
            report.warning_count()
        ));
    }
    output.success(&summary);
}
