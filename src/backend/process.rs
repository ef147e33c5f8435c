//! External compiler process

use std::process::Command;

use anyhow::{Context, Result};

use super::{CompileJob, CompileOutcome, Compiler};
use crate::storage::CompilerConfig;

/// Runs the configured program once per job
#[derive(Debug, Clone)]
pub struct ProcessCompiler {
    program: String,
    args: Vec<String>,
}

impl ProcessCompiler {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Full argument list for a job
    pub fn arguments(&self, job: &CompileJob<'_>) -> Vec<String> {
        let mut args = self.args.clone();
        args.push(format!("--latex-dir={}", job.output_dir.display()));
        args.push(job.target.display().to_string());
        args
    }
}

impl From<&CompilerConfig> for ProcessCompiler {
    fn from(config: &CompilerConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }
}

impl Compiler for ProcessCompiler {
    fn describe(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn compile(&self, job: &CompileJob<'_>) -> Result<CompileOutcome> {
        let output = Command::new(&self.program)
            .args(self.arguments(job))
            .current_dir(job.workdir)
            .output()
            .with_context(|| format!("Failed to execute compiler: {}", self.program))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();

        if output.status.success() {
            Ok(CompileOutcome::Success { stdout })
        } else {
            Ok(CompileOutcome::Failed {
                code: output.status.code(),
                stdout,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }
}
