//! Check command: transpile in memory, write nothing

use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use super::output::Output;
use crate::build::{transpile_file, BuildError};
use crate::domain::{CommandRegistry, Diagnostic};

#[derive(Debug, Serialize)]
struct CheckedFile {
    path: PathBuf,
    commands: Vec<String>,
    diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    document: Option<String>,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    files: Vec<CheckedFile>,
    commands: Vec<String>,
    errors: usize,
    warnings: usize,
}

pub fn run(sources: &[PathBuf], print: bool, strict: bool, output: &Output) -> Result<()> {
    let mut registry = CommandRegistry::new();
    let mut files = Vec::with_capacity(sources.len());

    for path in sources {
        let transpiled = transpile_file(path, &mut registry)?;
        for diagnostic in &transpiled.diagnostics {
            output.diagnostic(path, diagnostic);
        }
        files.push(CheckedFile {
            path: path.clone(),
            commands: transpiled.commands,
            diagnostics: transpiled.diagnostics,
            document: print.then_some(transpiled.document),
        });
    }

    let (errors, warnings) = files
        .iter()
        .flat_map(|f| &f.diagnostics)
        .fold((0, 0), |(errors, warnings), d| {
            if d.is_error() {
                (errors + 1, warnings)
            } else {
                (errors, warnings + 1)
            }
        });

    let report = CheckReport {
        files,
        commands: registry.names().to_vec(),
        errors,
        warnings,
    };

    if output.is_json() {
        output.data(&report);
    } else {
        print_report(&report, output);
    }

    if strict && errors > 0 {
        return Err(BuildError::Diagnostics { count: errors }.into());
    }

    Ok(())
}

fn print_report(report: &CheckReport, output: &Output) {
    for file in &report.files {
        if let Some(document) = &file.document {
            output.line(&format!("%% {}", file.path.display()));
            print!("{}", document);
            continue;
        }

        output.line(&file.path.display().to_string());
        for name in &file.commands {
            output.line(&format!("  \\{}", name));
        }
    }

    output.success(&format!(
        "Checked {} file(s): {} command(s), {} error(s), {} warning(s)",
        report.files.len(),
        report.commands.len(),
        report.errors,
        report.warnings
    ));
}
