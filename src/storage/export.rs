//! Generated artifacts
//!
//! - the index file: one `\macro` per line
//! - the export file: `\input`s every generated `.tex` file belonging to one
//!   of the processed sources, so a document can load all macros at once

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::domain::CommandRegistry;

/// Default export file name inside the output directory
pub const DEFAULT_EXPORT_FILE: &str = "agda-generated.sty";

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// Path as written into LaTeX sources
fn tex_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Writes the macro index
pub fn write_index(path: &Path, registry: &CommandRegistry) -> Result<()> {
    write_file(path, &registry.render_index())
}

/// Generated `.tex` files under `output_dir` whose stem is one of `stems`
pub fn generated_files(output_dir: &Path, stems: &HashSet<String>) -> Vec<PathBuf> {
    WalkDir::new(output_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "tex"))
        .filter(|path| {
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(|stem| stems.contains(stem))
        })
        .collect()
}

/// Renders the export file
///
/// `.sty` exports declare a package named after the file. Inputs are
/// relative to `output_dir` unless `full_path` is set.
pub fn render_export(
    export_file: &Path,
    output_dir: &Path,
    files: &[PathBuf],
    full_path: bool,
) -> String {
    let mut content = String::new();

    if export_file.extension().is_some_and(|ext| ext == "sty") {
        let name = export_file
            .file_stem()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default();
        content.push_str(&format!("\\ProvidesPackage{{{}}}\n", name));
    }

    for file in files {
        let shown = if full_path {
            file.as_path()
        } else {
            file.strip_prefix(output_dir).unwrap_or(file)
        };
        content.push_str(&format!("\\input{{{}}}\n", tex_path(shown)));
    }

    content
}

/// Collects the generated files and writes the export file
///
/// Returns the number of inputs written.
pub fn write_export(
    export_file: &Path,
    output_dir: &Path,
    stems: &HashSet<String>,
    full_path: bool,
) -> Result<usize> {
    let files = generated_files(output_dir, stems);
    let content = render_export(export_file, output_dir, &files, full_path);
    write_file(export_file, &content)?;
    Ok(files.len())
}
