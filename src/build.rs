//! Build pipeline
//!
//! ```text
//! sources ──► digests ──► ChangeDetector ──► skip / compile
//!    │
//!    └──► transpile ──► workspace (*.lagda.tex) ──► compiler ──► output_dir/*.tex
//!                 │                                                   │
//!                 └──► CommandRegistry ──► index          export ◄────┘
//! ```
//!
//! Sources are processed strictly in the order given. Fatal transpile errors
//! abort before anything is written. The digest cache is only written after
//! all compiler runs finished.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use thiserror::Error;

use crate::backend::{CompileJob, CompileOutcome, Compiler};
use crate::cli::Output;
use crate::domain::{
    digest, transpile, CachePolicy, ChangeDetector, CommandRegistry, Diagnostic, DigestMap,
    Transpiled, TranspileError,
};
use crate::storage::{
    write_export, write_index, HashStore, Project, SourceFile, Workspace, DEFAULT_EXPORT_FILE,
};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Fatal error in {}", .file.display())]
    Fatal {
        file: PathBuf,
        #[source]
        source: TranspileError,
    },

    #[error("{count} error(s) in annotated sources")]
    Diagnostics { count: usize },
}

/// Settings of one build
///
/// Paths are absolute or relative to the current directory.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub sources: Vec<PathBuf>,
    pub output_dir: PathBuf,
    /// Defaults to `<output_dir>/agda-generated.sty`
    pub export_file: Option<PathBuf>,
    pub full_path: bool,
    pub index: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
    pub keep_temp_dir: bool,
    /// Ignore the digests of the previous run
    pub force: bool,
    pub dry_run: bool,
    pub strict: bool,
    pub cache_policy: CachePolicy,
}

impl BuildOptions {
    /// Options taken from the project configuration
    pub fn from_config(project: &Project, sources: Vec<PathBuf>) -> Self {
        let config = &project.config().project;
        Self {
            sources,
            output_dir: project.resolve(&config.output_dir),
            export_file: config.export_file.as_deref().map(|p| project.resolve(p)),
            full_path: config.full_path,
            index: config.index.as_deref().map(|p| project.resolve(p)),
            temp_dir: None,
            keep_temp_dir: false,
            force: false,
            dry_run: false,
            strict: config.strict,
            cache_policy: config.cache_policy,
        }
    }
}

/// What happened to a source's compiler step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Changed, but not compiled (dry run)
    Pending,
    /// Unchanged since the last run
    Skipped,
    Compiled,
    /// The compiler exited with an error
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    /// Path relative to the project root
    pub path: String,
    /// Generated literate file, relative to the project root
    pub target: PathBuf,
    pub digest: String,
    pub status: FileStatus,
    pub commands: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub root: PathBuf,
    pub dry_run: bool,
    pub files: Vec<FileReport>,
    /// All macros, in the order they were opened
    pub commands: Vec<String>,
    pub index: Option<PathBuf>,
    pub export_file: Option<PathBuf>,
    /// Number of `\input`s in the export file
    pub exported: usize,
    /// Kept scratch directory
    pub scratch_dir: Option<PathBuf>,
    pub cache_written: bool,
}

impl BuildReport {
    pub fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|f| f.status == status).count()
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.files.iter().flat_map(|f| f.diagnostics.iter())
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics().filter(|d| !d.is_error()).count()
    }
}

/// A source together with everything computed for it
struct Unit {
    source: SourceFile,
    digest: String,
    unchanged: bool,
    transpiled: Transpiled,
}

/// Reads and transpiles one file
pub fn transpile_file(path: &Path, registry: &mut CommandRegistry) -> Result<Transpiled> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read source: {}", path.display()))?;
    transpile(&text, registry).map_err(|source| {
        BuildError::Fatal {
            file: path.to_path_buf(),
            source,
        }
        .into()
    })
}

/// Loads the digests of the previous run; unreadable caches count as empty
fn load_previous(store: &HashStore, output: &Output) -> DigestMap {
    match store.load() {
        Ok(hashes) => {
            output.verbose_ctx(
                "cache",
                &format!(
                    "Loaded {} hash(es) from {}",
                    hashes.len(),
                    store.path().display()
                ),
            );
            hashes
        }
        Err(e) => {
            output.verbose_ctx("cache", &e.to_string());
            DigestMap::new()
        }
    }
}

/// Runs the whole pipeline
pub fn build(
    project: &Project,
    options: &BuildOptions,
    compiler: &dyn Compiler,
    output: &Output,
) -> Result<BuildReport> {
    output.verbose_ctx("build", &format!("root = {}", project.root().display()));
    let sources = project.sources(&options.sources)?;

    let output_dir = std::path::absolute(&options.output_dir).with_context(|| {
        format!(
            "Failed to resolve output directory: {}",
            options.output_dir.display()
        )
    })?;
    let export_file = options
        .export_file
        .clone()
        .unwrap_or_else(|| output_dir.join(DEFAULT_EXPORT_FILE));

    let store = HashStore::new(project.cache_path());
    let previous = load_previous(&store, output);
    if options.force {
        output.verbose_ctx("cache", "Ignoring cached hashes for skip decisions");
    }
    let mut detector = ChangeDetector::new(previous, options.cache_policy, options.force);

    let mut registry = CommandRegistry::new();
    let mut units = Vec::with_capacity(sources.len());

    for source in sources {
        let bytes = fs::read(&source.path)
            .with_context(|| format!("Failed to read source: {}", source.path.display()))?;
        let digest = digest(&bytes);
        let unchanged = detector.record(source.key(), digest.clone());
        output.verbose_ctx(
            "hash",
            &format!("{} {} (unchanged: {})", digest, source.key(), unchanged),
        );

        let text = String::from_utf8(bytes)
            .with_context(|| format!("Source is not valid UTF-8: {}", source.path.display()))?;
        let transpiled = transpile(&text, &mut registry).map_err(|e| BuildError::Fatal {
            file: source.relative.clone(),
            source: e,
        })?;

        for diagnostic in &transpiled.diagnostics {
            output.diagnostic(&source.relative, diagnostic);
        }

        units.push(Unit {
            source,
            digest,
            unchanged,
            transpiled,
        });
    }

    let errors = units
        .iter()
        .flat_map(|u| &u.transpiled.diagnostics)
        .filter(|d| d.is_error())
        .count();
    if options.strict && errors > 0 {
        return Err(BuildError::Diagnostics { count: errors }.into());
    }

    if options.dry_run {
        let files = units
            .into_iter()
            .map(|unit| {
                let status = if unit.unchanged {
                    FileStatus::Skipped
                } else {
                    FileStatus::Pending
                };
                file_report(unit, status)
            })
            .collect();

        return Ok(BuildReport {
            root: project.root().to_path_buf(),
            dry_run: true,
            files,
            commands: registry.names().to_vec(),
            index: None,
            export_file: None,
            exported: 0,
            scratch_dir: None,
            cache_written: false,
        });
    }

    let workspace = Workspace::create(
        options.temp_dir.as_deref(),
        project.root(),
        options.keep_temp_dir,
    )?;
    output.verbose_ctx(
        "workspace",
        &format!("Copying project to {}", workspace.path().display()),
    );
    let copied = workspace.populate()?;
    output.verbose_ctx("workspace", &format!("Copied {} file(s)", copied));

    for unit in &units {
        workspace.replace_source(
            &unit.source.relative,
            &unit.source.target(),
            &unit.transpiled.document,
        )?;
    }

    if let Some(index) = &options.index {
        write_index(index, &registry)?;
        output.verbose_ctx("index", &format!("Wrote {}", index.display()));
    }

    fs::create_dir_all(&output_dir).with_context(|| {
        format!("Failed to create output directory: {}", output_dir.display())
    })?;

    output.verbose_ctx("compile", &format!("Running {}", compiler.describe()));
    let mut statuses = Vec::with_capacity(units.len());
    for unit in &units {
        let target = unit.source.target();
        if unit.unchanged {
            output.verbose_ctx("compile", &format!("Skipping {} (no change)", target.display()));
            statuses.push(FileStatus::Skipped);
            continue;
        }

        output.verbose_ctx("compile", &format!("Processing {}", target.display()));
        let job = CompileJob {
            workdir: workspace.path(),
            target: &target,
            output_dir: &output_dir,
        };
        match compiler.compile(&job)? {
            CompileOutcome::Success { .. } => statuses.push(FileStatus::Compiled),
            CompileOutcome::Failed { code, stderr, .. } => {
                let code = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
                output.warn(&format!(
                    "Compiler failed on {} (exit {}): {}",
                    target.display(),
                    code,
                    stderr.trim()
                ));
                detector.invalidate(&unit.source.key());
                statuses.push(FileStatus::Failed);
            }
        }
    }

    let cache_written = match store.save(&detector.into_persisted()) {
        Ok(()) => true,
        Err(e) => {
            output.verbose_ctx("cache", &e.to_string());
            false
        }
    };

    let stems: HashSet<String> = units.iter().map(|u| u.source.stem()).collect();
    let exported = write_export(&export_file, &output_dir, &stems, options.full_path)?;
    output.verbose_ctx(
        "export",
        &format!("Wrote {} input(s) to {}", exported, export_file.display()),
    );

    let scratch_dir = workspace.finish()?;

    let files = units
        .into_iter()
        .zip(statuses)
        .map(|(unit, status)| file_report(unit, status))
        .collect();

    Ok(BuildReport {
        root: project.root().to_path_buf(),
        dry_run: false,
        files,
        commands: registry.names().to_vec(),
        index: options.index.clone(),
        export_file: Some(export_file),
        exported,
        scratch_dir,
        cache_written,
    })
}

fn file_report(unit: Unit, status: FileStatus) -> FileReport {
    FileReport {
        path: unit.source.key(),
        target: unit.source.target(),
        digest: unit.digest,
        status,
        commands: unit.transpiled.commands,
        diagnostics: unit.transpiled.diagnostics,
    }
}
