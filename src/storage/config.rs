//! Configuration handling for lagtex
//!
//! Configuration is stored in `lagtex.toml` at the project root (project) and
//! `~/.config/lagtex/config.toml` (global). Command line flags override both.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::OutputFormat;
use crate::domain::CachePolicy;

/// Name of the project configuration file
pub const CONFIG_FILE: &str = "lagtex.toml";

/// Overrides the global configuration directory
pub const CONFIG_DIR_ENV: &str = "LAGTEX_CONFIG_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// External compiler invoked once per changed file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Executable to run
    pub program: String,

    /// Arguments passed before `--latex-dir` and the target file
    pub args: Vec<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            program: "agda".to_string(),
            args: vec!["--latex".to_string(), "--only-scope-checking".to_string()],
        }
    }
}

impl CompilerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.program.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "compiler.program must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Project-level configuration
///
/// Relative paths are resolved against the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Directory the compiler writes generated `.tex` files to
    pub output_dir: PathBuf,

    /// File that `\input`s all generated files (default: `<output_dir>/agda-generated.sty`)
    pub export_file: Option<PathBuf>,

    /// Write full paths into the export file
    pub full_path: bool,

    /// Write the list of generated macros to this file
    pub index: Option<PathBuf>,

    /// Where file digests of the last run are kept
    pub cache_file: PathBuf,

    /// Whether the cache keeps entries of files not in the current run
    pub cache_policy: CachePolicy,

    /// Fail the build on any error diagnostic
    pub strict: bool,

    /// Compiler settings (falls back to the global configuration)
    pub compiler: Option<CompilerConfig>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("latex"),
            export_file: None,
            full_path: false,
            index: None,
            cache_file: PathBuf::from(".lagtex-hashes.json"),
            cache_policy: CachePolicy::Replace,
            strict: false,
            compiler: None,
        }
    }
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,

    /// Compiler used when the project does not configure one
    pub compiler: Option<CompilerConfig>,
}

/// Combined configuration (global + project)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
}

impl Config {
    /// Loads global configuration only
    pub fn load() -> Result<Self> {
        Ok(Self {
            project: ProjectConfig::default(),
            global: Self::load_global()?,
        })
    }

    /// Loads configuration for a specific project
    pub fn for_project(project_root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project_config(project_root)?;

        Ok(Self {
            project,
            global,
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
            return Some(PathBuf::from(dir));
        }
        ProjectDirs::from("dev", "lagtex", "lagtex").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        let config: GlobalConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")?;

        if let Some(compiler) = &config.compiler {
            compiler.validate()?;
        }

        Ok(config)
    }

    /// Loads project configuration from a specific root
    fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
        let config_path = project_root.join(CONFIG_FILE);

        if !config_path.exists() {
            return Ok(ProjectConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read project config: {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse project config")?;

        if let Some(compiler) = &config.compiler {
            compiler.validate()?;
        }

        Ok(config)
    }

    /// The effective compiler: project, then global, then `agda`
    pub fn compiler(&self) -> CompilerConfig {
        self.project
            .compiler
            .clone()
            .or_else(|| self.global.compiler.clone())
            .unwrap_or_default()
    }
}
