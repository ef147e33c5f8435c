//! Project management
//!
//! A project is the directory tree copied into the scratch workspace. Its
//! root is given explicitly or found as the nearest ancestor of the working
//! directory that contains a `.git` directory. Every source must live below
//! the root.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::Config;

/// Directory marking the root of a version-controlled project
pub const VCS_DIR: &str = ".git";

/// Extension of generated literate files
pub const TARGET_EXTENSION: &str = "lagda.tex";

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("No .git directory found and also no explicit --root specified")]
    NotInProject,

    #[error("Project root is not a directory: {0}")]
    InvalidRoot(PathBuf),

    #[error("Source path '{path}' is not relative to root '{root}'")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("Source path has no file name: {0}")]
    InvalidSource(PathBuf),
}

/// An annotated source file inside the project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path of the source
    pub path: PathBuf,

    /// Path relative to the project root
    pub relative: PathBuf,
}

impl SourceFile {
    /// Key of the file in the hash cache
    pub fn key(&self) -> String {
        self.relative.to_string_lossy().replace('\\', "/")
    }

    /// File name without extension (`Foo` for `src/Foo.agda`)
    pub fn stem(&self) -> String {
        self.relative
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Generated literate file, relative to the project root
    pub fn target(&self) -> PathBuf {
        let name = format!("{}.{}", self.stem(), TARGET_EXTENSION);
        match self.relative.parent() {
            Some(parent) => parent.join(name),
            None => PathBuf::from(name),
        }
    }
}

/// A lagtex project
#[derive(Debug)]
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens the project rooted at the given path
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = std::path::absolute(root.as_ref()).with_context(|| {
            format!("Failed to resolve project root: {}", root.as_ref().display())
        })?;

        if !root.is_dir() {
            return Err(ProjectError::InvalidRoot(root).into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the explicit root, or searches upwards from the current directory
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(root) => Self::open(root),
            None => {
                let cwd = std::env::current_dir().context("Failed to read current directory")?;
                let root = Self::find_root(&cwd).ok_or(ProjectError::NotInProject)?;
                Self::open(root)
            }
        }
    }

    /// Finds the nearest ancestor of `start` (inclusive) containing `.git`
    pub fn find_root(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .find(|dir| dir.join(VCS_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolves a configured path against the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Path of the hash cache file
    pub fn cache_path(&self) -> PathBuf {
        self.resolve(&self.config.project.cache_file)
    }

    /// Returns a relative path from the project root
    pub fn relative_path(&self, path: &Path) -> Option<PathBuf> {
        path.strip_prefix(&self.root).ok().map(|p| p.to_path_buf())
    }

    /// Locates a source given on the command line
    pub fn source(&self, path: &Path) -> Result<SourceFile> {
        let absolute = std::path::absolute(path)
            .with_context(|| format!("Failed to resolve source path: {}", path.display()))?;

        let relative = self
            .relative_path(&absolute)
            .ok_or_else(|| ProjectError::OutsideRoot {
                path: path.to_path_buf(),
                root: self.root.clone(),
            })?;

        if relative.file_name().is_none() {
            return Err(ProjectError::InvalidSource(path.to_path_buf()).into());
        }

        Ok(SourceFile {
            path: absolute,
            relative,
        })
    }

    /// Locates all sources, failing on the first one outside the root
    pub fn sources(&self, paths: &[PathBuf]) -> Result<Vec<SourceFile>> {
        paths.iter().map(|p| self.source(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn git_project() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(VCS_DIR)).unwrap();
        dir
    }

    #[test]
    fn open_existing_project() {
        let dir = git_project();
        let project = Project::open(dir.path()).unwrap();
        assert_eq!(project.root(), dir.path());
    }

    #[test]
    fn open_missing_root_fails() {
        let dir = TempDir::new().unwrap();
        let result = Project::open(dir.path().join("missing"));
        assert!(result.is_err());
    }

    #[test]
    fn find_root_searches_ancestors() {
        let dir = git_project();
        let sub = dir.path().join("src").join("deep");
        fs::create_dir_all(&sub).unwrap();

        assert_eq!(Project::find_root(&sub), Some(dir.path().to_path_buf()));
        assert_eq!(
            Project::find_root(dir.path()),
            Some(dir.path().to_path_buf())
        );
    }

    #[test]
    fn find_root_ignores_git_files() {
        let dir = TempDir::new().unwrap();
        // A `.git` file (as in worktrees) does not mark a root here
        fs::write(dir.path().join(VCS_DIR), "gitdir: elsewhere").unwrap();

        let found = Project::find_root(dir.path());
        assert_ne!(found, Some(dir.path().to_path_buf()));
    }

    #[test]
    fn source_inside_root() {
        let dir = git_project();
        let project = Project::open(dir.path()).unwrap();

        let source = project
            .source(&dir.path().join("src").join("Nat.agda"))
            .unwrap();
        assert_eq!(source.relative, PathBuf::from("src/Nat.agda"));
        assert_eq!(source.key(), "src/Nat.agda");
        assert_eq!(source.stem(), "Nat");
        assert_eq!(source.target(), PathBuf::from("src/Nat.lagda.tex"));
    }

    #[test]
    fn source_outside_root_fails() {
        let dir = git_project();
        let other = TempDir::new().unwrap();
        let project = Project::open(dir.path()).unwrap();

        let err = project
            .source(&other.path().join("Nat.agda"))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProjectError>(),
            Some(ProjectError::OutsideRoot { .. })
        ));
    }

    #[test]
    fn configured_paths_resolve_against_root() {
        let dir = git_project();
        fs::write(
            dir.path().join(crate::storage::CONFIG_FILE),
            "cache_file = \"cache/hashes.json\"\n",
        )
        .unwrap();

        let project = Project::open(dir.path()).unwrap();
        assert_eq!(
            project.cache_path(),
            dir.path().join("cache").join("hashes.json")
        );
        assert_eq!(project.resolve(Path::new("/abs")), PathBuf::from("/abs"));
    }
}
