//! Scratch workspace
//!
//! The compiler must only see the generated literate files, not the
//! annotated sources, so the project tree is copied to a scratch directory
//! and the sources are replaced there.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;
use walkdir::WalkDir;

use super::project::VCS_DIR;

/// A copy of the project tree the compiler runs in
///
/// Unless kept, the directory is removed by [`Workspace::finish`] or, when a
/// build step fails before that, on drop.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    root: PathBuf,
    temp: Option<TempDir>,
    keep: bool,
}

impl Workspace {
    /// Creates the workspace for the project at `root`
    ///
    /// Uses `dir`, or a fresh temporary directory. `dir` must not be the root
    /// or one of its ancestors.
    pub fn create(dir: Option<&Path>, root: &Path, keep: bool) -> Result<Self> {
        let root = fs::canonicalize(root)
            .with_context(|| format!("Failed to resolve project root: {}", root.display()))?;

        match dir {
            Some(dir) => {
                fs::create_dir_all(dir).with_context(|| {
                    format!("Failed to create scratch directory: {}", dir.display())
                })?;
                let path = fs::canonicalize(dir).with_context(|| {
                    format!("Failed to resolve scratch directory: {}", dir.display())
                })?;
                if root.starts_with(&path) {
                    anyhow::bail!(
                        "Scratch directory {} must not contain the project root {}",
                        path.display(),
                        root.display()
                    );
                }
                Ok(Self {
                    path,
                    root,
                    temp: None,
                    keep,
                })
            }
            None => {
                let temp = tempfile::Builder::new()
                    .prefix("lagtex")
                    .tempdir()
                    .context("Failed to create temporary directory")?;
                Ok(Self {
                    path: temp.path().to_path_buf(),
                    root,
                    temp: Some(temp),
                    keep,
                })
            }
        }
    }

    /// Returns the workspace directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of `relative` inside the workspace
    pub fn join(&self, relative: &Path) -> PathBuf {
        self.path.join(relative)
    }

    /// Copies the project tree into the workspace
    ///
    /// Skips the `.git` directory and the workspace itself. Symlinks are
    /// recreated, not followed. Returns the number of files copied.
    pub fn populate(&self) -> Result<usize> {
        let root = &self.root;
        let mut copied = 0;
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let path = entry.path();
                path != self.path
                    && !(entry.file_type().is_dir() && entry.file_name() == VCS_DIR)
            });

        for entry in walker {
            let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
            let relative = match entry.path().strip_prefix(root) {
                Ok(relative) if !relative.as_os_str().is_empty() => relative,
                _ => continue,
            };
            let dest = self.path.join(relative);
            let file_type = entry.file_type();

            if file_type.is_dir() {
                fs::create_dir_all(&dest)
                    .with_context(|| format!("Failed to create {}", dest.display()))?;
            } else if file_type.is_symlink() {
                copy_symlink(entry.path(), &dest)?;
                copied += 1;
            } else {
                fs::copy(entry.path(), &dest).with_context(|| {
                    format!(
                        "Failed to copy {} to {}",
                        entry.path().display(),
                        dest.display()
                    )
                })?;
                copied += 1;
            }
        }

        Ok(copied)
    }

    /// Writes a generated file and removes the workspace copy of its source
    pub fn replace_source(&self, source: &Path, target: &Path, content: &str) -> Result<()> {
        let target_path = self.join(target);
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&target_path, content)
            .with_context(|| format!("Failed to write {}", target_path.display()))?;

        let source_path = self.join(source);
        match fs::remove_file(&source_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove {}", source_path.display())),
        }
    }

    /// Removes the workspace unless it is kept; returns the kept path
    pub fn finish(mut self) -> Result<Option<PathBuf>> {
        if self.keep {
            return Ok(Some(match self.temp.take() {
                Some(temp) => temp.keep(),
                None => self.path.clone(),
            }));
        }

        // Removal is done here; drop must not retry it.
        self.keep = true;
        match self.temp.take() {
            Some(temp) => temp
                .close()
                .context("Failed to remove temporary directory")?,
            None => fs::remove_dir_all(&self.path).with_context(|| {
                format!("Failed to remove scratch directory: {}", self.path.display())
            })?,
        }

        Ok(None)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.keep || self.temp.is_some() {
            return;
        }
        let _ = fs::remove_dir_all(&self.path);
    }
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dest: &Path) -> Result<()> {
    let target =
        fs::read_link(src).with_context(|| format!("Failed to read link {}", src.display()))?;
    if fs::symlink_metadata(dest).is_ok() {
        fs::remove_file(dest)
            .with_context(|| format!("Failed to replace {}", dest.display()))?;
    }
    std::os::unix::fs::symlink(&target, dest)
        .with_context(|| format!("Failed to create link {}", dest.display()))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dest: &Path) -> Result<()> {
    if src.is_dir() {
        return Ok(());
    }
    fs::copy(src, dest)
        .map(|_| ())
        .with_context(|| format!("Failed to copy {} to {}", src.display(), dest.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".git/objects")).unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/Nat.agda"), "module Nat where\n").unwrap();
        fs::write(dir.path().join("README.md"), "readme\n").unwrap();
        dir
    }

    #[test]
    fn populate_copies_tree_without_git() {
        let root = project();
        let scratch = TempDir::new().unwrap();
        let workspace = Workspace::create(Some(scratch.path()), root.path(), true).unwrap();

        let copied = workspace.populate().unwrap();

        assert_eq!(copied, 2);
        assert!(scratch.path().join("src/Nat.agda").is_file());
        assert!(scratch.path().join("README.md").is_file());
        assert!(!scratch.path().join(".git").exists());
    }

    #[test]
    fn populate_skips_workspace_inside_root() {
        let root = project();
        let inner = root.path().join("_scratch");
        let workspace = Workspace::create(Some(&inner), root.path(), false).unwrap();

        workspace.populate().unwrap();

        assert!(inner.join("src/Nat.agda").is_file());
        assert!(!inner.join("_scratch").exists());
        workspace.finish().unwrap();
        assert!(!inner.exists());
    }

    #[test]
    fn root_is_rejected_as_workspace() {
        let root = project();
        assert!(Workspace::create(Some(root.path()), root.path(), false).is_err());
        assert!(root.path().join("src/Nat.agda").is_file());
    }

    #[test]
    fn ancestor_of_root_is_rejected_as_workspace() {
        let outer = TempDir::new().unwrap();
        let root = outer.path().join("project");
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/Nat.agda"), "module Nat where\n").unwrap();

        let dotted = root.join("src").join("..").join("..");
        assert!(Workspace::create(Some(&dotted), &root, false).is_err());
        assert!(Workspace::create(Some(outer.path()), &root, false).is_err());
        assert!(root.join("src/Nat.agda").is_file());
    }

    #[test]
    fn explicit_workspace_is_removed_on_drop() {
        let root = project();
        let scratch = TempDir::new().unwrap();
        let dir = scratch.path().join("work");

        {
            let workspace = Workspace::create(Some(&dir), root.path(), false).unwrap();
            workspace.populate().unwrap();
            assert!(dir.join("README.md").is_file());
        }

        assert!(!dir.exists());
    }

    #[test]
    fn kept_explicit_workspace_survives_drop() {
        let root = project();
        let scratch = TempDir::new().unwrap();
        let dir = scratch.path().join("work");

        drop(Workspace::create(Some(&dir), root.path(), true).unwrap());
        assert!(dir.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn populate_recreates_symlinks() {
        let root = project();
        std::os::unix::fs::symlink("src/Nat.agda", root.path().join("link.agda")).unwrap();
        let scratch = TempDir::new().unwrap();
        let workspace = Workspace::create(Some(scratch.path()), root.path(), true).unwrap();

        workspace.populate().unwrap();

        let link = scratch.path().join("link.agda");
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("src/Nat.agda"));
    }

    #[test]
    fn replace_source_swaps_files() {
        let root = project();
        let workspace = Workspace::create(None, root.path(), false).unwrap();
        workspace.populate().unwrap();

        workspace
            .replace_source(
                Path::new("src/Nat.agda"),
                Path::new("src/Nat.lagda.tex"),
                "generated\n",
            )
            .unwrap();

        assert!(!workspace.join(Path::new("src/Nat.agda")).exists());
        assert_eq!(
            fs::read_to_string(workspace.join(Path::new("src/Nat.lagda.tex"))).unwrap(),
            "generated\n"
        );
    }

    #[test]
    fn temporary_workspace_is_removed() {
        let root = project();
        let workspace = Workspace::create(None, root.path(), false).unwrap();
        let path = workspace.path().to_path_buf();
        assert!(path.is_dir());

        assert_eq!(workspace.finish().unwrap(), None);
        assert!(!path.exists());
    }

    #[test]
    fn kept_workspace_survives() {
        let root = project();
        let workspace = Workspace::create(None, root.path(), true).unwrap();
        let path = workspace.path().to_path_buf();

        let kept = workspace.finish().unwrap();
        assert_eq!(kept.as_deref(), Some(path.as_path()));
        assert!(path.is_dir());
        fs::remove_dir_all(path).unwrap();
    }
}
