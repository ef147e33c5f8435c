//! Persisted file digests
//!
//! The digests of the last run are stored as a flat JSON object mapping the
//! source path (relative to the project root) to its hex digest:
//!
//! ```json
//! {"src/Nat.agda": "3f1c…"}
//! ```
//!
//! Writes go through a temp file and an atomic rename.

use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

use crate::domain::{digest, DigestMap};

#[derive(Debug, Error)]
pub enum HashCacheError {
    #[error("Cannot read hashes from {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Corrupt hash cache {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot write hashes to {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Computes the digest of a file's content
pub fn digest_file(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(digest(&bytes))
}

/// Store for the digest map of the previous run
#[derive(Debug, Clone)]
pub struct HashStore {
    path: PathBuf,
}

impl HashStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path to the cache file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Reads the stored digests; a missing file is an empty map
    pub fn load(&self) -> Result<DigestMap, HashCacheError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(DigestMap::new()),
            Err(source) => {
                return Err(HashCacheError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&content).map_err(|source| HashCacheError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Replaces the stored digests with `hashes`
    pub fn save(&self, hashes: &DigestMap) -> Result<(), HashCacheError> {
        self.write_atomic(hashes).map_err(|source| HashCacheError::Write {
            path: self.path.clone(),
            source,
        })
    }

    fn write_atomic(&self, hashes: &DigestMap) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.path.with_extension("json.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)?;

            file.lock_exclusive()?;

            let mut writer = BufWriter::new(&file);
            serde_json::to_writer_pretty(&mut writer, hashes)?;
            writeln!(writer)?;
            writer.flush()?;
        }

        fs::rename(&temp_path, &self.path)
    }

    /// Deletes the cache file; returns false if there was none
    pub fn clear(&self) -> Result<bool, HashCacheError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(HashCacheError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }
}
