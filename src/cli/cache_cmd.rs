//! Cache CLI commands

use std::path::Path;

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use super::output::Output;
use crate::storage::{digest_file, HashStore, Project};

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Show cached hashes and whether the files changed since
    Status,

    /// Delete the hash cache so the next build compiles everything
    Clear,
}

/// State of a cached file compared to the working tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum EntryState {
    Unchanged,
    Modified,
    Missing,
}

#[derive(Debug, Serialize)]
struct CacheEntry {
    path: String,
    digest: String,
    state: EntryState,
}

pub fn run(cmd: CacheCommands, root: Option<&Path>, output: &Output) -> Result<()> {
    let project = Project::discover(root)?;
    let store = HashStore::new(project.cache_path());

    match cmd {
        CacheCommands::Status => status(&project, &store, output),
        CacheCommands::Clear => clear(&store, output),
    }
}

fn status(project: &Project, store: &HashStore, output: &Output) -> Result<()> {
    output.verbose_ctx("cache", &format!("Reading {}", store.path().display()));
    let hashes = store.load()?;

    let entries: Vec<CacheEntry> = hashes
        .into_iter()
        .map(|(path, digest)| {
            let state = match digest_file(&project.root().join(&path)) {
                Ok(current) if current == digest => EntryState::Unchanged,
                Ok(_) => EntryState::Modified,
                Err(_) => EntryState::Missing,
            };
            CacheEntry {
                path,
                digest,
                state,
            }
        })
        .collect();

    if output.is_json() {
        output.data(&serde_json::json!({
            "path": store.path().display().to_string(),
            "exists": store.exists(),
            "entries": entries,
        }));
        return Ok(());
    }

    println!("Cache Status");
    println!("{}", "=".repeat(40));
    println!("Path: {}", store.path().display());
    if !store.exists() {
        println!("Status: empty (no build yet)");
        return Ok(());
    }

    let modified = entries
        .iter()
        .filter(|e| e.state != EntryState::Unchanged)
        .count();
    println!("Entries: {} ({} changed since last build)", entries.len(), modified);
    println!();
    for entry in &entries {
        let label = match entry.state {
            EntryState::Unchanged => "unchanged",
            EntryState::Modified => "modified",
            EntryState::Missing => "missing",
        };
        println!("  {:<10} {}", label, entry.path);
    }

    Ok(())
}

fn clear(store: &HashStore, output: &Output) -> Result<()> {
    let removed = store.clear()?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "path": store.path().display().to_string(),
            "removed": removed,
        }));
    } else if removed {
        output.success(&format!("Removed {}", store.path().display()));
    } else {
        output.success("Cache already empty");
    }

    Ok(())
}
