//! CLI integration tests for lagtex
//!
//! These tests run the binary against throwaway projects. Full builds use a
//! `sh` script standing in for the Agda compiler, so they only run on unix.

use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const NAT: &str = "\
module Nat where

--! >Nat
--! zero
zero : N

--! <
";

const LIST: &str = "\
module List where
--! cons{
_::_ : A
--! }
";

/// Copies the generated literate file to `<latex-dir>/<stem>.tex`
#[cfg(unix)]
const STUB_COMPILER: &str = r##"
[compiler]
program = "sh"
args = ["-c", 'd="${0#--latex-dir=}"; b=$(basename "$1" .lagda.tex); mkdir -p "$d"; cp "$1" "$d/$b.tex"']
"##;

/// Get a command instance for the lagtex binary, isolated from user config
fn lagtex_cmd(config_dir: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("lagtex"));
    cmd.env("LAGTEX_CONFIG_DIR", config_dir).env_remove("LAGTEX_ROOT");
    cmd
}

struct Fixture {
    dir: TempDir,
    config: TempDir,
}

impl Fixture {
    fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = lagtex_cmd(self.config.path());
        cmd.current_dir(self.dir.path());
        cmd
    }

    fn path(&self, relative: &str) -> std::path::PathBuf {
        self.dir.path().join(relative)
    }

    fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).unwrap()
    }

    fn hashes(&self) -> serde_json::Value {
        serde_json::from_str(&self.read(".lagtex-hashes.json")).unwrap()
    }
}

/// A git project with two annotated sources
fn setup_project() -> Fixture {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join(".git")).unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/Nat.agda"), NAT).unwrap();
    fs::write(dir.path().join("List.agda"), LIST).unwrap();
    Fixture {
        dir,
        config: TempDir::new().unwrap(),
    }
}

#[cfg(unix)]
fn setup_stub_project() -> Fixture {
    let fixture = setup_project();
    fs::write(fixture.path("lagtex.toml"), STUB_COMPILER).unwrap();
    fixture
}

// =============================================================================
// Check
// =============================================================================

#[test]
fn test_check_lists_qualified_commands() {
    let fixture = setup_project();

    fixture
        .cmd()
        .args(["check", "src/Nat.agda", "List.agda"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\\Natzero"))
        .stdout(predicate::str::contains("\\cons"))
        .stdout(predicate::str::contains("2 command(s), 0 error(s)"));
}

#[test]
fn test_check_print_shows_document() {
    let fixture = setup_project();

    fixture
        .cmd()
        .args(["check", "--print", "List.agda"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("%% List.agda\n\\usepackage{xparse}"))
        .stdout(predicate::str::contains("\\NewDocumentCommand\\cons{s}"))
        .stdout(predicate::str::contains("\\begin{code}[hide]\nmodule List where\n"));
}

#[test]
fn test_check_needs_no_project() {
    let dir = TempDir::new().unwrap();
    let config = TempDir::new().unwrap();
    fs::write(dir.path().join("A.agda"), "--! a{\nx\n--! }\n").unwrap();

    lagtex_cmd(config.path())
        .current_dir(dir.path())
        .args(["check", "A.agda"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\\a"));
}

#[test]
fn test_check_reports_diagnostics() {
    let fixture = setup_project();
    fs::write(fixture.path("Stray.agda"), "x\n--! }\n--! a1{\n--! }\n").unwrap();

    fixture
        .cmd()
        .args(["check", "Stray.agda"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Error: Stray.agda:2: Closing brace outside"))
        .stderr(predicate::str::contains("Warning: Stray.agda:3: Illegal characters"))
        .stdout(predicate::str::contains("\\aX"));
}

#[test]
fn test_check_strict_fails_on_errors() {
    let fixture = setup_project();
    fs::write(fixture.path("Stray.agda"), "--! }\n").unwrap();

    fixture
        .cmd()
        .args(["check", "--strict", "Stray.agda"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 error(s) in annotated sources"));
}

#[test]
fn test_check_fatal_error_names_file() {
    let fixture = setup_project();
    fs::write(fixture.path("Bad.agda"), "x\n--! [\n").unwrap();

    fixture
        .cmd()
        .args(["check", "Bad.agda"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Bad.agda"))
        .stderr(predicate::str::contains("Line 2 starts a hidden block"));
}

#[test]
fn test_check_json_output() {
    let fixture = setup_project();

    let output = fixture
        .cmd()
        .args(["--format", "json", "check", "src/Nat.agda", "List.agda"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["commands"], serde_json::json!(["Natzero", "cons"]));
    assert_eq!(report["errors"], 0);
    assert!(report["files"][0].get("document").is_none());
}

// =============================================================================
// Build
// =============================================================================

#[test]
fn test_build_requires_project_root() {
    let dir = TempDir::new().unwrap();
    let config = TempDir::new().unwrap();
    fs::write(dir.path().join("A.agda"), "x\n").unwrap();

    lagtex_cmd(config.path())
        .current_dir(dir.path())
        .args(["build", "A.agda"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No .git directory found"));
}

#[test]
fn test_build_rejects_source_outside_root() {
    let fixture = setup_project();
    let other = TempDir::new().unwrap();
    let outside = other.path().join("X.agda");
    fs::write(&outside, "x\n").unwrap();

    fixture
        .cmd()
        .arg("build")
        .arg("src/Nat.agda")
        .arg(&outside)
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not relative to root"));

    assert!(!fixture.path(".lagtex-hashes.json").exists());
}

#[test]
fn test_build_dry_run_writes_nothing() {
    let fixture = setup_project();

    fixture
        .cmd()
        .args(["build", "--dry-run", "-i", "macros.txt", "src/Nat.agda", "List.agda"])
        .assert()
        .success()
        .stdout(predicate::str::contains("src/Nat.agda (would compile)"))
        .stdout(predicate::str::contains("2 of 2 file(s) would be compiled"));

    assert!(!fixture.path("macros.txt").exists());
    assert!(!fixture.path("latex").exists());
    assert!(!fixture.path(".lagtex-hashes.json").exists());
}

#[test]
fn test_build_explicit_root_from_elsewhere() {
    let fixture = setup_project();
    let elsewhere = TempDir::new().unwrap();

    lagtex_cmd(fixture.config.path())
        .current_dir(elsewhere.path())
        .arg("--root")
        .arg(fixture.dir.path())
        .args(["build", "--dry-run"])
        .arg(fixture.path("List.agda"))
        .assert()
        .success();
}

#[cfg(unix)]
#[test]
fn test_build_compiles_and_exports() {
    let fixture = setup_stub_project();

    fixture
        .cmd()
        .args(["build", "-i", "macros.txt", "src/Nat.agda", "List.agda"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 compiled, 0 unchanged"));

    assert_eq!(fixture.read("macros.txt"), "\\Natzero\n\\cons\n");
    assert_eq!(
        fixture.read("latex/agda-generated.sty"),
        "\\ProvidesPackage{agda-generated}\n\\input{List.tex}\n\\input{Nat.tex}\n"
    );
    assert!(fixture
        .read("latex/Nat.tex")
        .contains("\\NewDocumentCommand\\Natzero{s}"));

    let hashes = fixture.hashes();
    assert!(hashes.get("src/Nat.agda").is_some());
    assert!(hashes.get("List.agda").is_some());

    // Sources stay untouched
    assert_eq!(fixture.read("src/Nat.agda"), NAT);
    assert!(!fixture.path("src/Nat.lagda.tex").exists());
}

#[cfg(unix)]
#[test]
fn test_second_build_skips_unchanged() {
    let fixture = setup_stub_project();
    fixture
        .cmd()
        .args(["build", "src/Nat.agda", "List.agda"])
        .assert()
        .success();
    let first = fixture.read(".lagtex-hashes.json");

    fixture
        .cmd()
        .args(["build", "src/Nat.agda", "List.agda"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 compiled, 2 unchanged"));
    assert_eq!(fixture.read(".lagtex-hashes.json"), first);

    fixture
        .cmd()
        .args(["build", "--clear", "src/Nat.agda", "List.agda"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 compiled, 0 unchanged"));
}

#[cfg(unix)]
#[test]
fn test_build_replaces_cache_entries() {
    let fixture = setup_stub_project();
    fixture
        .cmd()
        .args(["build", "src/Nat.agda", "List.agda"])
        .assert()
        .success();

    fixture
        .cmd()
        .args(["build", "src/Nat.agda"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 compiled, 1 unchanged"));

    let hashes = fixture.hashes();
    assert_eq!(hashes.as_object().unwrap().len(), 1);
    assert!(hashes.get("src/Nat.agda").is_some());
}

#[cfg(unix)]
#[test]
fn test_build_merge_policy_keeps_entries() {
    let fixture = setup_stub_project();
    fixture
        .cmd()
        .args(["build", "src/Nat.agda", "List.agda"])
        .assert()
        .success();

    fixture
        .cmd()
        .args(["build", "--cache-policy", "merge", "src/Nat.agda"])
        .assert()
        .success();

    assert_eq!(fixture.hashes().as_object().unwrap().len(), 2);
}

#[cfg(unix)]
#[test]
fn test_build_full_path_export_and_kept_scratch() {
    let fixture = setup_stub_project();
    let scratch = TempDir::new().unwrap();
    let work = scratch.path().join("work");

    fixture
        .cmd()
        .args(["build", "-f", "-k", "-e", "out/all.tex", "-t"])
        .arg(&work)
        .arg("List.agda")
        .assert()
        .success()
        .stdout(predicate::str::contains("Kept scratch directory"));

    let export = fixture.read("out/all.tex");
    let expected = format!("\\input{{{}}}\n", fixture.path("latex/List.tex").display());
    assert_eq!(export, expected);

    assert!(work.join("List.lagda.tex").is_file());
    assert!(!work.join("List.agda").exists());
    assert!(work.join("src/Nat.agda").is_file());
    assert!(!work.join(".git").exists());
}

#[cfg(unix)]
#[test]
fn test_failed_compile_is_not_cached() {
    let fixture = setup_project();
    fs::write(
        fixture.path("lagtex.toml"),
        "[compiler]\nprogram = \"false\"\nargs = []\n",
    )
    .unwrap();

    fixture
        .cmd()
        .args(["build", "List.agda"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Warning: Compiler failed on List.lagda.tex"))
        .stdout(predicate::str::contains("1 failed"));

    assert!(fixture.hashes().get("List.agda").is_none());
}

#[test]
fn test_build_strict_stops_before_compiling() {
    let fixture = setup_project();
    fs::write(fixture.path("Stray.agda"), "--! }\n").unwrap();

    fixture
        .cmd()
        .args(["build", "--strict", "Stray.agda"])
        .assert()
        .failure();

    assert!(!fixture.path(".lagtex-hashes.json").exists());
}

// =============================================================================
// Cache
// =============================================================================

#[test]
fn test_cache_status_without_cache() {
    let fixture = setup_project();

    fixture
        .cmd()
        .args(["cache", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("empty (no build yet)"));
}

#[test]
fn test_cache_status_and_clear() {
    let fixture = setup_project();
    fs::write(
        fixture.path(".lagtex-hashes.json"),
        r#"{"List.agda": "stale", "Gone.agda": "x"}"#,
    )
    .unwrap();

    fixture
        .cmd()
        .args(["cache", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Entries: 2 (2 changed since last build)"))
        .stdout(predicate::str::contains("modified   List.agda"))
        .stdout(predicate::str::contains("missing    Gone.agda"));

    fixture
        .cmd()
        .args(["cache", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed"));
    assert!(!fixture.path(".lagtex-hashes.json").exists());

    fixture
        .cmd()
        .args(["cache", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cache already empty"));
}

#[test]
fn test_cache_status_json() {
    let fixture = setup_project();
    fs::write(fixture.path(".lagtex-hashes.json"), r#"{"Gone.agda": "x"}"#).unwrap();

    let output = fixture
        .cmd()
        .args(["--format", "json", "cache", "status"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["entries"][0]["path"], "Gone.agda");
    assert_eq!(status["entries"][0]["state"], "missing");
}

#[test]
fn test_global_config_sets_default_format() {
    let fixture = setup_project();
    fs::write(
        fixture.config.path().join("config.toml"),
        "default_format = \"json\"\n",
    )
    .unwrap();

    let output = fixture.cmd().args(["check", "List.agda"]).output().unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["commands"], serde_json::json!(["cons"]));
}
