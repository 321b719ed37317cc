//! Shared test helpers for gitstamp integration tests.
//!
//! Graph-level tests build a [`MemoryRepo`]; end-to-end tests create a real
//! git repository in a temp directory and run the `gitstamp` binary in it.

#![allow(dead_code)]

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

use gitstamp::{BranchPolicy, CiMode, Policy, ResolutionResult, default_classifier, resolve};
use gitstamp_git::{GitOid, MemoryRepo};
use gitstamp_version::Version;

// ---------------------------------------------------------------------------
// In-memory graphs
// ---------------------------------------------------------------------------

pub fn v(s: &str) -> Version {
    Version::parse(s).unwrap_or_else(|| panic!("bad version in test: {s}"))
}

/// A policy with `develop` in release-anchored mode.
pub fn develop_policy() -> Policy {
    Policy {
        branches: vec![BranchPolicy::new("develop", CiMode::ReleaseAnchored)],
        ..Policy::default()
    }
}

/// Check out `develop` at `tip`.
pub fn on_develop(repo: &mut MemoryRepo, tip: GitOid) {
    repo.branch("develop", tip);
    repo.checkout("develop");
}

/// A root commit tagged `tag`, plus `ahead` commits on top; `develop` is
/// checked out at the tip. Returns `(tagged, tip)`.
pub fn tagged_then_ahead(repo: &mut MemoryRepo, tag: &str, ahead: usize) -> (GitOid, GitOid) {
    let tagged = repo.commit(&[]);
    repo.tag(tag, tagged);
    let tip = repo.chain(tagged, ahead).last().copied().unwrap_or(tagged);
    on_develop(repo, tip);
    (tagged, tip)
}

/// Resolve with the default classifier.
pub fn resolve_default(repo: &MemoryRepo, policy: &Policy) -> ResolutionResult {
    resolve(repo, policy, &default_classifier).expect("memory repo never fails to read")
}

// ---------------------------------------------------------------------------
// Real repositories
// ---------------------------------------------------------------------------

pub fn git(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_DATE", "2024-01-02T03:04:05Z")
        .env("GIT_COMMITTER_DATE", "2024-01-02T03:04:05Z")
        .output()
        .expect("failed to run git");
    assert!(
        out.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).trim().to_owned()
}

/// Create a fresh git repository on `main` in a temp directory.
pub fn setup_git_repo() -> TempDir {
    let dir = TempDir::new().expect("failed to create temp dir");
    git(dir.path(), &["init", "--initial-branch=main", "."]);
    git(dir.path(), &["config", "user.email", "test@test.com"]);
    git(dir.path(), &["config", "user.name", "Test User"]);
    git(dir.path(), &["config", "commit.gpgsign", "false"]);
    git(dir.path(), &["config", "tag.gpgsign", "false"]);
    dir
}

/// Write a file and commit it; returns the new HEAD.
pub fn commit_file(dir: &Path, name: &str, content: &str) -> String {
    std::fs::write(dir.join(name), content).expect("failed to write file");
    git(dir, &["add", name]);
    git(dir, &["commit", "-m", &format!("write {name}")]);
    git(dir, &["rev-parse", "HEAD"])
}

/// Run the `gitstamp` binary in `dir`.
pub fn gitstamp_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gitstamp"))
        .args(args)
        .current_dir(dir)
        .env_remove("GITSTAMP_LOG")
        .output()
        .expect("failed to run gitstamp")
}

pub fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}
