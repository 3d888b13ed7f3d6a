//! Test utilities for claude-code integration tests.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use claude_code::process::Invocation;
use tempfile::TempDir;

/// An invocation that runs a short shell script instead of a real binary.
pub fn sh(script: &str) -> Invocation {
    Invocation::new("sh").args(["-c", script])
}

/// A stand-in CLI binary backed by a shell script.
///
/// The script receives exactly the arguments, environment, and stdin the
/// client would hand the real CLI, so tests can assert on all three. The
/// backing directory is removed when the stub is dropped.
pub struct StubCli {
    _dir: TempDir,
    path: PathBuf,
}

impl StubCli {
    /// Write an executable `claude` script whose body runs under `sh`.
    pub fn new(body: &str) -> Self {
        let dir = tempfile::tempdir().expect("create stub directory");
        let path = dir.path().join("claude");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write stub script");
        let mut perms = fs::metadata(&path)
            .expect("stat stub script")
            .permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("mark stub executable");
        Self { _dir: dir, path }
    }

    /// Path to pass to `ClientBuilder::cli_command`.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
