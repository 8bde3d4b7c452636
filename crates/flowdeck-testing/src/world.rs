//! Declarative test environment for `flowdeck-cli` integration tests,
//! the same shape as the teacher's `TestWorld`: an isolated temp
//! workspace plus a configured `assert_cmd::Command` for the binary.

use std::path::{Path, PathBuf};

use anyhow::Result;
use assert_cmd::Command;
use tempfile::TempDir;

use crate::fixtures::{sample_config, write_config};

/// An isolated `FLOWDECK_PATH` workspace with a default config already
/// written, and a helper for invoking the `flowdeck` binary against it.
pub struct TestWorld {
    temp_dir: TempDir,
    workspace_root: PathBuf,
}

impl TestWorld {
    /// Creates a fresh workspace with a default config on disk.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let workspace_root = temp_dir.path().to_path_buf();
        write_config(&workspace_root, &sample_config()).expect("failed to write default config");
        Self { temp_dir, workspace_root }
    }

    /// A workspace with no config on disk, for testing first-run /
    /// fresh-install behaviour.
    pub fn without_config() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let workspace_root = temp_dir.path().to_path_buf();
        Self { temp_dir, workspace_root }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// A `flowdeck` command pre-configured with `FLOWDECK_PATH` pointed
    /// at this workspace.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("flowdeck").expect("flowdeck binary not found");
        cmd.env("FLOWDECK_PATH", &self.workspace_root);
        cmd
    }

    /// Runs `flowdeck` with `args` and captures the result.
    pub fn run(&self, args: &[&str]) -> Result<CliResult> {
        let output = self.command().args(args).output()?;
        Ok(CliResult {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a CLI invocation, mirroring the exit-code contract in
/// spec.md §6 (0 success, 1 user-error, 2 suspended, 3 config-error).
#[derive(Debug)]
pub struct CliResult {
    pub status: std::process::ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CliResult {
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }

    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.stdout)?)
    }
}
