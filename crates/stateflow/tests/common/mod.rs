#![allow(dead_code)]
#![allow(deprecated)]

use assert_cmd::Command;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Scratch working directory so no real configuration file is picked up
pub struct TestDir {
    pub root: TempDir,
}

impl TestDir {
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
        }
    }

    pub fn write_config(&self, content: &str) {
        fs::write(self.root.path().join("stateflow.yaml"), content).unwrap();
    }

    /// Short poll delays so end-to-end runs finish quickly
    pub fn write_fast_config(&self) {
        self.write_config(
            "defaults:\n  backoff:\n    min_delay_ms: 20\n    max_delay_ms: 50\n",
        );
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// `stateflow` binary running inside this directory with a clean environment
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("stateflow").unwrap();
        cmd.current_dir(self.path())
            .env_remove("STATEFLOW_CONFIG_PATH")
            .env_remove("STATEFLOW_BASE_URL")
            .env_remove("STATEFLOW_TOKEN")
            .env("HOME", self.path())
            .env("XDG_CONFIG_HOME", self.path().join(".config"))
            .env("RUST_LOG", "warn")
            .env("NO_COLOR", "1");
        cmd
    }
}
