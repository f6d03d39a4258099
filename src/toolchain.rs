// src/toolchain.rs

use crate::config::ToolchainConfig;
use crate::process::{self, ToolRun};
use serde::{Deserialize, Serialize};
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// A compiler installation. Without a `home` the ambient `PATH` is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toolchain {
    pub version: String,
    #[serde(default)]
    pub home: Option<PathBuf>,
}

impl Toolchain {
    pub fn new(version: &str, home: Option<PathBuf>) -> Self {
        Toolchain { version: version.to_string(), home }
    }

    pub fn compiler(&self) -> PathBuf {
        match &self.home {
            Some(home) => home.join("bin").join("javac"),
            None => PathBuf::from("javac"),
        }
    }

    /// Environment overrides that make a child process use this toolchain.
    pub fn env(&self) -> Vec<(String, OsString)> {
        let Some(home) = &self.home else {
            return Vec::new();
        };

        let mut paths = vec![home.join("bin")];
        if let Some(existing) = env::var_os("PATH") {
            paths.extend(env::split_paths(&existing));
        }
        let mut vars = vec![("JAVA_HOME".to_string(), home.clone().into_os_string())];
        if let Ok(joined) = env::join_paths(paths) {
            vars.push(("PATH".to_string(), joined));
        }
        vars
    }

    /// Runs `javac -version` from this toolchain.
    pub fn probe(&self, cwd: &Path) -> ToolRun {
        process::run(&self.compiler(), &["-version".to_string()], cwd, &[])
    }
}

/// Maps a window position to the toolchain that builds it. The choice
/// depends on nothing but the position.
#[derive(Debug, Clone)]
pub struct ToolchainSelector {
    threshold: usize,
    newer: Toolchain,
    older: Toolchain,
}

impl ToolchainSelector {
    pub fn new(threshold: usize, newer: Toolchain, older: Toolchain) -> Self {
        ToolchainSelector { threshold, newer, older }
    }

    pub fn from_config(config: &ToolchainConfig) -> Self {
        Self::new(config.threshold, config.newer.clone(), config.older.clone())
    }

    pub fn select(&self, position: usize) -> &Toolchain {
        if position < self.threshold {
            &self.newer
        } else {
            &self.older
        }
    }
}
