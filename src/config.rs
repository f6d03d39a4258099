// src/config.rs

use crate::build::ArtifactPolicy;
use crate::cli::Args;
use crate::error::{MinerError, Result};
use crate::model::TagOrder;
use crate::toolchain::Toolchain;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "tag-miner.toml";

/// Everything a run needs to know, loaded from TOML and overridden by flags.
/// Relative directories are resolved against `root`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub repo_url: Option<String>,
    pub root: PathBuf,
    pub local_path: PathBuf,
    pub artifact_dir: PathBuf,
    pub results_dir: PathBuf,
    pub charts_dir: PathBuf,
    pub chart_width: u32,
    pub chart_height: u32,
    pub window_size: usize,
    pub order: TagOrder,
    pub build: BuildConfig,
    pub toolchains: ToolchainConfig,
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    pub executable: PathBuf,
    pub args: Vec<String>,
    /// Files whose presence marks a checked-out tree as buildable
    pub descriptors: Vec<String>,
    /// Build output directory, relative to the repository root
    pub output_dir: PathBuf,
    pub extension: String,
    pub exclude_suffixes: Vec<String>,
    pub artifact_policy: ArtifactPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainConfig {
    /// Positions below this index build with `newer`, the rest with `older`
    pub threshold: usize,
    pub verify: bool,
    pub newer: Toolchain,
    pub older: Toolchain,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub executable: PathBuf,
    /// Argument template; `{output}` and `{artifact}` are substituted per tag
    pub args: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            repo_url: None,
            root: PathBuf::from("."),
            local_path: PathBuf::from("repo"),
            artifact_dir: PathBuf::from("artifacts"),
            results_dir: PathBuf::from("results"),
            charts_dir: PathBuf::from("charts"),
            chart_width: 1280,
            chart_height: 720,
            window_size: 20,
            order: TagOrder::default(),
            build: BuildConfig::default(),
            toolchains: ToolchainConfig::default(),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            executable: PathBuf::from("gradle"),
            args: ["clean", "build", "-x", "test"].map(String::from).to_vec(),
            descriptors: ["build.gradle", "build.gradle.kts"].map(String::from).to_vec(),
            output_dir: PathBuf::from("build").join("libs"),
            extension: "jar".to_string(),
            exclude_suffixes: ["-sources.jar", "-javadoc.jar"].map(String::from).to_vec(),
            artifact_policy: ArtifactPolicy::default(),
        }
    }
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        ToolchainConfig {
            threshold: 3,
            verify: true,
            newer: Toolchain::new("21", None),
            older: Toolchain::new("19", None),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            executable: PathBuf::from("spotbugs"),
            args: ["-textui", "-effort:max", "-xml", "-output", "{output}", "{artifact}"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl Config {
    /// Loads `path` if given, otherwise `tag-miner.toml` in the current
    /// directory when present, otherwise the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| MinerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| MinerError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Command line flags win over file values.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(url) = &args.repo_url {
            self.repo_url = Some(url.clone());
        }
        if let Some(path) = &args.local_path {
            self.local_path = path.clone();
        }
        if let Some(window) = args.window {
            self.window_size = window;
        }
        if let Some(threshold) = args.threshold {
            self.toolchains.threshold = threshold;
        }
        if let Some(order) = args.order {
            self.order = order;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(MinerError::InvalidConfig("window_size must be at least 1".into()));
        }
        if self.chart_width < 64 || self.chart_height < 64 {
            return Err(MinerError::InvalidConfig("charts must be at least 64x64 pixels".into()));
        }
        if self.build.executable.as_os_str().is_empty() {
            return Err(MinerError::InvalidConfig("build.executable is empty".into()));
        }
        if self.build.descriptors.is_empty() {
            return Err(MinerError::InvalidConfig("build.descriptors is empty".into()));
        }
        for placeholder in ["{output}", "{artifact}"] {
            if !self.analysis.args.iter().any(|a| a.contains(placeholder)) {
                return Err(MinerError::InvalidConfig(format!(
                    "analysis.args must contain {placeholder}"
                )));
            }
        }
        Ok(())
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn repo_path(&self) -> PathBuf {
        self.resolve(&self.local_path)
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.resolve(&self.artifact_dir)
    }

    pub fn results_path(&self) -> PathBuf {
        self.resolve(&self.results_dir)
    }

    pub fn charts_path(&self) -> PathBuf {
        self.resolve(&self.charts_dir)
    }
}
