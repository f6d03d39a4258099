// src/build.rs

use crate::config::BuildConfig;
use crate::model::{tag_name, VersionTag};
use crate::process::{self, ToolRun};
use crate::toolchain::Toolchain;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// How to pick the artifact when the build output holds several candidates.
/// Candidates are always considered in file name order.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactPolicy {
    /// First candidate by file name
    #[default]
    FirstMatch,
    /// Exactly one candidate, anything else fails the tag
    Unique,
    /// Most recently modified candidate
    Newest,
    /// First candidate whose file name contains the tag's version number
    MatchTag,
}

/// The external build collaborator.
pub trait BuildTool {
    /// Clean build without tests, run in `worktree` with `toolchain` active.
    fn build(&self, worktree: &Path, toolchain: &Toolchain) -> ToolRun;

    fn probe_toolchain(&self, worktree: &Path, toolchain: &Toolchain) -> ToolRun {
        toolchain.probe(worktree)
    }
}

/// A build tool driven as a child process, Gradle by default.
pub struct ProcessBuildTool {
    executable: PathBuf,
    args: Vec<String>,
}

impl ProcessBuildTool {
    pub fn from_config(config: &BuildConfig) -> Self {
        ProcessBuildTool {
            executable: config.executable.clone(),
            args: config.args.clone(),
        }
    }
}

impl BuildTool for ProcessBuildTool {
    fn build(&self, worktree: &Path, toolchain: &Toolchain) -> ToolRun {
        process::run(&self.executable, &self.args, worktree, &toolchain.env())
    }
}

/// Flat directory of artifacts keyed by tag.
#[derive(Debug, Clone)]
pub struct BuildCache {
    dir: PathBuf,
    extension: String,
}

impl BuildCache {
    pub fn new(dir: impl Into<PathBuf>, extension: &str) -> Self {
        BuildCache {
            dir: dir.into(),
            extension: extension.to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn artifact_path(&self, tag: &VersionTag) -> PathBuf {
        self.dir.join(format!("{}.{}", tag.key(), self.extension))
    }

    pub fn cached(&self, tag: &VersionTag) -> Option<PathBuf> {
        let path = self.artifact_path(tag);
        is_valid_artifact(&path).then_some(path)
    }

    /// Tag names of every valid artifact in the cache.
    pub fn tag_names(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == self.extension.as_str()))
            .filter(|p| is_valid_artifact(p))
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(tag_name))
            .collect();
        names.sort();
        names
    }

    /// Moves `candidate` into the cache under the tag's key.
    pub fn store(&self, candidate: &Path, tag: &VersionTag) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let target = self.artifact_path(tag);
        if fs::rename(candidate, &target).is_err() {
            // Across filesystems a rename is not possible.
            fs::copy(candidate, &target)?;
            fs::remove_file(candidate)?;
        }
        Ok(target)
    }
}

/// Non-empty and readable.
pub fn is_valid_artifact(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.len() > 0 && File::open(path).is_ok(),
        Err(_) => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// A valid artifact was already cached; nothing was built
    Cached(PathBuf),
    Built(PathBuf),
    /// The checked-out tree has no build descriptor
    NotBuildable,
    Failed(String),
}

impl BuildOutcome {
    pub fn artifact(&self) -> Option<&Path> {
        match self {
            BuildOutcome::Cached(path) | BuildOutcome::Built(path) => Some(path),
            _ => None,
        }
    }
}

/// Where builds put their output and how to pick from it.
#[derive(Debug, Clone)]
pub struct ArtifactSettings {
    pub descriptors: Vec<String>,
    pub output_dir: PathBuf,
    pub extension: String,
    pub exclude_suffixes: Vec<String>,
    pub policy: ArtifactPolicy,
}

impl ArtifactSettings {
    pub fn from_config(config: &BuildConfig) -> Self {
        ArtifactSettings {
            descriptors: config.descriptors.clone(),
            output_dir: config.output_dir.clone(),
            extension: config.extension.clone(),
            exclude_suffixes: config.exclude_suffixes.clone(),
            policy: config.artifact_policy,
        }
    }
}

pub struct BuildExecutor<'a> {
    pub cache: &'a BuildCache,
    pub tool: &'a dyn BuildTool,
    pub settings: &'a ArtifactSettings,
    pub verify_toolchain: bool,
}

impl BuildExecutor<'_> {
    /// Produces the artifact for `tag` from the tree checked out at `worktree`,
    /// unless the cache already holds a valid one.
    pub fn build(&self, worktree: &Path, tag: &VersionTag, toolchain: &Toolchain) -> BuildOutcome {
        if let Some(path) = self.cache.cached(tag) {
            info!("Artifact for {} found at {}, skipping build", tag.name, path.display());
            return BuildOutcome::Cached(path);
        }

        if !self.settings.descriptors.iter().any(|d| worktree.join(d).is_file()) {
            warn!("No build descriptor for {}, skipping", tag.name);
            return BuildOutcome::NotBuildable;
        }

        if self.verify_toolchain {
            let probe = self.tool.probe_toolchain(worktree, toolchain);
            if !probe.success() {
                let reason = format!("toolchain {} unavailable: {}", toolchain.version, probe.describe_failure());
                warn!("Build of {} failed: {}", tag.name, reason);
                return BuildOutcome::Failed(reason);
            }
        }

        info!("Building {} with toolchain {}", tag.name, toolchain.version);
        let run = self.tool.build(worktree, toolchain);
        if !run.success() {
            let reason = run.describe_failure();
            warn!("Build of {} failed: {}", tag.name, reason);
            return BuildOutcome::Failed(reason);
        }

        let output_dir = worktree.join(&self.settings.output_dir);
        let candidate = match select_artifact(&output_dir, self.settings, &tag.name) {
            Ok(candidate) => candidate,
            Err(reason) => {
                warn!("Build of {} produced no usable artifact: {}", tag.name, reason);
                return BuildOutcome::Failed(reason);
            }
        };

        match self.cache.store(&candidate, tag) {
            Ok(path) if is_valid_artifact(&path) => {
                debug!("Moved {} to {}", candidate.display(), path.display());
                BuildOutcome::Built(path)
            }
            Ok(path) => BuildOutcome::Failed(format!("artifact {} is empty or unreadable", path.display())),
            Err(e) => BuildOutcome::Failed(format!("could not store {}: {}", candidate.display(), e)),
        }
    }
}

/// Picks one artifact out of the build output according to the policy.
pub fn select_artifact(output_dir: &Path, settings: &ArtifactSettings, tag: &str) -> Result<PathBuf, String> {
    let entries = fs::read_dir(output_dir)
        .map_err(|e| format!("cannot read build output {}: {}", output_dir.display(), e))?;

    let mut candidates: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| p.extension().is_some_and(|ext| ext == settings.extension.as_str()))
        .filter(|p| {
            let name = file_name(p);
            !settings.exclude_suffixes.iter().any(|s| name.ends_with(s.as_str()))
        })
        .collect();
    candidates.sort();

    if candidates.is_empty() {
        return Err(format!("no .{} file in {}", settings.extension, output_dir.display()));
    }

    match settings.policy {
        ArtifactPolicy::FirstMatch => {
            if candidates.len() > 1 {
                debug!("{} candidates for {}, taking the first", candidates.len(), tag);
            }
            Ok(candidates.swap_remove(0))
        }
        ArtifactPolicy::Unique => {
            if candidates.len() == 1 {
                Ok(candidates.swap_remove(0))
            } else {
                let names: Vec<String> = candidates.iter().map(|p| file_name(p)).collect();
                Err(format!("expected one artifact, found {}: {}", names.len(), names.join(", ")))
            }
        }
        ArtifactPolicy::Newest => {
            let mut newest: Option<(SystemTime, PathBuf)> = None;
            for path in candidates {
                let modified = fs::metadata(&path)
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                if newest.as_ref().map_or(true, |(best, _)| modified > *best) {
                    newest = Some((modified, path));
                }
            }
            newest.map(|(_, path)| path).ok_or_else(|| "no candidate".to_string())
        }
        ArtifactPolicy::MatchTag => {
            let number = tag.trim_start_matches(|c: char| !c.is_ascii_digit());
            if number.is_empty() {
                return Err(format!("tag {tag} carries no version number to match"));
            }
            candidates
                .into_iter()
                .find(|p| file_name(p).contains(number))
                .ok_or_else(|| format!("no artifact name contains {number}"))
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
