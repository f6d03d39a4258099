// src/analysis.rs

use crate::config::AnalysisConfig;
use crate::model::VersionTag;
use crate::process::{self, ToolRun};
use log::{info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const REPORT_EXTENSION: &str = "xml";

/// The external static-analysis collaborator.
pub trait Analyzer {
    /// Analyses `artifact` at maximum effort and writes an XML report to `output`.
    fn analyze(&self, artifact: &Path, output: &Path) -> ToolRun;
}

/// SpotBugs (or anything with the same calling convention) as a child process.
pub struct ProcessAnalyzer {
    executable: PathBuf,
    args: Vec<String>,
}

impl ProcessAnalyzer {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        ProcessAnalyzer {
            executable: config.executable.clone(),
            args: config.args.clone(),
        }
    }

    fn expand_args(&self, artifact: &Path, output: &Path) -> Vec<String> {
        let artifact = artifact.display().to_string();
        let output = output.display().to_string();
        self.args
            .iter()
            .map(|arg| arg.replace("{artifact}", &artifact).replace("{output}", &output))
            .collect()
    }
}

impl Analyzer for ProcessAnalyzer {
    fn analyze(&self, artifact: &Path, output: &Path) -> ToolRun {
        let cwd = artifact
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        process::run(&self.executable, &self.expand_args(artifact, output), cwd, &[])
    }
}

/// Flat directory of reports keyed by tag.
#[derive(Debug, Clone)]
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ReportStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)
    }

    pub fn report_path(&self, tag: &VersionTag) -> PathBuf {
        self.dir.join(format!("{}.{}", tag.key(), REPORT_EXTENSION))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Reported(PathBuf),
    Failed(String),
}

/// Runs the analyzer for one tag. On failure no report is left behind, so
/// the version reads as "no data" rather than as zero findings.
pub fn analyze_tag(analyzer: &dyn Analyzer, store: &ReportStore, artifact: &Path, tag: &VersionTag) -> AnalysisOutcome {
    if let Err(e) = store.ensure() {
        return AnalysisOutcome::Failed(format!("cannot create {}: {}", store.dir().display(), e));
    }

    let output = store.report_path(tag);
    // A report left by an earlier run must not pass for this run's output.
    discard_stale(&output);
    let run = analyzer.analyze(artifact, &output);

    if !run.success() {
        let reason = run.describe_failure();
        warn!("Analysis of {} failed: {}", tag.name, reason);
        discard_stale(&output);
        return AnalysisOutcome::Failed(reason);
    }

    if !output.is_file() {
        let reason = format!("analyzer exited cleanly but wrote no report to {}", output.display());
        warn!("Analysis of {} failed: {}", tag.name, reason);
        return AnalysisOutcome::Failed(reason);
    }

    info!("Analysis of {} saved to {}", tag.name, output.display());
    AnalysisOutcome::Reported(output)
}

fn discard_stale(output: &Path) {
    if output.exists() {
        if let Err(e) = fs::remove_file(output) {
            warn!("Could not remove report {}: {}", output.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ToolOutput;

    struct FakeSpotBugs {
        report: Option<&'static str>,
        exit_code: i32,
    }

    impl Analyzer for FakeSpotBugs {
        fn analyze(&self, _artifact: &Path, output: &Path) -> ToolRun {
            if let Some(body) = self.report {
                fs::write(output, body).unwrap();
            }
            ToolRun::Completed(ToolOutput {
                command: "spotbugs".into(),
                exit_code: Some(self.exit_code),
                stdout: String::new(),
                stderr: String::new(),
                duration_ms: 1,
            })
        }
    }

    fn tag(name: &str) -> VersionTag {
        VersionTag { name: name.into(), timestamp: 0, position: 0 }
    }

    #[test]
    fn expands_placeholders() {
        let analyzer = ProcessAnalyzer::from_config(&AnalysisConfig::default());
        let args = analyzer.expand_args(Path::new("/a/v1.jar"), Path::new("/r/v1.xml"));
        assert_eq!(args, ["-textui", "-effort:max", "-xml", "-output", "/r/v1.xml", "/a/v1.jar"]);
    }

    #[test]
    fn successful_run_yields_report_keyed_by_tag() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path().join("results"));
        let analyzer = FakeSpotBugs { report: Some("<BugCollection/>"), exit_code: 0 };

        let outcome = analyze_tag(&analyzer, &store, Path::new("v1.jar"), &tag("release/1.0"));
        assert_eq!(outcome, AnalysisOutcome::Reported(dir.path().join("results").join("release%2F1.0.xml")));
    }

    #[test]
    fn failed_run_leaves_no_report() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        let analyzer = FakeSpotBugs { report: Some("<BugColl"), exit_code: 2 };

        let outcome = analyze_tag(&analyzer, &store, Path::new("v1.jar"), &tag("v1"));
        assert!(matches!(outcome, AnalysisOutcome::Failed(_)));
        assert!(!store.report_path(&tag("v1")).exists());
    }

    #[test]
    fn clean_exit_without_report_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        let analyzer = FakeSpotBugs { report: None, exit_code: 0 };

        let outcome = analyze_tag(&analyzer, &store, Path::new("v1.jar"), &tag("v1"));
        assert!(matches!(outcome, AnalysisOutcome::Failed(_)));
    }

    #[test]
    fn previous_report_does_not_survive_a_silent_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        let previous = store.report_path(&tag("v1"));
        fs::write(&previous, "<BugCollection/>").unwrap();
        let analyzer = FakeSpotBugs { report: None, exit_code: 0 };

        let outcome = analyze_tag(&analyzer, &store, Path::new("v1.jar"), &tag("v1"));
        assert!(matches!(outcome, AnalysisOutcome::Failed(_)));
        assert!(!previous.exists());
    }

    #[test]
    fn rerun_replaces_the_previous_report() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        fs::write(store.report_path(&tag("v1")), "<BugCollection><BugInstance type=\"OLD\"/></BugCollection>").unwrap();
        let analyzer = FakeSpotBugs { report: Some("<BugCollection/>"), exit_code: 0 };

        let outcome = analyze_tag(&analyzer, &store, Path::new("v1.jar"), &tag("v1"));
        assert_eq!(outcome, AnalysisOutcome::Reported(store.report_path(&tag("v1"))));
        assert_eq!(fs::read_to_string(store.report_path(&tag("v1"))).unwrap(), "<BugCollection/>");
    }
}
