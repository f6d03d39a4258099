// src/pipeline.rs

use crate::analysis::{self, AnalysisOutcome, Analyzer, ReportStore};
use crate::build::{BuildExecutor, BuildOutcome};
use crate::model::{RunSummary, TagStatus, VersionTag, Window};
use crate::toolchain::ToolchainSelector;
use crate::vcs::{self, Transition, VersionControl};
use indicatif::ProgressBar;
use log::{debug, info};

/// Drives every tag of a window through checkout, build and analysis, one
/// tag at a time. The working tree is shared, so nothing here runs in
/// parallel.
pub struct Pipeline<'a> {
    pub vcs: &'a mut dyn VersionControl,
    pub selector: &'a ToolchainSelector,
    pub builder: BuildExecutor<'a>,
    pub analyzer: &'a dyn Analyzer,
    pub reports: &'a ReportStore,
}

impl Pipeline<'_> {
    /// Never fails: every problem is scoped to its tag and recorded in the summary.
    pub fn run(&mut self, window: &Window) -> RunSummary {
        let mut summary = RunSummary::new(window.len());

        let bar = ProgressBar::new(window.len() as u64);
        for tag in &window.tags {
            bar.set_message(tag.name.clone());
            let status = self.process(tag);
            info!("{} finished as {:?}", tag.name, status);
            summary.record(&tag.name, status);
            bar.inc(1);
        }
        bar.finish_with_message("Mining complete");

        summary
    }

    fn process(&mut self, tag: &VersionTag) -> TagStatus {
        match vcs::transition(&mut *self.vcs, tag) {
            Transition::CheckedOut { shelved } => {
                debug!("Checked out {} (local changes shelved: {})", tag.name, shelved);
            }
            Transition::Failed(_) => return TagStatus::CheckoutFailed,
        }

        let toolchain = self.selector.select(tag.position);
        let worktree = self.vcs.workdir().to_path_buf();

        let artifact = match self.builder.build(&worktree, tag, toolchain) {
            BuildOutcome::Cached(path) | BuildOutcome::Built(path) => path,
            BuildOutcome::NotBuildable => return TagStatus::NotBuildable,
            BuildOutcome::Failed(_) => return TagStatus::BuildFailed,
        };

        match analysis::analyze_tag(self.analyzer, self.reports, &artifact, tag) {
            AnalysisOutcome::Reported(_) => TagStatus::Complete,
            AnalysisOutcome::Failed(_) => TagStatus::Partial,
        }
    }
}

pub fn print_summary(summary: &RunSummary) {
    println!(
        "Processed {} of {} requested tags: {} complete, {} partial (no report), {} not buildable, {} build failed, {} checkout failed.",
        summary.tags.len(),
        summary.requested,
        summary.count(&TagStatus::Complete),
        summary.count(&TagStatus::Partial),
        summary.count(&TagStatus::NotBuildable),
        summary.count(&TagStatus::BuildFailed),
        summary.count(&TagStatus::CheckoutFailed),
    );
}
