// src/cli.rs

use crate::model::TagOrder;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the TOML configuration (defaults to ./tag-miner.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Remote URL to clone when the local checkout is missing
    #[arg(long)]
    pub repo_url: Option<String>,

    /// Local path of the repository checkout
    #[arg(long)]
    pub local_path: Option<PathBuf>,

    /// Maximum number of tags to mine
    #[arg(short, long)]
    pub window: Option<usize>,

    /// Number of leading tags built with the newer toolchain
    #[arg(long)]
    pub threshold: Option<usize>,

    /// Processing order of the window
    #[arg(long, value_enum)]
    pub order: Option<TagOrder>,

    /// Which part of the pipeline to run
    #[arg(long, value_enum, default_value_t = Stage::All)]
    pub stage: Stage,

    /// Log debug output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(clap::ValueEnum, Clone, Debug, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    /// Check out, build and analyse every tag of the window
    Mine,
    /// Aggregate the reports already on disk and render charts
    Report,
    /// Mine, then report
    #[default]
    All,
}

impl Stage {
    pub fn mines(self) -> bool {
        matches!(self, Stage::Mine | Stage::All)
    }

    pub fn reports(self) -> bool {
        matches!(self, Stage::Report | Stage::All)
    }
}
