// src/main.rs

use anyhow::{Context, Result};
use chrono::TimeZone;
use clap::Parser;
use std::collections::BTreeSet;
use std::time::Instant;
use tag_miner::analysis::{ProcessAnalyzer, ReportStore};
use tag_miner::build::{ArtifactSettings, BuildCache, BuildExecutor, ProcessBuildTool};
use tag_miner::cli::Args;
use tag_miner::config::Config;
use tag_miner::model::Window;
use tag_miner::pipeline::{self, Pipeline};
use tag_miner::toolchain::ToolchainSelector;
use tag_miner::vcs::{self, GitRepository};
use tag_miner::{aggregate, renderer, reporter};

const SUMMARY_FILE: &str = "summary.json";

fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let start_time = Instant::now();

    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    config.apply_args(&args);
    config.validate()?;
    // Child processes run in other directories; every derived path must be absolute.
    config.root = config
        .root
        .canonicalize()
        .with_context(|| format!("Root directory {} is not accessible", config.root.display()))?;

    let cache = BuildCache::new(config.artifact_path(), &config.build.extension);
    let mut expected: BTreeSet<String> = BTreeSet::new();

    if args.stage.mines() {
        let window = mine(&config, &cache)?;
        expected.extend(window.names());
    }

    if args.stage.reports() {
        expected.extend(cache.tag_names());
        let expected: Vec<String> = expected.into_iter().collect();
        report(&config, &expected)?;
    }

    println!("Total time: {:.2?}", start_time.elapsed());
    Ok(())
}

fn mine(config: &Config, cache: &BuildCache) -> Result<Window> {
    let mut repo = GitRepository::open_or_clone(&config.repo_path(), config.repo_url.as_deref())?;
    let window = vcs::enumerate(&repo, config.window_size, config.order)?;

    let span = window.tags.iter().map(|t| t.timestamp);
    if let (Some(oldest), Some(newest)) = (span.clone().min(), span.max()) {
        println!(
            "Mining {} tags, tagged between {} and {}.",
            window.len(),
            format_time(oldest),
            format_time(newest)
        );
    } else {
        println!("Repository has no tags, nothing to mine.");
    }

    let selector = ToolchainSelector::from_config(&config.toolchains);
    let tool = ProcessBuildTool::from_config(&config.build);
    let settings = ArtifactSettings::from_config(&config.build);
    let analyzer = ProcessAnalyzer::from_config(&config.analysis);
    let reports = ReportStore::new(config.results_path());

    let mut pipeline = Pipeline {
        vcs: &mut repo,
        selector: &selector,
        builder: BuildExecutor {
            cache,
            tool: &tool,
            settings: &settings,
            verify_toolchain: config.toolchains.verify,
        },
        analyzer: &analyzer,
        reports: &reports,
    };
    let summary = pipeline.run(&window);
    pipeline::print_summary(&summary);

    Ok(window)
}

fn report(config: &Config, expected: &[String]) -> Result<()> {
    let aggregate = aggregate::aggregate(&config.results_path())?;
    let report = reporter::build_report(&aggregate, expected);
    print!("{}", reporter::render_text(&report));

    let charts_dir = config.charts_path();
    let render_start = Instant::now();
    let written = renderer::render_charts(&report, &charts_dir, config.chart_width, config.chart_height)?;
    reporter::write_json(&report, &charts_dir.join(SUMMARY_FILE))?;
    println!(
        "Wrote {} charts and {} to {} in {:.2?}.",
        written.len(),
        SUMMARY_FILE,
        charts_dir.display(),
        render_start.elapsed()
    );
    Ok(())
}

fn format_time(seconds: i64) -> String {
    chrono::Utc
        .timestamp_opt(seconds, 0)
        .single()
        .map_or_else(|| seconds.to_string(), |t| t.to_rfc2822())
}
