// src/reporter.rs

use crate::aggregate::Aggregate;
use crate::error::{MinerError, Result};
use crate::version;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Findings of one version, most frequent category first.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VersionBreakdown {
    pub version: String,
    pub total: u64,
    pub categories: Vec<(String, u64)>,
}

/// One point of the cross-version trend. `total` is `None` when the version
/// has no readable report, which is not the same as zero findings.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TrendPoint {
    pub version: String,
    pub total: Option<u64>,
}

impl TrendPoint {
    pub fn has_data(&self) -> bool {
        self.total.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct Report {
    pub breakdowns: Vec<VersionBreakdown>,
    pub trend: Vec<TrendPoint>,
}

impl Report {
    pub fn versions(&self) -> Vec<&str> {
        self.trend.iter().map(|p| p.version.as_str()).collect()
    }

    pub fn missing(&self) -> Vec<&str> {
        self.trend.iter().filter(|p| !p.has_data()).map(|p| p.version.as_str()).collect()
    }

    /// Every category seen in any version, alphabetically.
    pub fn categories(&self) -> Vec<&str> {
        let set: BTreeSet<&str> = self
            .breakdowns
            .iter()
            .flat_map(|b| b.categories.iter().map(|(c, _)| c.as_str()))
            .collect();
        set.into_iter().collect()
    }
}

/// Orders versions by precedence and derives the per-version breakdowns and
/// the trend. `expected` names versions that should have a report (the
/// mined window, cached artifacts); those without one show up as "no data".
pub fn build_report(aggregate: &Aggregate, expected: &[String]) -> Report {
    let mut versions: Vec<String> = aggregate
        .counts
        .keys()
        .cloned()
        .chain(expected.iter().cloned())
        .chain(aggregate.malformed.iter().map(|m| m.version.clone()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    version::sort_names(&mut versions);

    let mut report = Report::default();
    for version in versions {
        match aggregate.counts.get(&version) {
            Some(counts) => {
                let total = counts.values().sum();
                let mut categories: Vec<(String, u64)> = counts.iter().map(|(c, n)| (c.clone(), *n)).collect();
                categories.sort_by(|(ca, na), (cb, nb)| nb.cmp(na).then_with(|| ca.cmp(cb)));
                report.breakdowns.push(VersionBreakdown { version: version.clone(), total, categories });
                report.trend.push(TrendPoint { version, total: Some(total) });
            }
            None => report.trend.push(TrendPoint { version, total: None }),
        }
    }
    report
}

pub fn render_text(report: &Report) -> String {
    let mut out = String::new();
    for breakdown in &report.breakdowns {
        out.push_str(&format!("Release {}: {} findings\n", breakdown.version, breakdown.total));
        for (category, count) in &breakdown.categories {
            out.push_str(&format!("  {count:>6}  {category}\n"));
        }
    }

    out.push_str("Total findings per release:\n");
    let width = report.trend.iter().map(|p| p.version.len()).max().unwrap_or(0);
    for point in &report.trend {
        match point.total {
            Some(total) => out.push_str(&format!("  {:<width$}  {}\n", point.version, total)),
            None => out.push_str(&format!("  {:<width$}  no data\n", point.version)),
        }
    }
    out
}

pub fn write_json(report: &Report, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| MinerError::io(path, std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
    fs::write(path, json).map_err(|e| MinerError::io(path, e))
}
