// src/aggregate.rs

use crate::analysis::REPORT_EXTENSION;
use crate::error::{MinerError, Result};
use crate::model::{tag_name, CategoryCounts, CountTable};
use log::{debug, info, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const FINDING_ELEMENT: &[u8] = b"BugInstance";
const CATEGORY_ATTRIBUTE: &str = "type";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("cannot read report: {0}")]
    Read(#[from] std::io::Error),

    #[error("invalid XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("report has no root element")]
    Empty,

    #[error("report ends inside {0} open element(s)")]
    Truncated(usize),
}

#[derive(Debug, Clone)]
pub struct MalformedReport {
    pub version: String,
    pub path: PathBuf,
    pub reason: String,
}

/// Category counts per version, plus the reports that could not be read.
#[derive(Debug, Default)]
pub struct Aggregate {
    pub counts: CountTable,
    pub malformed: Vec<MalformedReport>,
}

impl Aggregate {
    pub fn total_findings(&self) -> u64 {
        self.counts.values().flat_map(|c| c.values()).sum()
    }
}

/// Counts `BugInstance` children of the root element by their `type`.
/// Findings without a type are ignored.
pub fn parse_report(xml: &str) -> std::result::Result<CategoryCounts, ReportError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut counts = CategoryCounts::new();
    let mut depth = 0usize;
    let mut saw_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                if depth == 1 {
                    count_finding(&element, &mut counts)?;
                }
                saw_root = true;
                depth += 1;
            }
            Event::Empty(element) => {
                if depth == 1 {
                    count_finding(&element, &mut counts)?;
                }
                saw_root = true;
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(ReportError::Empty);
    }
    if depth > 0 {
        return Err(ReportError::Truncated(depth));
    }
    Ok(counts)
}

fn count_finding(element: &BytesStart, counts: &mut CategoryCounts) -> std::result::Result<(), ReportError> {
    if element.local_name().as_ref() != FINDING_ELEMENT {
        return Ok(());
    }
    if let Some(attr) = element.try_get_attribute(CATEGORY_ATTRIBUTE)? {
        let category = attr.unescape_value()?;
        if !category.is_empty() {
            *counts.entry(category.into_owned()).or_insert(0) += 1;
        }
    }
    Ok(())
}

pub fn parse_report_file(path: &Path) -> std::result::Result<CategoryCounts, ReportError> {
    let text = fs::read_to_string(path)?;
    parse_report(&text)
}

/// Reads every report in `dir`. A report that fails to parse is recorded in
/// `malformed` and does not stop the others. A missing directory simply
/// means nothing has been analysed yet.
pub fn aggregate(dir: &Path) -> Result<Aggregate> {
    let mut aggregate = Aggregate::default();
    if !dir.exists() {
        warn!("Results directory {} does not exist yet", dir.display());
        return Ok(aggregate);
    }

    let entries = fs::read_dir(dir).map_err(|e| MinerError::io(dir, e))?;
    let mut reports: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == REPORT_EXTENSION))
        .collect();
    reports.sort();

    for path in reports {
        let Some(version) = path.file_stem().and_then(|s| s.to_str()).map(tag_name) else {
            warn!("Skipping report with a non UTF-8 name: {}", path.display());
            continue;
        };
        info!("Reading {} (version {})", path.display(), version);

        match parse_report_file(&path) {
            Ok(counts) => {
                debug!("{}: {} categories, {} findings", version, counts.len(), counts.values().sum::<u64>());
                aggregate.counts.insert(version, counts);
            }
            Err(e) => {
                warn!("Skipping malformed report {}: {}", path.display(), e);
                aggregate.malformed.push(MalformedReport { version, path, reason: e.to_string() });
            }
        }
    }

    Ok(aggregate)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<BugCollection version="4.8.6" sequence="0" timestamp="1727900000000" analysisTimestamp="1727900000000" release="">
  <Project projectName=""><Jar>/artifacts/v5.14.2.jar</Jar></Project>
  <BugInstance type="EI_EXPOSE_REP" priority="2" rank="18" abbrev="EI" category="MALICIOUS_CODE">
    <ShortMessage>May expose internal representation</ShortMessage>
    <Class classname="org.mockito.Foo"><SourceLine classname="org.mockito.Foo"/></Class>
  </BugInstance>
  <BugInstance type="EI_EXPOSE_REP" priority="2" rank="18" abbrev="EI" category="MALICIOUS_CODE"/>
  <BugInstance type="NP_NULL_ON_SOME_PATH" priority="1" rank="6" abbrev="NP" category="CORRECTNESS"/>
  <BugInstance priority="3"/>
  <BugCategory category="CORRECTNESS"><Description>Correctness</Description></BugCategory>
  <BugPattern type="NP_NULL_ON_SOME_PATH" abbrev="NP" category="CORRECTNESS"/>
  <Errors errors="0" missingClasses="0"/>
  <FindBugsSummary total_bugs="3"/>
</BugCollection>
"#;

    #[test]
    fn counts_findings_by_type() {
        let counts = parse_report(REPORT).unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts["EI_EXPOSE_REP"], 2);
        assert_eq!(counts["NP_NULL_ON_SOME_PATH"], 1);
    }

    #[test]
    fn nested_bug_instances_are_not_counted() {
        let xml = r#"<BugCollection><Wrapper><BugInstance type="X"/></Wrapper></BugCollection>"#;
        assert!(parse_report(xml).unwrap().is_empty());
    }

    #[test]
    fn report_without_findings_is_empty_not_an_error() {
        let counts = parse_report(r#"<BugCollection version="4.8.6"><Errors errors="0"/></BugCollection>"#).unwrap();
        assert!(counts.is_empty());
        assert!(parse_report("<BugCollection/>").unwrap().is_empty());
    }

    #[test]
    fn truncated_and_empty_reports_are_rejected() {
        let truncated = &REPORT[..REPORT.len() / 2];
        assert!(parse_report(truncated).is_err());
        assert!(matches!(parse_report(""), Err(ReportError::Empty)));
        assert!(parse_report("<BugCollection><BugInstance type=\"A\"></Oops></BugCollection>").is_err());
    }

    #[test]
    fn malformed_file_does_not_stop_aggregation() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("1.9.xml"), REPORT).unwrap();
        fs::write(dir.path().join("1.10.xml"), "<BugCollection><BugInstance type=").unwrap();
        fs::write(dir.path().join("2.0.xml"), "<BugCollection/>").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let aggregate = aggregate(dir.path()).unwrap();
        assert_eq!(aggregate.counts.len(), 2);
        assert_eq!(aggregate.counts["1.9"]["EI_EXPOSE_REP"], 2);
        assert!(aggregate.counts["2.0"].is_empty());
        assert_eq!(aggregate.malformed.len(), 1);
        assert_eq!(aggregate.malformed[0].version, "1.10");
        assert_eq!(aggregate.total_findings(), 3);
    }

    #[test]
    fn versions_are_read_back_as_tag_names() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("release%2F1.0.xml"), REPORT).unwrap();
        fs::write(dir.path().join("release_1.0.xml"), "<BugCollection/>").unwrap();

        let aggregate = aggregate(dir.path()).unwrap();
        assert_eq!(aggregate.counts["release/1.0"]["EI_EXPOSE_REP"], 2);
        assert!(aggregate.counts["release_1.0"].is_empty());
    }

    #[test]
    fn missing_directory_aggregates_to_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let aggregate = aggregate(&dir.path().join("absent")).unwrap();
        assert!(aggregate.counts.is_empty());
        assert!(aggregate.malformed.is_empty());
    }
}
