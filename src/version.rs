// src/version.rs

//! Semantic-version-aware ordering of tag names.
//!
//! Tag names are parsed leniently: any leading non-digit prefix (`v`,
//! `release-`, `project-`) is dropped, dot-separated numeric components form
//! the release, and whatever follows is a pre-release label. Comparison is
//! numeric per component, so `2.10` sorts after `2.9`.

use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Identifier {
    Numeric(u64),
    Alpha(String),
}

#[derive(Debug, Clone)]
pub struct Version {
    release: Vec<u64>,
    pre: Vec<Identifier>,
    raw: String,
}

/// Labels some projects put on final releases; they do not make a pre-release.
const RELEASE_LABELS: &[&str] = &["final", "release", "ga"];

impl Version {
    pub fn parse(raw: &str) -> Option<Version> {
        let start = raw.find(|c: char| c.is_ascii_digit())?;
        let body = &raw[start..];
        // Build metadata never takes part in precedence.
        let body = body.split('+').next().unwrap_or(body);

        let mut release = Vec::new();
        let mut rest = body;
        loop {
            let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
            if end == 0 {
                break;
            }
            release.push(rest[..end].parse().ok()?);
            rest = &rest[end..];
            match rest.strip_prefix('.') {
                Some(next) if next.starts_with(|c: char| c.is_ascii_digit()) => rest = next,
                _ => break,
            }
        }

        let pre = rest
            .split(['.', '-', '_'])
            .filter(|part| !part.is_empty())
            .map(|part| match part.parse::<u64>() {
                Ok(n) => Identifier::Numeric(n),
                Err(_) => Identifier::Alpha(part.to_ascii_lowercase()),
            })
            .filter(|id| !matches!(id, Identifier::Alpha(label) if RELEASE_LABELS.contains(&label.as_str())))
            .collect();

        Some(Version { release, pre, raw: raw.to_string() })
    }

    pub fn release(&self) -> &[u64] {
        &self.release
    }

    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }

    fn cmp_release(&self, other: &Self) -> Ordering {
        let len = self.release.len().max(other.release.len());
        (0..len)
            .map(|i| {
                let a = self.release.get(i).copied().unwrap_or(0);
                let b = other.release.get(i).copied().unwrap_or(0);
                a.cmp(&b)
            })
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    fn cmp_pre(&self, other: &Self) -> Ordering {
        match (self.pre.is_empty(), other.pre.is_empty()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.pre.cmp(&other.pre),
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_release(other)
            .then_with(|| self.cmp_pre(other))
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

/// Total order over tag names: parseable versions by precedence, then names
/// without any version number in plain string order.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    match (Version::parse(a), Version::parse(b)) {
        (Some(va), Some(vb)) => va.cmp(&vb),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

pub fn sort_names<S: AsRef<str>>(names: &mut [S]) {
    names.sort_by(|a, b| compare_names(a.as_ref(), b.as_ref()));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(input: &[&str]) -> Vec<String> {
        let mut names: Vec<String> = input.iter().map(|s| s.to_string()).collect();
        sort_names(&mut names);
        names
    }

    #[test]
    fn numeric_not_lexical() {
        assert_eq!(sorted(&["2.0", "1.10", "1.9"]), ["1.9", "1.10", "2.0"]);
        assert_eq!(sorted(&["1.10", "2.0", "1.9"]), ["1.9", "1.10", "2.0"]);
        assert_eq!(sorted(&["v2.10.0", "v2.9.3"]), ["v2.9.3", "v2.10.0"]);
    }

    #[test]
    fn prefixes_are_ignored() {
        let v = Version::parse("release-5.14.2").unwrap();
        assert_eq!(v.release(), [5, 14, 2]);
        assert!(!v.is_prerelease());
        assert_eq!(compare_names("v3.0", "mockito-2.9"), Ordering::Greater);
    }

    #[test]
    fn prerelease_sorts_before_release() {
        assert_eq!(
            sorted(&["2.0.0", "2.0.0-beta.2", "2.0.0-beta.10", "2.0.0-alpha", "1.9"]),
            ["1.9", "2.0.0-alpha", "2.0.0-beta.2", "2.0.0-beta.10", "2.0.0"]
        );
        assert!(Version::parse("5.0.0-RC1").unwrap().is_prerelease());
    }

    #[test]
    fn release_labels_are_not_prereleases() {
        let v = Version::parse("1.0.0.Final").unwrap();
        assert_eq!(v.release(), [1, 0, 0]);
        assert!(!v.is_prerelease());
    }

    #[test]
    fn trailing_zeros_compare_equal_but_order_stays_total() {
        let short = Version::parse("2.0").unwrap();
        let long = Version::parse("2.0.0").unwrap();
        assert_eq!(short.cmp_release(&long), Ordering::Equal);
        assert_ne!(short, long);
    }

    #[test]
    fn build_metadata_is_ignored() {
        let v = Version::parse("1.2.3+build.7").unwrap();
        assert_eq!(v.release(), [1, 2, 3]);
        assert!(!v.is_prerelease());
    }

    #[test]
    fn unversioned_names_sort_last() {
        assert!(Version::parse("nightly").is_none());
        assert_eq!(sorted(&["nightly", "1.0", "latest"]), ["1.0", "latest", "nightly"]);
    }
}
