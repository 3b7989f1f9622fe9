//! Module version parsing and ordering.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    static ref VERSION_RE: Regex = Regex::new(
        r"^\s*[0-9]+(?:\.[0-9a-zA-Z]+)*(?:-[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*)?\s*$"
    )
    .unwrap();

    static ref SEGMENT_RE: Regex = Regex::new(r"[0-9]+|[a-zA-Z]+").unwrap();
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version string \"{0}\"")]
    Invalid(String),
}

/// One dot-separated piece of a version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Number(u64),
    Text(String),
}

impl Segment {
    fn is_zero(&self) -> bool {
        matches!(self, Segment::Number(0))
    }
}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Segment::Number(a), Segment::Number(b)) => a.cmp(b),
            (Segment::Text(a), Segment::Text(b)) => a.cmp(b),
            // Pre-release text always sorts below a release number.
            (Segment::Text(_), Segment::Number(_)) => Ordering::Less,
            (Segment::Number(_), Segment::Text(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A parsed module version.
///
/// The original string is kept for display so that `1.0` stays `1.0` even
/// though it compares equal to `1.0.0`.
#[derive(Debug, Clone)]
pub struct Version {
    original: String,
    segments: Vec<Segment>,
    canonical: Vec<Segment>,
}

impl Version {
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        if !VERSION_RE.is_match(input) {
            return Err(VersionError::Invalid(input.to_string()));
        }

        let trimmed = input.trim();
        let expanded = trimmed.replace('-', ".pre.");

        let mut segments = Vec::new();
        for m in SEGMENT_RE.find_iter(&expanded) {
            let part = m.as_str();
            if part.as_bytes()[0].is_ascii_digit() {
                let n = part
                    .parse::<u64>()
                    .map_err(|_| VersionError::Invalid(input.to_string()))?;
                segments.push(Segment::Number(n));
            } else {
                segments.push(Segment::Text(part.to_string()));
            }
        }

        let canonical = canonicalize(&segments);

        Ok(Self {
            original: trimmed.to_string(),
            segments,
            canonical,
        })
    }

    /// Whether `input` is syntactically a version.
    pub fn is_valid(input: &str) -> bool {
        Self::parse(input).is_ok()
    }

    pub fn as_str(&self) -> &str {
        &self.original
    }

    pub fn is_prerelease(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Text(_)))
    }

    /// The numeric release part, without any pre-release suffix.
    pub fn release(&self) -> Vec<u64> {
        self.segments
            .iter()
            .map_while(|s| match s {
                Segment::Number(n) => Some(*n),
                Segment::Text(_) => None,
            })
            .collect()
    }

    /// Upper bound used by the pessimistic operator: `1.2.3` bumps to `1.3`,
    /// `1.2` bumps to `2`.
    ///
    /// Returns `None` when the bumped segment would overflow.
    pub fn bump(&self) -> Option<Version> {
        let mut release = self.release();
        if release.len() > 1 {
            release.pop();
        }
        if let Some(last) = release.last_mut() {
            *last = last.checked_add(1)?;
        }

        Some(Version::from_release(&release))
    }

    pub(crate) fn from_release(release: &[u64]) -> Version {
        let text = release
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(".");
        let segments: Vec<Segment> = release.iter().copied().map(Segment::Number).collect();
        let canonical = canonicalize(&segments);
        Version {
            original: text,
            segments,
            canonical,
        }
    }
}

/// Drop trailing zeros from the release part and from the pre-release part
/// separately, so `1.0.0` == `1` and `1.0.rc.0` == `1.rc`.
fn canonicalize(segments: &[Segment]) -> Vec<Segment> {
    let split = segments
        .iter()
        .position(|s| matches!(s, Segment::Text(_)))
        .unwrap_or(segments.len());

    let (release, pre) = segments.split_at(split);
    let mut out = trim_zeros(release);
    out.extend(trim_zeros(pre));
    out
}

fn trim_zeros(part: &[Segment]) -> Vec<Segment> {
    let end = part
        .iter()
        .rposition(|s| !s.is_zero())
        .map(|i| i + 1)
        .unwrap_or(0);
    part[..end].to_vec()
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.canonical.len().max(other.canonical.len());
        let zero = Segment::Number(0);

        for i in 0..len {
            let lhs = self.canonical.get(i).unwrap_or(&zero);
            let rhs = other.canonical.get(i).unwrap_or(&zero);
            match lhs.cmp(rhs) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }

        Ordering::Equal
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

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl std::str::FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}
