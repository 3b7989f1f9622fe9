//! Version requirements as written in module descriptors.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::version::Version;

lazy_static! {
    static ref TERM_RE: Regex = Regex::new(
        r"(?:(>=|<=|!=|~>|==|=|>|<)\s*)?(\*|[xX]|[0-9][0-9A-Za-z.\-]*)"
    )
    .unwrap();

    static ref RANGE_RE: Regex = Regex::new(
        r"^\s*([0-9][0-9A-Za-z.]*)\s+-\s+([0-9][0-9A-Za-z.]*)\s*$"
    )
    .unwrap();
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequirementError {
    #[error("Could not parse version requirement \"{requirement}\": {reason}")]
    Parse { requirement: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Pessimistic,
}

impl Operator {
    fn from_token(token: &str) -> Self {
        match token {
            ">=" => Operator::GreaterEqual,
            "<=" => Operator::LessEqual,
            "!=" => Operator::NotEqual,
            "~>" => Operator::Pessimistic,
            ">" => Operator::Greater,
            "<" => Operator::Less,
            _ => Operator::Equal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::Greater => ">",
            Operator::GreaterEqual => ">=",
            Operator::Less => "<",
            Operator::LessEqual => "<=",
            Operator::Pessimistic => "~>",
        }
    }
}

/// A single `operator version` comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub operator: Operator,
    pub version: Version,
}

impl Predicate {
    fn new(operator: Operator, version: Version) -> Self {
        Self { operator, version }
    }

    pub fn matches(&self, candidate: &Version) -> bool {
        match self.operator {
            Operator::Equal => candidate == &self.version,
            Operator::NotEqual => candidate != &self.version,
            Operator::Greater => candidate > &self.version,
            Operator::GreaterEqual => candidate >= &self.version,
            Operator::Less => candidate < &self.version,
            Operator::LessEqual => candidate <= &self.version,
            Operator::Pessimistic => {
                candidate >= &self.version
                    && self.version.bump().map_or(true, |upper| candidate < &upper)
            }
        }
    }
}

/// A parsed requirement: alternatives separated by `||`, each a conjunction
/// of predicates.
///
/// An empty requirement, `*` and `x` match everything.
#[derive(Debug, Clone)]
pub struct Requirement {
    raw: String,
    alternatives: Vec<Vec<Predicate>>,
}

impl Requirement {
    pub fn parse(input: &str) -> Result<Self, RequirementError> {
        let mut alternatives = Vec::new();

        for part in input.split("||") {
            alternatives.push(parse_conjunction(input, part)?);
        }

        Ok(Self {
            raw: input.trim().to_string(),
            alternatives,
        })
    }

    /// The requirement that accepts any version.
    pub fn any() -> Self {
        Self {
            raw: ">= 0".to_string(),
            alternatives: vec![vec![Predicate::new(
                Operator::GreaterEqual,
                Version::from_release(&[0]),
            )]],
        }
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives
            .iter()
            .any(|all| all.iter().all(|p| p.matches(version)))
    }

    pub fn matches_str(&self, version: &str) -> bool {
        Version::parse(version)
            .map(|v| self.matches(&v))
            .unwrap_or(false)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl PartialEq for Requirement {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Requirement {}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_error(requirement: &str, reason: impl Into<String>) -> RequirementError {
    RequirementError::Parse {
        requirement: requirement.to_string(),
        reason: reason.into(),
    }
}

fn parse_conjunction(full: &str, part: &str) -> Result<Vec<Predicate>, RequirementError> {
    if part.trim().is_empty() {
        if full.trim().is_empty() {
            return Ok(Requirement::any().alternatives.remove(0));
        }
        return Err(parse_error(full, "empty alternative"));
    }

    if let Some(caps) = RANGE_RE.captures(part) {
        let low = parse_version(full, &caps[1])?;
        let high = parse_version(full, &caps[2])?;
        return Ok(vec![
            Predicate::new(Operator::GreaterEqual, low),
            Predicate::new(Operator::LessEqual, high),
        ]);
    }

    let mut predicates = Vec::new();
    let mut cursor = 0;

    for caps in TERM_RE.captures_iter(part) {
        let whole = caps.get(0).unwrap();
        if !part[cursor..whole.start()].trim().is_empty() {
            return Err(parse_error(
                full,
                format!("unexpected \"{}\"", part[cursor..whole.start()].trim()),
            ));
        }
        cursor = whole.end();

        let operator = caps.get(1).map(|m| Operator::from_token(m.as_str()));
        predicates.extend(parse_term(full, operator, &caps[2])?);
    }

    if !part[cursor..].trim().is_empty() {
        return Err(parse_error(
            full,
            format!("unexpected \"{}\"", part[cursor..].trim()),
        ));
    }

    if predicates.is_empty() {
        return Err(parse_error(full, "no version terms"));
    }

    Ok(predicates)
}

fn parse_version(full: &str, text: &str) -> Result<Version, RequirementError> {
    Version::parse(text).map_err(|e| parse_error(full, e.to_string()))
}

/// Expand one term, turning `x` wildcards into a half-open range.
fn parse_term(
    full: &str,
    operator: Option<Operator>,
    text: &str,
) -> Result<Vec<Predicate>, RequirementError> {
    if matches!(text, "*" | "x" | "X") {
        return match operator {
            None | Some(Operator::GreaterEqual) => Ok(Requirement::any().alternatives.remove(0)),
            Some(op) => Err(parse_error(
                full,
                format!("operator {} cannot be used with a wildcard", op.as_str()),
            )),
        };
    }

    let pieces: Vec<&str> = text.split('.').collect();
    if let Some(wild) = pieces.iter().position(|p| matches!(*p, "x" | "X" | "*")) {
        if pieces[wild + 1..].iter().any(|p| !matches!(*p, "x" | "X" | "*")) {
            return Err(parse_error(full, format!("misplaced wildcard in \"{}\"", text)));
        }
        if operator.is_some() && operator != Some(Operator::Equal) {
            return Err(parse_error(
                full,
                format!("operator cannot be combined with wildcard \"{}\"", text),
            ));
        }

        let mut release = Vec::with_capacity(wild);
        for piece in &pieces[..wild] {
            let n = piece
                .parse::<u64>()
                .map_err(|_| parse_error(full, format!("invalid wildcard \"{}\"", text)))?;
            release.push(n);
        }

        let low = Version::from_release(&release);
        let mut upper = release.clone();
        if let Some(last) = upper.last_mut() {
            *last = last
                .checked_add(1)
                .ok_or_else(|| parse_error(full, format!("wildcard \"{}\" has no upper bound", text)))?;
        }
        return Ok(vec![
            Predicate::new(Operator::GreaterEqual, low),
            Predicate::new(Operator::Less, Version::from_release(&upper)),
        ]);
    }

    let version = parse_version(full, text)?;
    let operator = operator.unwrap_or(Operator::Equal);
    if operator == Operator::Pessimistic && version.bump().is_none() {
        return Err(parse_error(full, format!("\"~> {}\" has no upper bound", text)));
    }
    Ok(vec![Predicate::new(operator, version)])
}
