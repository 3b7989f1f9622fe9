use std::fmt;

use forgekit_semver::Requirement;

use super::Source;
use crate::error::{Result, SourceError};

/// A named requirement, optionally pinned to the source that should provide it.
#[derive(Debug, Clone, PartialEq)]
pub struct Dependency {
    pub name: String,
    pub requirement: Requirement,
    pub source: Option<Source>,
}

impl Dependency {
    pub fn new(name: impl Into<String>, requirement: Requirement, source: Option<Source>) -> Self {
        Self {
            name: name.into(),
            requirement,
            source,
        }
    }

    /// Build a dependency declared by `module` at `version`, parsing its
    /// requirement string.
    pub(crate) fn declared_by(
        module: &str,
        version: &str,
        name: &str,
        requirement: &str,
        source: Option<Source>,
    ) -> Result<Self> {
        let parsed = Requirement::parse(requirement).map_err(|e| {
            SourceError::InvalidDependencySpec {
                module: module.to_string(),
                version: version.to_string(),
                dependency: name.to_string(),
                requirement: requirement.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self::new(name, parsed, source))
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.requirement)
    }
}

/// One concrete version of a module offered by a source.
///
/// Dependencies are filled in lazily by the resolver through
/// [`Source::fetch_dependencies`].
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub source: Source,
    pub name: String,
    pub version: String,
    pub dependencies: Option<Vec<Dependency>>,
}

impl Manifest {
    pub fn new(source: Source, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            source,
            name: name.into(),
            version: version.into(),
            dependencies: None,
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<Dependency>) -> Self {
        self.dependencies = Some(dependencies);
        self
    }
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) from {}", self.name, self.version, self.source)
    }
}
