//! Subversion backend.
//!
//! The ref is pinned to a revision number with `svn log`, and a working copy
//! whose `Last Changed Rev` equals that number is trusted as is.

use std::fmt;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use forgekit_semver::Version;
use lazy_static::lazy_static;
use regex::Regex;

use super::context::SourceContext;
use super::dependency::Dependency;
use super::options::{self, SourceOptions};
use super::vcs::{self, DEFAULT_MODULE_VERSION};
use crate::cache::{vcs_cache_key, ContentCache};
use crate::error::{IoResultExt, Result, SourceError};
use crate::process::{run_checked, CommandRunner};
use crate::util::remove_path;

pub const DEFAULT_REF: &str = "HEAD";

const SVN: &str = "svn";

lazy_static! {
    static ref LOG_REVISION_RE: Regex = Regex::new(r"^r(\d+) ").unwrap();
    static ref LAST_CHANGED_RE: Regex = Regex::new(r"^Last Changed Rev: (\d+)\s*$").unwrap();
}

/// Working copy of an [`SvnSource`].
#[derive(Debug, Clone)]
pub struct SvnCheckout {
    path: PathBuf,
    cached: bool,
}

impl SvnCheckout {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_cached(&self) -> bool {
        self.cached
    }

    pub fn is_svn(&self) -> bool {
        self.path.join(".svn").exists()
    }

    /// `Last Changed Rev` of the working copy.
    pub fn current_revision(&self, runner: &dyn CommandRunner) -> Result<Option<String>> {
        let output = run_checked(runner, SVN, &["info".to_string()], Some(&self.path))?;
        Ok(output
            .stdout_str()
            .lines()
            .find_map(|line| LAST_CHANGED_RE.captures(line.trim_end()).map(|c| c[1].to_string())))
    }

    /// Newest revision of `uri` at `reference`.
    pub fn revision_from(runner: &dyn CommandRunner, uri: &str, reference: &str) -> Result<String> {
        let args = vec![
            "log".to_string(),
            "-l1".to_string(),
            format!("{}@{}", uri, reference),
        ];
        let output = run_checked(runner, SVN, &args, None)?;

        output
            .stdout_str()
            .lines()
            .find_map(|line| LOG_REVISION_RE.captures(line).map(|c| c[1].to_string()))
            .ok_or_else(|| SourceError::CommandFailed {
                command: crate::process::format_command(SVN, &args),
                output: format!("no revision found for {}@{}", uri, reference),
            })
    }

    fn checkout(&self, runner: &dyn CommandRunner, uri: &str, revision: &str) -> Result<()> {
        let args = vec![
            "checkout".to_string(),
            format!("{}@{}", uri, revision),
            self.path.to_string_lossy().into_owned(),
        ];
        run_checked(runner, SVN, &args, None)?;
        Ok(())
    }
}

/// A module hosted in a subversion repository.
#[derive(Clone)]
pub struct SvnSource {
    uri: String,
    reference: String,
    rev: Option<String>,
    path: Option<String>,
    context: SourceContext,
    checkout: SvnCheckout,
}

impl SvnSource {
    pub const LOCK_NAME: &'static str = "SVN";

    pub fn new(
        context: SourceContext,
        uri: impl Into<String>,
        reference: Option<String>,
        rev: Option<String>,
        path: Option<String>,
    ) -> Self {
        let uri = uri.into();
        let reference = reference.unwrap_or_else(|| DEFAULT_REF.to_string());
        let cache = ContentCache::truncated(
            context.env().cache_root().join("source").join("svn"),
            16,
        );
        let key = vcs_cache_key(&uri, path.as_deref(), &reference);

        Self {
            checkout: SvnCheckout::new(cache.path_for(&key)),
            uri,
            reference,
            rev,
            path,
            context,
        }
    }

    pub fn from_spec_args(context: SourceContext, uri: &str, options: &SourceOptions) -> Result<Self> {
        options::reject_unrecognized(options, &[options::REF, options::PATH])?;
        Ok(Self::new(
            context,
            uri,
            options.get(options::REF).cloned(),
            None,
            options.get(options::PATH).cloned(),
        ))
    }

    pub fn from_lock_options(context: SourceContext, options: &SourceOptions) -> Result<Self> {
        let uri = options::required(options, options::REMOTE)?;
        Ok(Self::new(
            context,
            uri,
            options.get(options::REF).cloned(),
            options.get(options::REV).cloned(),
            options.get(options::PATH).cloned(),
        ))
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn rev(&self) -> Option<&str> {
        self.rev.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn checkout(&self) -> &SvnCheckout {
        &self.checkout
    }

    pub fn to_spec_args(&self) -> (String, SourceOptions) {
        let mut options = SourceOptions::new();
        if self.reference != DEFAULT_REF {
            options.insert(options::REF.to_string(), self.reference.clone());
        }
        if let Some(path) = &self.path {
            options.insert(options::PATH.to_string(), path.clone());
        }
        (self.uri.clone(), options)
    }

    pub fn to_lock_options(&self) -> SourceOptions {
        let mut options = SourceOptions::new();
        options.insert(options::REMOTE.to_string(), self.uri.clone());
        options.insert(options::REF.to_string(), self.reference.clone());
        if let Some(rev) = &self.rev {
            options.insert(options::REV.to_string(), rev.clone());
        }
        if let Some(path) = &self.path {
            options.insert(options::PATH.to_string(), path.clone());
        }
        options
    }

    pub fn is_pinned(&self) -> bool {
        self.rev.is_some()
    }

    pub fn unpin(&mut self) {
        self.rev = None;
    }

    pub fn filesystem_path(&self) -> PathBuf {
        match &self.path {
            Some(path) => self.checkout.path().join(path),
            None => self.checkout.path().to_path_buf(),
        }
    }

    fn offline(&self) -> SourceError {
        SourceError::OfflineUnavailable {
            name: self.uri.clone(),
            version: self.rev.clone().unwrap_or_else(|| self.reference.clone()),
            source_id: self.to_string(),
        }
    }

    /// Pin the ref and bring the working copy to that revision, once per run.
    pub fn cache(&mut self) -> Result<()> {
        if self.checkout.cached {
            return Ok(());
        }

        let local = self.context.env().is_local();
        let runner = self.context.runner();

        let rev = match &self.rev {
            Some(rev) => rev.clone(),
            None if local => return Err(self.offline()),
            None => SvnCheckout::revision_from(runner, &self.uri, &self.reference)?,
        };

        let reusable = self.checkout.is_svn()
            && self.checkout.current_revision(runner)?.as_deref() == Some(rev.as_str());

        if reusable {
            log::debug!("Reusing {} at r{}", self.checkout.path().display(), rev);
        } else {
            if local {
                return Err(self.offline());
            }
            log::info!("Checking out {}@{}", self.uri, rev);
            let path = self.checkout.path();
            remove_path(path).at_path("remove", path)?;
            fs::create_dir_all(path).at_path("create", path)?;
            self.checkout.checkout(runner, &self.uri, &rev)?;
        }

        self.rev = Some(rev);
        self.checkout.cached = true;
        Ok(())
    }

    /// Descriptor version with hyphens turned into dots; `0.0.1` when that
    /// is still not a valid version.
    pub fn fetch_version(&mut self, name: &str) -> Result<String> {
        self.cache()?;

        let declared = match vcs::descriptor_version(&self.context, &self.filesystem_path())? {
            Some(version) => version,
            None => return Ok(DEFAULT_MODULE_VERSION.to_string()),
        };

        let repaired = declared.replace('-', ".");
        if Version::is_valid(&repaired) {
            Ok(repaired)
        } else {
            log::debug!(
                "{} declares invalid version '{}', using {}",
                name,
                declared,
                DEFAULT_MODULE_VERSION
            );
            Ok(DEFAULT_MODULE_VERSION.to_string())
        }
    }

    pub fn fetch_dependencies(&mut self, name: &str, version: &str) -> Result<Vec<Dependency>> {
        self.cache()?;
        vcs::descriptor_dependencies(&self.context, &self.filesystem_path(), name, version)
    }

    pub fn install(&mut self, name: &str, version: &str) -> Result<PathBuf> {
        self.cache()?;
        log::info!("Installing {} ({}) from {}", name, version, self);
        vcs::install_tree(
            &self.context,
            &self.filesystem_path(),
            name,
            &[".svn"],
            &self.to_string(),
        )
    }
}

impl PartialEq for SvnSource {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri && self.reference == other.reference && self.path == other.path
    }
}

impl Eq for SvnSource {}

impl Hash for SvnSource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uri.hash(state);
        self.reference.hash(state);
        self.path.hash(state);
    }
}

impl fmt::Display for SvnSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.uri, self.reference)?;
        if let Some(path) = &self.path {
            write!(f, "({})", path)?;
        }
        Ok(())
    }
}

impl fmt::Debug for SvnSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SvnSource")
            .field("uri", &self.uri)
            .field("ref", &self.reference)
            .field("rev", &self.rev)
            .field("path", &self.path)
            .field("checkout", &self.checkout)
            .finish()
    }
}
