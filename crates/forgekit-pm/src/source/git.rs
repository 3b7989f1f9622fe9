//! Git backend.
//!
//! One working checkout per source, keyed by remote, sub-path and ref. A
//! pinned source whose commit was vendored as `<sha>.tar.gz` is replayed from
//! the snapshot without touching the network.

use std::fmt;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use super::context::SourceContext;
use super::dependency::Dependency;
use super::options::{self, SourceOptions};
use super::vcs::{self, DEFAULT_MODULE_VERSION};
use crate::archive::{extract_tar_gz, write_tar_gz};
use crate::cache::{vcs_cache_key, ContentCache};
use crate::error::{IoResultExt, Result, SourceError};
use crate::process::{format_command, run_checked, CommandOutput, CommandRunner};
use crate::util::remove_path;

pub const DEFAULT_REF: &str = "master";

const GIT: &str = "git";
const REMOTE_NAME: &str = "origin";

/// Working checkout of a [`GitSource`].
#[derive(Debug, Clone)]
pub struct GitRepository {
    path: PathBuf,
    cached: bool,
}

impl GitRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this run already brought the checkout up to date.
    pub fn is_cached(&self) -> bool {
        self.cached
    }

    pub fn is_git(&self) -> bool {
        self.path.join(".git").exists()
    }

    fn git(&self, runner: &dyn CommandRunner, args: &[&str]) -> Result<CommandOutput> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        run_checked(runner, GIT, &args, Some(&self.path))
    }

    fn clone_from(&self, runner: &dyn CommandRunner, uri: &str) -> Result<()> {
        let args = vec![
            "clone".to_string(),
            uri.to_string(),
            self.path.to_string_lossy().into_owned(),
            "--quiet".to_string(),
        ];
        run_checked(runner, GIT, &args, None)?;
        Ok(())
    }

    fn reset_hard(&self, runner: &dyn CommandRunner) -> Result<()> {
        self.git(runner, &["reset", "--hard", "--quiet"])?;
        Ok(())
    }

    fn clean(&self, runner: &dyn CommandRunner) -> Result<()> {
        self.git(runner, &["clean", "-x", "-d", "--force", "--force"])?;
        Ok(())
    }

    fn fetch(&self, runner: &dyn CommandRunner) -> Result<()> {
        self.git(runner, &["fetch", REMOTE_NAME, "--quiet"])?;
        self.git(runner, &["fetch", REMOTE_NAME, "--tags", "--quiet"])?;
        Ok(())
    }

    /// Commit at HEAD; `None` for a repository without commits.
    pub fn current_commit(&self, runner: &dyn CommandRunner) -> Result<Option<String>> {
        let args: Vec<String> = ["rev-parse", "HEAD", "--quiet"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let output = runner.run(GIT, &args, Some(&self.path))?;
        if !output.success() {
            return Ok(None);
        }
        let sha = output.stdout_str().trim().to_string();
        Ok(if sha.is_empty() { None } else { Some(sha) })
    }

    fn is_checked_out(&self, runner: &dyn CommandRunner, sha: &str) -> Result<bool> {
        Ok(self.current_commit(runner)?.as_deref() == Some(sha))
    }

    fn remote_branches(&self, runner: &dyn CommandRunner) -> Result<Vec<String>> {
        let output = self.git(runner, &["branch", "-r", "--no-color"])?;
        let prefix = format!("{}/", REMOTE_NAME);

        Ok(output
            .stdout_str()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.contains("->"))
            .filter_map(|line| line.strip_prefix(&prefix))
            .map(str::to_string)
            .collect())
    }

    /// Resolve `reference` to a commit; remote branch names win over local
    /// ones.
    pub fn hash_from(&self, runner: &dyn CommandRunner, reference: &str) -> Result<String> {
        let qualified = if self.remote_branches(runner)?.iter().any(|b| b == reference) {
            format!("{}/{}", REMOTE_NAME, reference)
        } else {
            reference.to_string()
        };

        let spec = format!("{}^{{commit}}", qualified);
        let output = self.git(runner, &["rev-parse", &spec, "--quiet"])?;
        let sha = output.stdout_str().trim().to_string();
        if sha.is_empty() {
            return Err(SourceError::CommandFailed {
                command: format_command(GIT, &["rev-parse".to_string(), spec, "--quiet".to_string()]),
                output: format!("no commit found for '{}'", reference),
            });
        }
        Ok(sha)
    }

    fn checkout(&self, runner: &dyn CommandRunner, sha: &str) -> Result<()> {
        self.git(runner, &["checkout", sha, "--quiet", "--force"])?;
        Ok(())
    }

    fn archive(&self, runner: &dyn CommandRunner, sha: &str) -> Result<Vec<u8>> {
        Ok(self.git(runner, &["archive", sha])?.stdout)
    }
}

/// A module hosted in a git repository.
#[derive(Clone)]
pub struct GitSource {
    uri: String,
    reference: String,
    sha: Option<String>,
    path: Option<String>,
    context: SourceContext,
    repository: GitRepository,
}

impl GitSource {
    pub const LOCK_NAME: &'static str = "GIT";

    pub fn new(
        context: SourceContext,
        uri: impl Into<String>,
        reference: Option<String>,
        sha: Option<String>,
        path: Option<String>,
    ) -> Self {
        let uri = uri.into();
        let reference = reference.unwrap_or_else(|| DEFAULT_REF.to_string());
        let cache = ContentCache::truncated(
            context.env().cache_root().join("source").join("git"),
            16,
        );
        let key = vcs_cache_key(&uri, path.as_deref(), &reference);

        Self {
            repository: GitRepository::new(cache.path_for(&key)),
            uri,
            reference,
            sha,
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
            options.get(options::SHA).cloned(),
            options.get(options::PATH).cloned(),
        ))
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn sha(&self) -> Option<&str> {
        self.sha.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn repository(&self) -> &GitRepository {
        &self.repository
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
        if let Some(sha) = &self.sha {
            options.insert(options::SHA.to_string(), sha.clone());
        }
        if let Some(path) = &self.path {
            options.insert(options::PATH.to_string(), path.clone());
        }
        options
    }

    pub fn is_pinned(&self) -> bool {
        self.sha.is_some()
    }

    pub fn unpin(&mut self) {
        self.sha = None;
    }

    /// Module root inside the checkout.
    pub fn filesystem_path(&self) -> PathBuf {
        match &self.path {
            Some(path) => self.repository.path().join(path),
            None => self.repository.path().to_path_buf(),
        }
    }

    /// `<vendor_source_root>/<sha>.tar.gz`, once a commit is known.
    pub fn vendored_snapshot(&self) -> Option<PathBuf> {
        self.sha.as_ref().map(|sha| {
            self.context
                .env()
                .vendor_source_root()
                .join(format!("{}.tar.gz", sha))
        })
    }

    /// Bring the checkout to the pinned commit, once per run.
    pub fn cache(&mut self) -> Result<()> {
        if self.repository.cached {
            return Ok(());
        }

        if let Some(snapshot) = self.vendored_snapshot().filter(|s| s.exists()) {
            self.vendor_checkout(&snapshot)?;
        } else if self.context.env().is_local() {
            return Err(SourceError::OfflineUnavailable {
                name: self.uri.clone(),
                version: self.sha.clone().unwrap_or_else(|| self.reference.clone()),
                source_id: self.to_string(),
            });
        } else {
            self.fetch_and_checkout()?;
            if self.context.env().is_vendor() {
                self.cache_in_vendor()?;
            }
        }

        self.repository.cached = true;
        Ok(())
    }

    fn vendor_checkout(&self, snapshot: &Path) -> Result<()> {
        log::debug!("Extracting {} into {}", snapshot.display(), self.repository.path().display());
        let path = self.repository.path();
        remove_path(path).at_path("remove", path)?;
        fs::create_dir_all(path).at_path("create", path)?;
        extract_tar_gz(snapshot, path)
    }

    fn fetch_and_checkout(&mut self) -> Result<()> {
        let runner = self.context.runner();
        let repository = &self.repository;

        if !repository.is_git() {
            log::info!("Cloning {}", self.uri);
            let path = repository.path();
            remove_path(path).at_path("remove", path)?;
            fs::create_dir_all(path).at_path("create", path)?;
            repository.clone_from(runner, &self.uri)?;
        }

        repository.reset_hard(runner)?;
        repository.clean(runner)?;

        let at_pin = match &self.sha {
            Some(sha) => repository.is_checked_out(runner, sha)?,
            None => false,
        };
        if at_pin {
            return Ok(());
        }

        repository.fetch(runner)?;
        let sha = match &self.sha {
            Some(sha) => sha.clone(),
            None => repository.hash_from(runner, &self.reference)?,
        };
        if !repository.is_checked_out(runner, &sha)? {
            repository.checkout(runner, &sha)?;
        }

        self.sha = Some(sha);
        Ok(())
    }

    fn cache_in_vendor(&self) -> Result<()> {
        let (sha, snapshot) = match (&self.sha, self.vendored_snapshot()) {
            (Some(sha), Some(snapshot)) => (sha, snapshot),
            _ => return Ok(()),
        };
        if snapshot.exists() {
            return Ok(());
        }

        log::info!("Vendoring {} at {}", self.uri, sha);
        let tar = self.repository.archive(self.context.runner(), sha)?;
        write_tar_gz(&tar, &snapshot)
    }

    pub fn fetch_version(&mut self, _name: &str) -> Result<String> {
        self.cache()?;
        Ok(vcs::descriptor_version(&self.context, &self.filesystem_path())?
            .unwrap_or_else(|| DEFAULT_MODULE_VERSION.to_string()))
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
            &[".git"],
            &self.to_string(),
        )
    }
}

impl PartialEq for GitSource {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri && self.reference == other.reference && self.path == other.path
    }
}

impl Eq for GitSource {}

impl Hash for GitSource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uri.hash(state);
        self.reference.hash(state);
        self.path.hash(state);
    }
}

impl fmt::Display for GitSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.uri, self.reference)?;
        if let Some(path) = &self.path {
            write!(f, "({})", path)?;
        }
        Ok(())
    }
}

impl fmt::Debug for GitSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitSource")
            .field("uri", &self.uri)
            .field("ref", &self.reference)
            .field("sha", &self.sha)
            .field("path", &self.path)
            .field("repository", &self.repository)
            .finish()
    }
}
