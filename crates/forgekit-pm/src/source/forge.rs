//! Forge registry backend.
//!
//! Module releases are listed through the forge's JSON API, unpacked by the
//! external `puppet module install` tool into a per-version cache directory
//! and copied from there into the install root. In vendor mode the release
//! tarball is kept under the vendor cache so a later run can install the
//! same version without network access.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use forgekit_semver::{sort_descending, Version};
use indexmap::IndexMap;
use serde::Deserialize;

use super::context::SourceContext;
use super::dependency::Dependency;
use super::options::{self, SourceOptions};
use crate::cache::{hexdigest, ContentCache};
use crate::error::{IoResultExt, Result, SourceError};
use crate::http::HttpError;
use crate::process::format_command;
use crate::util::{copy_dir_all, module_short_name, remove_path};

/// Oldest module tool that understands `--ignore-dependencies`.
pub const MIN_TOOL_VERSION: &str = "2.7.13";

const INSTALL_TOOL: &str = "puppet";

#[derive(Debug, Deserialize)]
struct ReleaseListing {
    #[serde(default)]
    releases: Vec<ListedRelease>,
}

#[derive(Debug, Deserialize)]
struct ListedRelease {
    version: String,
}

#[derive(Debug, Deserialize)]
struct ReleaseEntry {
    version: String,
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    dependencies: DeclaredDependencies,
}

/// The API has served both `{"a/b": ">= 1"}` and `[["a/b", ">= 1"]]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DeclaredDependencies {
    Map(IndexMap<String, String>),
    Pairs(Vec<Vec<String>>),
}

impl Default for DeclaredDependencies {
    fn default() -> Self {
        DeclaredDependencies::Map(IndexMap::new())
    }
}

impl DeclaredDependencies {
    fn into_map(self) -> IndexMap<String, String> {
        match self {
            DeclaredDependencies::Map(map) => map,
            DeclaredDependencies::Pairs(pairs) => pairs
                .into_iter()
                .filter_map(|mut pair| {
                    if pair.is_empty() {
                        return None;
                    }
                    let name = pair.remove(0);
                    let requirement = if pair.is_empty() {
                        crate::descriptor::ANY_REQUIREMENT.to_string()
                    } else {
                        pair.remove(0)
                    };
                    Some((name, requirement))
                })
                .collect(),
        }
    }
}

/// Per-module cache controller of a [`ForgeSource`].
#[derive(Debug, Clone)]
pub struct ForgeRepo {
    name: String,
    source_uri: String,
    context: SourceContext,
    versions: ContentCache,
    listed: Option<Vec<String>>,
}

impl ForgeRepo {
    fn new(context: SourceContext, source_uri: &str, source_cache: &Path, name: &str) -> Self {
        Self {
            name: name.to_string(),
            source_uri: source_uri.to_string(),
            versions: ContentCache::new(source_cache.join(name).join("version")),
            context,
            listed: None,
        }
    }

    fn base(&self) -> &str {
        self.source_uri.trim_end_matches('/')
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.base(), path)
    }

    /// Valid released versions, newest first.
    pub fn versions(&mut self) -> Result<Vec<String>> {
        if let Some(listed) = &self.listed {
            return Ok(listed.clone());
        }

        let url = self.api_url(&format!("{}.json", self.name));
        let listing: ReleaseListing = match self.context.http().get_json(&url) {
            Ok(listing) => listing,
            Err(HttpError::HttpStatus { status, .. }) => {
                log::debug!("{} answered {} for {}", url, status, self.name);
                return Err(SourceError::ModuleNotFound {
                    name: self.name.clone(),
                    source_id: self.source_uri.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let raw: Vec<String> = listing.releases.into_iter().map(|r| r.version).collect();
        let (valid, rejected) = sort_descending(&raw);
        for version in &rejected {
            log::debug!("Ignoring invalid version '{}' of {}", version, self.name);
        }

        self.listed = Some(valid.clone());
        Ok(valid)
    }

    fn releases(&self, version: &str) -> Result<Vec<ReleaseEntry>> {
        let url = self.api_url(&format!(
            "api/v1/releases.json?module={}&version={}",
            self.name, version
        ));
        let mut data: IndexMap<String, Vec<ReleaseEntry>> = self.context.http().get_json(&url)?;

        data.shift_remove(&self.name)
            .ok_or_else(|| SourceError::ModuleNotFound {
                name: self.name.clone(),
                source_id: self.source_uri.clone(),
            })
    }

    /// Dependency name to requirement as declared by `version`, unvalidated.
    pub fn dependencies(&self, version: &str) -> Result<IndexMap<String, String>> {
        let mut entries = self.releases(version)?;
        let index = entries
            .iter()
            .position(|entry| entry.version == version)
            .unwrap_or(0);

        if entries.is_empty() {
            return Ok(IndexMap::new());
        }
        Ok(entries.swap_remove(index).dependencies.into_map())
    }

    /// Unpack `version` into the version cache and copy it to `install_path`.
    pub fn install_version(&mut self, version: &str, install_path: &Path) -> Result<()> {
        let env = self.context.env();
        let vendored = self.vendored_path(version);

        if env.is_local() && !vendored.exists() {
            return Err(SourceError::OfflineUnavailable {
                name: self.name.clone(),
                version: version.to_string(),
                source_id: self.source_uri.clone(),
            });
        }

        if env.is_vendor() && !vendored.exists() {
            self.vendor_cache(version, &vendored)?;
        }

        let cache_dir = self.cache_version_unpacked(version, &vendored)?;

        let unpacked = cache_dir.join(module_short_name(&self.name));
        if !unpacked.is_dir() {
            return Err(SourceError::CorruptCache { path: unpacked });
        }

        log::debug!("Copying {} to {}", unpacked.display(), install_path.display());
        remove_path(install_path).at_path("remove", install_path)?;
        copy_dir_all(&unpacked, install_path, &[]).at_path("copy module into", install_path)?;
        Ok(())
    }

    /// Cache directory of `version`.
    pub fn version_cache_path(&self, version: &str) -> PathBuf {
        self.versions.path_for(version)
    }

    /// Where the release tarball of `version` is vendored.
    pub fn vendored_path(&self, version: &str) -> PathBuf {
        self.context
            .env()
            .vendor_cache_root()
            .join(format!("{}-{}.tar.gz", self.name.replacen('/', "-", 1), version))
    }

    fn vendor_cache(&self, version: &str, dest: &Path) -> Result<()> {
        let entries = self.releases(version)?;
        let file = entries
            .iter()
            .find(|entry| entry.version == version)
            .and_then(|entry| entry.file.clone())
            .ok_or_else(|| SourceError::ModuleNotFound {
                name: format!("{}@{}", self.name, version),
                source_id: self.source_uri.clone(),
            })?;

        let url = if file.starts_with("http://") || file.starts_with("https://") {
            file
        } else {
            format!("{}{}", self.base(), file)
        };

        log::info!("Downloading {} into {}", url, dest.display());
        let bytes = self.context.http().download_to(&url, dest)?;
        log::debug!("Vendored {} bytes of {} {}", bytes, self.name, version);
        Ok(())
    }

    fn cache_version_unpacked(&self, version: &str, vendored: &Path) -> Result<PathBuf> {
        let path = self.version_cache_path(version);
        if self.versions.contains(version) {
            return Ok(path);
        }

        self.check_tool_version()?;

        self.versions.create(version).at_path("create", &path)?;
        let dir = path.to_string_lossy().into_owned();
        let target = if vendored.exists() {
            vendored.to_string_lossy().into_owned()
        } else {
            self.name.clone()
        };

        let args: Vec<String> = [
            "module",
            "install",
            "--version",
            version,
            "--target-dir",
            &dir,
            "--modulepath",
            &dir,
            "--ignore-dependencies",
            &target,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let command = format_command(INSTALL_TOOL, &args);
        log::debug!("Running `{}`", command);

        let output = match self.context.runner().run(INSTALL_TOOL, &args, None) {
            Ok(output) => output,
            Err(e) => {
                self.versions.remove(version).at_path("remove", &path)?;
                return Err(e);
            }
        };

        if !output.success() {
            self.versions.remove(version).at_path("remove", &path)?;
            return Err(SourceError::InstallToolError {
                command,
                output: output.combined(),
            });
        }

        Ok(path)
    }

    fn check_tool_version(&self) -> Result<()> {
        let args = vec!["--version".to_string()];
        let output = self.context.runner().run(INSTALL_TOOL, &args, None)?;
        if !output.success() {
            return Err(SourceError::InstallToolError {
                command: format_command(INSTALL_TOOL, &args),
                output: output.combined(),
            });
        }

        let text = output.stdout_str();
        let found = text.split_whitespace().next().unwrap_or("").replace('-', ".");
        let unsupported = || SourceError::UnsupportedToolVersion {
            found: text.trim().to_string(),
            required: MIN_TOOL_VERSION.to_string(),
        };

        let found = Version::parse(&found).map_err(|_| unsupported())?;
        let required = Version::parse(MIN_TOOL_VERSION).map_err(|_| unsupported())?;
        if found < required {
            return Err(unsupported());
        }
        Ok(())
    }
}

/// A forge registry, identified by its base URI.
#[derive(Clone)]
pub struct ForgeSource {
    uri: String,
    context: SourceContext,
    repos: IndexMap<String, ForgeRepo>,
}

impl ForgeSource {
    pub const LOCK_NAME: &'static str = "FORGE";

    pub fn new(context: SourceContext, uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            context,
            repos: IndexMap::new(),
        }
    }

    pub fn from_spec_args(context: SourceContext, uri: &str, options: &SourceOptions) -> Result<Self> {
        options::reject_unrecognized(options, &[])?;
        Ok(Self::new(context, uri))
    }

    pub fn from_lock_options(context: SourceContext, options: &SourceOptions) -> Result<Self> {
        let uri = options::required(options, options::REMOTE)?;
        Ok(Self::new(context, uri))
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The same registry without listed versions or repo handles.
    pub fn detached(&self) -> Self {
        Self::new(self.context.clone(), self.uri.clone())
    }

    pub fn to_spec_args(&self) -> (String, SourceOptions) {
        (self.uri.clone(), SourceOptions::new())
    }

    pub fn to_lock_options(&self) -> SourceOptions {
        let mut options = SourceOptions::new();
        options.insert(options::REMOTE.to_string(), self.uri.clone());
        options
    }

    pub fn is_pinned(&self) -> bool {
        false
    }

    pub fn unpin(&mut self) {}

    /// `<cache_root>/source/puppet/forge/<md5(uri)>`
    pub fn cache_path(&self) -> PathBuf {
        self.context
            .env()
            .cache_root()
            .join("source")
            .join("puppet")
            .join("forge")
            .join(hexdigest(&self.uri))
    }

    pub fn install_path(&self, name: &str) -> PathBuf {
        self.context.env().install_root().join(module_short_name(name))
    }

    /// Handle for `name`, created on first use.
    pub fn repo(&mut self, name: &str) -> &mut ForgeRepo {
        if !self.repos.contains_key(name) {
            let repo = ForgeRepo::new(self.context.clone(), &self.uri, &self.cache_path(), name);
            self.repos.insert(name.to_string(), repo);
        }
        &mut self.repos[name]
    }

    pub fn versions(&mut self, name: &str) -> Result<Vec<String>> {
        self.repo(name).versions()
    }

    /// `hint` if the forge lists it, otherwise the newest release.
    pub fn fetch_version(&mut self, name: &str, hint: Option<&str>) -> Result<String> {
        let versions = self.versions(name)?;

        if let Some(hint) = hint {
            if versions.iter().any(|v| v == hint) {
                return Ok(hint.to_string());
            }
        }

        versions
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::NoVersionsAvailable {
                name: name.to_string(),
                source_id: self.uri.clone(),
            })
    }

    pub fn fetch_dependencies(&mut self, name: &str, version: &str) -> Result<Vec<Dependency>> {
        log::debug!("Fetching dependencies of {} {} from {}", name, version, self.uri);
        let declared = self.repo(name).dependencies(version)?;

        declared
            .iter()
            .map(|(dependency, requirement)| {
                Dependency::declared_by(name, version, dependency, requirement, None)
            })
            .collect()
    }

    pub fn install(&mut self, name: &str, version: &str) -> Result<PathBuf> {
        let install_path = self.install_path(name);
        log::info!("Installing {} ({}) from {}", name, version, self.uri);
        self.repo(name).install_version(version, &install_path)?;
        Ok(install_path)
    }
}

impl PartialEq for ForgeSource {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri
    }
}

impl Eq for ForgeSource {}

impl Hash for ForgeSource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uri.hash(state);
    }
}

impl fmt::Display for ForgeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

impl fmt::Debug for ForgeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForgeSource")
            .field("uri", &self.uri)
            .field("repos", &self.repos.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use crate::config::Environment;
    use crate::process::CommandOutput;
    use crate::test_support::{write_file, Fixture};

    const FORGE: &str = "http://forge.test";
    const STDLIB_RELEASES: &str = "http://forge.test/api/v1/releases.json?module=puppetlabs/stdlib&version=4.1.0";

    fn source(fixture: &Fixture) -> ForgeSource {
        ForgeSource::new(fixture.context(), FORGE)
    }

    fn list_versions(fixture: &Fixture, versions: &[&str]) {
        let releases: Vec<String> = versions
            .iter()
            .map(|v| format!(r#"{{"version":"{}"}}"#, v))
            .collect();
        fixture.transport.respond(
            "http://forge.test/puppetlabs/stdlib.json",
            200,
            format!(r#"{{"releases":[{}]}}"#, releases.join(",")),
        );
    }

    fn puppet_installs_module(fixture: &Fixture) {
        fixture.runner.on("puppet --version", 0, "3.8.7\n", "");
        fixture.runner.on_with("puppet module install", |args, _| {
            let dir = PathBuf::from(&args[5]);
            write_file(&dir.join("stdlib").join("manifests").join("init.pp"), "class stdlib {}");
            CommandOutput {
                status: Some(0),
                stdout: b"Notice: Installing -- do not interrupt ...\n".to_vec(),
                ..Default::default()
            }
        });
    }

    #[test]
    fn test_versions_drop_invalid_and_sort() {
        let fixture = Fixture::new();
        list_versions(&fixture, &["1.2.0", "bogus", "1.1.0"]);

        let versions = source(&fixture).versions("puppetlabs/stdlib").unwrap();
        assert_eq!(versions, vec!["1.2.0", "1.1.0"]);
    }

    #[test]
    fn test_versions_are_memoized_per_repo() {
        let fixture = Fixture::new();
        list_versions(&fixture, &["1.0.0"]);

        let mut forge = source(&fixture);
        forge.versions("puppetlabs/stdlib").unwrap();
        forge.versions("puppetlabs/stdlib").unwrap();
        assert_eq!(fixture.transport.requests().len(), 1);
    }

    #[test]
    fn test_unknown_module() {
        let fixture = Fixture::new();
        let err = source(&fixture).versions("nobody/nothing").unwrap_err();
        assert!(matches!(err, SourceError::ModuleNotFound { .. }));
    }

    #[test]
    fn test_fetch_version_prefers_listed_hint() {
        let fixture = Fixture::new();
        list_versions(&fixture, &["1.1.0", "1.2.0", "1.0.0"]);
        let mut forge = source(&fixture);

        assert_eq!(forge.fetch_version("puppetlabs/stdlib", Some("1.1.0")).unwrap(), "1.1.0");
        assert_eq!(forge.fetch_version("puppetlabs/stdlib", Some("9.9.9")).unwrap(), "1.2.0");
        assert_eq!(forge.fetch_version("puppetlabs/stdlib", None).unwrap(), "1.2.0");
    }

    #[test]
    fn test_fetch_version_without_releases() {
        let fixture = Fixture::new();
        list_versions(&fixture, &["bogus"]);

        let err = source(&fixture).fetch_version("puppetlabs/stdlib", None).unwrap_err();
        assert!(matches!(err, SourceError::NoVersionsAvailable { .. }));
    }

    #[test]
    fn test_dependencies_in_map_form() {
        let fixture = Fixture::new();
        fixture.transport.respond(
            STDLIB_RELEASES,
            200,
            r#"{"puppetlabs/stdlib":[
                {"version":"4.0.0","dependencies":{"x/old":">= 0"}},
                {"version":"4.1.0","dependencies":{"puppetlabs/concat":">= 1.0.0","puppetlabs/apt":"1.x"}}
            ]}"#,
        );

        let deps = source(&fixture)
            .fetch_dependencies("puppetlabs/stdlib", "4.1.0")
            .unwrap();
        let names: Vec<&str> = deps.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["puppetlabs/concat", "puppetlabs/apt"]);
        assert!(deps.iter().all(|d| d.source.is_none()));
        assert!(deps[1].requirement.matches_str("1.4.0"));
    }

    #[test]
    fn test_dependencies_in_pair_form() {
        let fixture = Fixture::new();
        fixture.transport.respond(
            STDLIB_RELEASES,
            200,
            r#"{"puppetlabs/stdlib":[{"version":"4.1.0","dependencies":[["b/two",">= 2"],["a/one"]]}]}"#,
        );

        let deps = source(&fixture)
            .repo("puppetlabs/stdlib")
            .dependencies("4.1.0")
            .unwrap();
        let pairs: Vec<(&str, &str)> = deps.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(pairs, vec![("b/two", ">= 2"), ("a/one", ">= 0")]);
    }

    #[test]
    fn test_unparseable_dependency_requirement() {
        let fixture = Fixture::new();
        fixture.transport.respond(
            STDLIB_RELEASES,
            200,
            r#"{"puppetlabs/stdlib":[{"version":"4.1.0","dependencies":{"a/one":"whenever"}}]}"#,
        );

        let err = source(&fixture)
            .fetch_dependencies("puppetlabs/stdlib", "4.1.0")
            .unwrap_err();
        assert!(matches!(err, SourceError::InvalidDependencySpec { .. }));
    }

    #[test]
    fn test_install_through_module_tool() {
        let fixture = Fixture::new();
        puppet_installs_module(&fixture);
        write_file(&fixture.config.install_root().join("stdlib").join("stale.pp"), "");

        let installed = source(&fixture).install("puppetlabs/stdlib", "4.1.0").unwrap();

        assert_eq!(installed, fixture.config.install_root().join("stdlib"));
        assert!(installed.join("manifests").join("init.pp").is_file());
        assert!(!installed.join("stale.pp").exists());
        assert!(fixture.transport.requests().is_empty());

        let install = fixture
            .runner
            .calls()
            .into_iter()
            .find(|c| c.starts_with("puppet module install"))
            .unwrap();
        assert!(install.starts_with("puppet module install --version 4.1.0 --target-dir "));
        assert!(install.ends_with("--ignore-dependencies puppetlabs/stdlib"));
    }

    #[test]
    fn test_populated_cache_skips_module_tool() {
        let fixture = Fixture::new();
        puppet_installs_module(&fixture);
        let mut forge = source(&fixture);

        forge.install("puppetlabs/stdlib", "4.1.0").unwrap();
        forge.install("puppetlabs/stdlib", "4.1.0").unwrap();
        assert_eq!(fixture.runner.count("puppet module install"), 1);
    }

    #[test]
    fn test_failed_module_tool_removes_cache_dir() {
        let fixture = Fixture::new();
        fixture.runner.on("puppet --version", 0, "3.8.7", "");
        fixture.runner.on("puppet module install", 1, "", "Error: Could not install");
        let mut forge = source(&fixture);

        let err = forge.install("puppetlabs/stdlib", "4.1.0").unwrap_err();
        let cache_dir = forge.repo("puppetlabs/stdlib").version_cache_path("4.1.0");
        assert!(!cache_dir.exists());

        match err {
            SourceError::InstallToolError { command, output } => {
                let dir = cache_dir.to_string_lossy();
                assert_eq!(
                    command,
                    format!(
                        "puppet module install --version 4.1.0 --target-dir {} --modulepath {} --ignore-dependencies puppetlabs/stdlib",
                        dir, dir
                    )
                );
                assert!(output.contains("Could not install"));
            }
            other => panic!("expected InstallToolError, got {:?}", other),
        }
    }

    #[test]
    fn test_copy_failure_names_install_path() {
        let fixture = Fixture::new();
        puppet_installs_module(&fixture);
        write_file(&fixture.config.install_root(), "not a directory");

        let err = source(&fixture).install("puppetlabs/stdlib", "4.1.0").unwrap_err();
        let install_path = fixture.config.install_root().join("stdlib");
        match &err {
            SourceError::Filesystem { path, .. } => assert_eq!(path, &install_path),
            other => panic!("expected Filesystem, got {:?}", other),
        }
        assert!(err.to_string().contains(&install_path.display().to_string()));
    }

    #[test]
    fn test_out_of_range_requirement_is_invalid_spec() {
        let fixture = Fixture::new();
        fixture.transport.respond(
            STDLIB_RELEASES,
            200,
            r#"{"puppetlabs/stdlib":[{"version":"4.1.0","dependencies":{"a/one":"18446744073709551615.x"}}]}"#,
        );

        let err = source(&fixture)
            .fetch_dependencies("puppetlabs/stdlib", "4.1.0")
            .unwrap_err();
        assert!(matches!(err, SourceError::InvalidDependencySpec { .. }));
    }

    #[test]
    fn test_old_module_tool_is_rejected() {
        let fixture = Fixture::new();
        fixture.runner.on("puppet --version", 0, "2.7.12\n", "");

        let err = source(&fixture).install("puppetlabs/stdlib", "4.1.0").unwrap_err();
        assert!(matches!(err, SourceError::UnsupportedToolVersion { .. }));
        assert_eq!(fixture.runner.count("puppet module install"), 0);
    }

    #[test]
    fn test_tool_version_with_hyphenated_suffix() {
        let fixture = Fixture::new();
        puppet_installs_module(&fixture);
        fixture.runner.on("puppet --version", 0, "3.0.0-rc1 (Puppet Enterprise)\n", "");

        assert!(source(&fixture).install("puppetlabs/stdlib", "4.1.0").is_ok());
    }

    #[test]
    fn test_missing_unpacked_tree_is_corrupt_cache() {
        let fixture = Fixture::new();
        fixture.runner.on("puppet --version", 0, "3.8.7", "");

        let err = source(&fixture).install("puppetlabs/stdlib", "4.1.0").unwrap_err();
        match err {
            SourceError::CorruptCache { path } => assert!(path.ends_with("stdlib")),
            other => panic!("expected CorruptCache, got {:?}", other),
        }
    }

    #[test]
    fn test_local_mode_without_artifact() {
        let fixture = Fixture::new().local();
        puppet_installs_module(&fixture);

        let err = source(&fixture).install("puppetlabs/stdlib", "4.1.0").unwrap_err();
        assert!(matches!(err, SourceError::OfflineUnavailable { .. }));
        assert!(fixture.transport.requests().is_empty());
        assert!(fixture.runner.calls().is_empty());
    }

    #[test]
    fn test_local_mode_installs_from_vendored_artifact() {
        let fixture = Fixture::new().local();
        puppet_installs_module(&fixture);
        let mut forge = source(&fixture);
        let vendored = forge.repo("puppetlabs/stdlib").vendored_path("4.1.0");
        write_file(&vendored, "tarball");

        forge.install("puppetlabs/stdlib", "4.1.0").unwrap();

        assert!(fixture.transport.requests().is_empty());
        let target = vendored.to_string_lossy().into_owned();
        assert!(fixture
            .runner
            .calls()
            .iter()
            .any(|c| c.ends_with(&format!("--ignore-dependencies {}", target))));
    }

    #[test]
    fn test_vendor_mode_downloads_once() {
        let fixture = Fixture::new().vendor();
        puppet_installs_module(&fixture);
        fixture.transport.respond(
            STDLIB_RELEASES,
            200,
            r#"{"puppetlabs/stdlib":[{"version":"4.1.0","file":"/system/releases/p/puppetlabs/puppetlabs-stdlib-4.1.0.tar.gz","dependencies":{}}]}"#,
        );
        let download = "http://forge.test/system/releases/p/puppetlabs/puppetlabs-stdlib-4.1.0.tar.gz";
        fixture.transport.respond(download, 200, "tarball-bytes");

        let mut forge = source(&fixture);
        forge.install("puppetlabs/stdlib", "4.1.0").unwrap();
        forge.install("puppetlabs/stdlib", "4.1.0").unwrap();

        let vendored = fixture
            .config
            .vendor_cache_root()
            .join("puppetlabs-stdlib-4.1.0.tar.gz");
        assert_eq!(fs::read_to_string(&vendored).unwrap(), "tarball-bytes");
        assert_eq!(fixture.transport.request_count(download), 1);
    }

    #[test]
    fn test_cache_layout() {
        let fixture = Fixture::new();
        let mut forge = source(&fixture);

        let expected_root = fixture
            .config
            .cache_root()
            .join("source/puppet/forge")
            .join(hexdigest(FORGE));
        assert_eq!(forge.cache_path(), expected_root);
        assert_eq!(
            forge.repo("puppetlabs/stdlib").version_cache_path("4.1.0"),
            expected_root
                .join("puppetlabs/stdlib/version")
                .join(hexdigest("4.1.0"))
        );
    }

    #[test]
    fn test_spec_args_reject_options() {
        let fixture = Fixture::new();
        let mut options = SourceOptions::new();
        options.insert("ref".into(), "master".into());

        let err = ForgeSource::from_spec_args(fixture.context(), FORGE, &options).unwrap_err();
        assert!(matches!(err, SourceError::UnrecognizedSourceOption { .. }));
    }

    #[test]
    fn test_identity_ignores_cache_state() {
        let fixture = Fixture::new();
        list_versions(&fixture, &["1.0.0"]);
        let mut warmed = source(&fixture);
        warmed.versions("puppetlabs/stdlib").unwrap();

        let rebuilt =
            ForgeSource::from_lock_options(fixture.context(), &warmed.to_lock_options()).unwrap();
        assert_eq!(warmed, rebuilt);
        assert!(!rebuilt.is_pinned());
    }

    #[test]
    fn test_detached_drops_repo_handles() {
        let fixture = Fixture::new();
        list_versions(&fixture, &["1.0.0", "1.1.0"]);
        let mut warmed = source(&fixture);
        warmed.versions("puppetlabs/stdlib").unwrap();

        let detached = warmed.detached();
        assert_eq!(warmed.repos.len(), 1);
        assert!(detached.repos.is_empty());
        assert_eq!(warmed, detached);
    }
}
