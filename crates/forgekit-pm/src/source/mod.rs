//! Where a module's versions live.
//!
//! A [`Source`] is one of three backends. The resolver drives every backend
//! through the same calls, per module name:
//!
//! 1. [`Source::fetch_version`] (or [`Source::manifests`] to list them)
//! 2. [`Source::fetch_dependencies`]
//! 3. [`Source::install`]
//!
//! Each backend owns its cache state and decides from the environment's
//! local and vendor flags whether to reach the network, replay a vendored
//! artifact or fail.
//!
//! Sources compare and hash by identity only: the variant, the remote and,
//! for version control, the ref and sub-path. A pinned commit or revision
//! and anything cached are not part of that identity, so a source rebuilt
//! from its lock entry equals the one that wrote it.

mod context;
mod dependency;
pub mod forge;
pub mod git;
pub mod options;
pub mod svn;
mod vcs;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub use context::{SourceContext, SourceContextBuilder};
pub use dependency::{Dependency, Manifest};
pub use forge::{ForgeRepo, ForgeSource};
pub use git::{GitRepository, GitSource};
pub use options::SourceOptions;
pub use svn::{SvnCheckout, SvnSource};
pub use vcs::DEFAULT_MODULE_VERSION;

use crate::error::{Result, SourceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Forge,
    Git,
    Svn,
}

impl SourceKind {
    /// Section name used in lock files.
    pub fn lock_name(&self) -> &'static str {
        match self {
            SourceKind::Forge => ForgeSource::LOCK_NAME,
            SourceKind::Git => GitSource::LOCK_NAME,
            SourceKind::Svn => SvnSource::LOCK_NAME,
        }
    }
}

impl FromStr for SourceKind {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "forge" => Ok(SourceKind::Forge),
            "git" => Ok(SourceKind::Git),
            "svn" => Ok(SourceKind::Svn),
            _ => Err(SourceError::UnknownSourceKind(s.to_string())),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKind::Forge => "forge",
            SourceKind::Git => "git",
            SourceKind::Svn => "svn",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Source {
    Forge(ForgeSource),
    Git(GitSource),
    Svn(SvnSource),
}

impl Source {
    /// Build a source from a declaration such as `git 'uri', ref: 'v1'`.
    pub fn from_spec_args(
        context: SourceContext,
        kind: SourceKind,
        uri: &str,
        options: &SourceOptions,
    ) -> Result<Self> {
        Ok(match kind {
            SourceKind::Forge => Source::Forge(ForgeSource::from_spec_args(context, uri, options)?),
            SourceKind::Git => Source::Git(GitSource::from_spec_args(context, uri, options)?),
            SourceKind::Svn => Source::Svn(SvnSource::from_spec_args(context, uri, options)?),
        })
    }

    /// Build a source from its lock entry; `remote` is required.
    pub fn from_lock_options(
        context: SourceContext,
        kind: SourceKind,
        options: &SourceOptions,
    ) -> Result<Self> {
        Ok(match kind {
            SourceKind::Forge => Source::Forge(ForgeSource::from_lock_options(context, options)?),
            SourceKind::Git => Source::Git(GitSource::from_lock_options(context, options)?),
            SourceKind::Svn => Source::Svn(SvnSource::from_lock_options(context, options)?),
        })
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Source::Forge(_) => SourceKind::Forge,
            Source::Git(_) => SourceKind::Git,
            Source::Svn(_) => SourceKind::Svn,
        }
    }

    pub fn uri(&self) -> &str {
        match self {
            Source::Forge(s) => s.uri(),
            Source::Git(s) => s.uri(),
            Source::Svn(s) => s.uri(),
        }
    }

    pub fn to_spec_args(&self) -> (String, SourceOptions) {
        match self {
            Source::Forge(s) => s.to_spec_args(),
            Source::Git(s) => s.to_spec_args(),
            Source::Svn(s) => s.to_spec_args(),
        }
    }

    pub fn to_lock_options(&self) -> SourceOptions {
        match self {
            Source::Forge(s) => s.to_lock_options(),
            Source::Git(s) => s.to_lock_options(),
            Source::Svn(s) => s.to_lock_options(),
        }
    }

    pub fn is_pinned(&self) -> bool {
        match self {
            Source::Forge(s) => s.is_pinned(),
            Source::Git(s) => s.is_pinned(),
            Source::Svn(s) => s.is_pinned(),
        }
    }

    pub fn unpin(&mut self) {
        match self {
            Source::Forge(s) => s.unpin(),
            Source::Git(s) => s.unpin(),
            Source::Svn(s) => s.unpin(),
        }
    }

    /// Versions of `name` this source can provide, newest first.
    ///
    /// A version-control source provides exactly the version its checkout
    /// declares.
    pub fn versions(&mut self, name: &str) -> Result<Vec<String>> {
        match self {
            Source::Forge(s) => s.versions(name),
            Source::Git(s) => Ok(vec![s.fetch_version(name)?]),
            Source::Svn(s) => Ok(vec![s.fetch_version(name)?]),
        }
    }

    /// The version of `name` to use. The forge honours `hint` when it lists
    /// that version; version-control sources ignore it.
    pub fn fetch_version(&mut self, name: &str, hint: Option<&str>) -> Result<String> {
        match self {
            Source::Forge(s) => s.fetch_version(name, hint),
            Source::Git(s) => s.fetch_version(name),
            Source::Svn(s) => s.fetch_version(name),
        }
    }

    pub fn fetch_dependencies(&mut self, name: &str, version: &str) -> Result<Vec<Dependency>> {
        match self {
            Source::Forge(s) => s.fetch_dependencies(name, version),
            Source::Git(s) => s.fetch_dependencies(name, version),
            Source::Svn(s) => s.fetch_dependencies(name, version),
        }
    }

    /// Same identity and pin, without the forge's per-module memo.
    pub fn detached(&self) -> Source {
        match self {
            Source::Forge(s) => Source::Forge(s.detached()),
            Source::Git(s) => Source::Git(s.clone()),
            Source::Svn(s) => Source::Svn(s.clone()),
        }
    }

    /// One manifest per version of `name`, dependencies not yet fetched.
    pub fn manifests(&mut self, name: &str) -> Result<Vec<Manifest>> {
        let versions = self.versions(name)?;
        let source = self.detached();
        Ok(versions
            .into_iter()
            .map(|version| Manifest::new(source.clone(), name, version))
            .collect())
    }

    /// Manifest of `name` at `version` with its dependencies filled in.
    pub fn manifest(&mut self, name: &str, version: &str) -> Result<Manifest> {
        let dependencies = self.fetch_dependencies(name, version)?;
        Ok(Manifest::new(self.detached(), name, version).with_dependencies(dependencies))
    }

    /// Install `manifest` under the install root and return where it went.
    pub fn install(&mut self, manifest: &Manifest) -> Result<PathBuf> {
        if manifest.source != *self {
            return Err(SourceError::ForeignManifest {
                name: manifest.name.clone(),
                source_id: self.to_string(),
            });
        }

        match self {
            Source::Forge(s) => s.install(&manifest.name, &manifest.version),
            Source::Git(s) => s.install(&manifest.name, &manifest.version),
            Source::Svn(s) => s.install(&manifest.name, &manifest.version),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Forge(s) => fmt::Display::fmt(s, f),
            Source::Git(s) => fmt::Display::fmt(s, f),
            Source::Svn(s) => fmt::Display::fmt(s, f),
        }
    }
}

impl From<ForgeSource> for Source {
    fn from(source: ForgeSource) -> Self {
        Source::Forge(source)
    }
}

impl From<GitSource> for Source {
    fn from(source: GitSource) -> Self {
        Source::Git(source)
    }
}

impl From<SvnSource> for Source {
    fn from(source: SvnSource) -> Self {
        Source::Svn(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    use crate::test_support::{write_file, Fixture};

    fn hash_of(source: &Source) -> u64 {
        let mut hasher = DefaultHasher::new();
        source.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("git".parse::<SourceKind>().unwrap(), SourceKind::Git);
        assert_eq!("FORGE".parse::<SourceKind>().unwrap(), SourceKind::Forge);
        assert_eq!(SourceKind::Svn.lock_name(), "SVN");
        assert!(matches!(
            "cvs".parse::<SourceKind>(),
            Err(SourceError::UnknownSourceKind(_))
        ));
    }

    #[test]
    fn test_round_trips_preserve_identity() {
        let fixture = Fixture::new();
        let mut git_options = SourceOptions::new();
        git_options.insert("ref".into(), "v2".into());
        git_options.insert("path".into(), "web".into());

        let declared = vec![
            (SourceKind::Forge, "http://forge.test", SourceOptions::new()),
            (SourceKind::Git, "https://git.test/web.git", git_options.clone()),
            (SourceKind::Svn, "svn://svn.test/web", git_options),
        ];

        for (kind, uri, options) in declared {
            let source = Source::from_spec_args(fixture.context(), kind, uri, &options).unwrap();

            let (spec_uri, spec_options) = source.to_spec_args();
            let from_spec =
                Source::from_spec_args(fixture.context(), kind, &spec_uri, &spec_options).unwrap();
            let from_lock =
                Source::from_lock_options(fixture.context(), kind, &source.to_lock_options()).unwrap();

            assert_eq!(from_spec, source);
            assert_eq!(from_lock, source);
            assert_eq!(hash_of(&from_spec), hash_of(&source));
            assert_eq!(hash_of(&from_lock), hash_of(&source));
        }
    }

    #[test]
    fn test_variants_are_distinct() {
        let fixture = Fixture::new();
        let options = SourceOptions::new();
        let git = Source::from_spec_args(fixture.context(), SourceKind::Git, "x", &options).unwrap();
        let svn = Source::from_spec_args(fixture.context(), SourceKind::Svn, "x", &options).unwrap();
        assert_ne!(git, svn);
    }

    #[test]
    fn test_lock_entry_requires_remote() {
        let fixture = Fixture::new();
        let err = Source::from_lock_options(fixture.context(), SourceKind::Git, &SourceOptions::new())
            .unwrap_err();
        assert!(matches!(err, SourceError::MissingSourceOption { .. }));
    }

    #[test]
    fn test_manifests_list_forge_versions() {
        let fixture = Fixture::new();
        fixture.transport.respond(
            "http://forge.test/acme/ntp.json",
            200,
            r#"{"releases":[{"version":"1.0.0"},{"version":"1.1.0"}]}"#,
        );
        let mut forge: Source = ForgeSource::new(fixture.context(), "http://forge.test").into();

        let manifests = forge.manifests("acme/ntp").unwrap();
        let versions: Vec<&str> = manifests.iter().map(|m| m.version.as_str()).collect();
        assert_eq!(versions, vec!["1.1.0", "1.0.0"]);
        assert!(manifests.iter().all(|m| m.source == forge && m.dependencies.is_none()));
    }

    #[test]
    fn test_install_rejects_foreign_manifest() {
        let fixture = Fixture::new();
        let mut forge: Source = ForgeSource::new(fixture.context(), "http://forge.test").into();
        let other: Source = ForgeSource::new(fixture.context(), "http://mirror.test").into();

        let err = forge
            .install(&Manifest::new(other, "acme/ntp", "1.0.0"))
            .unwrap_err();
        assert!(matches!(err, SourceError::ForeignManifest { .. }));
        assert!(fixture.runner.calls().is_empty());
    }

    #[test]
    fn test_git_manifest_carries_dependencies() {
        let fixture = Fixture::new();
        fixture.runner.on_with("git clone", |args, _| {
            write_file(
                &std::path::Path::new(&args[2]).join("Modulefile"),
                "version '0.4.0'\ndependency 'puppetlabs/stdlib'\n",
            );
            std::fs::create_dir_all(std::path::Path::new(&args[2]).join(".git")).unwrap();
            crate::process::CommandOutput {
                status: Some(0),
                ..Default::default()
            }
        });
        fixture.runner.on("git rev-parse", 0, "abc123\n", "");
        let mut git = Source::from_spec_args(
            fixture.context(),
            SourceKind::Git,
            "https://git.test/ntp.git",
            &SourceOptions::new(),
        )
        .unwrap();

        let version = git.fetch_version("acme/ntp", Some("9.9.9")).unwrap();
        assert_eq!(version, "0.4.0");

        let manifest = git.manifest("acme/ntp", &version).unwrap();
        let deps = manifest.dependencies.unwrap();
        assert_eq!(deps[0].name, "puppetlabs/stdlib");
        assert!(deps[0].requirement.matches_str("0.1.0"));
        assert!(git.is_pinned());
    }
}
