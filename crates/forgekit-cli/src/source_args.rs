//! Command line flags selecting the source a command talks to.

use anyhow::{bail, Result};
use clap::Args;

use forgekit_pm::{Config, Source, SourceContext, SourceKind, SourceOptions};

#[derive(Args, Debug, Default)]
pub struct SourceArgs {
    /// Forge base URL (default: the configured forge)
    #[arg(long, conflicts_with_all = ["git", "svn"])]
    pub forge: Option<String>,

    /// Git repository URL
    #[arg(long, conflicts_with = "svn")]
    pub git: Option<String>,

    /// Subversion repository URL
    #[arg(long)]
    pub svn: Option<String>,

    /// Branch, tag or revision to follow (git and svn only)
    #[arg(long = "ref")]
    pub reference: Option<String>,

    /// Module directory inside the repository (git and svn only)
    #[arg(long)]
    pub path: Option<String>,

    /// Only use vendored artifacts, never the network
    #[arg(long)]
    pub local: bool,

    /// Keep downloaded artifacts under the vendor directory
    #[arg(long)]
    pub vendor: bool,
}

impl SourceArgs {
    pub fn apply_modes(&self, config: &mut Config) {
        if self.local {
            config.local = true;
        }
        if self.vendor {
            config.vendor = true;
        }
    }

    fn kind_and_uri(&self, context: &SourceContext) -> (SourceKind, String) {
        if let Some(uri) = &self.git {
            (SourceKind::Git, uri.clone())
        } else if let Some(uri) = &self.svn {
            (SourceKind::Svn, uri.clone())
        } else {
            let uri = self
                .forge
                .clone()
                .unwrap_or_else(|| context.default_forge().to_string());
            (SourceKind::Forge, uri)
        }
    }

    fn options(&self) -> SourceOptions {
        let mut options = SourceOptions::new();
        if let Some(reference) = &self.reference {
            options.insert("ref".to_string(), reference.clone());
        }
        if let Some(path) = &self.path {
            options.insert("path".to_string(), path.clone());
        }
        options
    }

    pub fn build(&self, context: SourceContext) -> Result<Source> {
        let (kind, uri) = self.kind_and_uri(&context);
        if kind == SourceKind::Forge && (self.reference.is_some() || self.path.is_some()) {
            bail!("--ref and --path only apply to --git and --svn sources");
        }
        Ok(Source::from_spec_args(context, kind, &uri, &self.options())?)
    }
}
