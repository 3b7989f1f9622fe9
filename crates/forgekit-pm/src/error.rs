use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::http::HttpError;

#[derive(Error, Debug)]
pub enum SourceError {
    // Lookup errors
    #[error("Unable to find module '{name}' on {source_id}")]
    ModuleNotFound { name: String, source_id: String },

    #[error("No valid versions of '{name}' found on {source_id}")]
    NoVersionsAvailable { name: String, source_id: String },

    // Network errors
    #[error(transparent)]
    Http(#[from] HttpError),

    // Offline errors
    #[error("Could not find a local copy of {name} at {version} ({source_id})")]
    OfflineUnavailable {
        name: String,
        version: String,
        source_id: String,
    },

    // External install tool errors
    #[error("Error executing module install:\n{command}\nError:\n{output}")]
    InstallToolError { command: String, output: String },

    #[error(
        "To get modules from the forge the module install tool must be at least version {required}, found {found}"
    )]
    UnsupportedToolVersion { found: String, required: String },

    #[error("{} does not exist, something went wrong. Try removing it manually", path.display())]
    CorruptCache { path: PathBuf },

    // Dependency errors
    #[error("Error fetching dependency for {module} [{version}]: {dependency} [{requirement}]: {reason}")]
    InvalidDependencySpec {
        module: String,
        version: String,
        dependency: String,
        requirement: String,
        reason: String,
    },

    // Source declaration errors
    #[error("Unrecognised options: {}", options.join(", "))]
    UnrecognizedSourceOption { options: Vec<String> },

    #[error("Missing source option: {option}")]
    MissingSourceOption { option: String },

    #[error("Unknown source kind: {0}")]
    UnknownSourceKind(String),

    #[error("Manifest for {name} does not belong to {source_id}")]
    ForeignManifest { name: String, source_id: String },

    // VCS errors
    #[error("Command failed: {command}\n{output}")]
    CommandFailed { command: String, output: String },

    #[error("Could not find '{program}' on PATH")]
    ToolNotFound { program: String },

    #[error("Invalid module descriptor {}: {reason}", path.display())]
    InvalidDescriptor { path: PathBuf, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to {action} {}: {source}", path.display())]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, SourceError>;

/// Attach the path and the operation to a filesystem error.
pub(crate) trait IoResultExt<T> {
    fn at_path(self, action: &'static str, path: &Path) -> Result<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn at_path(self, action: &'static str, path: &Path) -> Result<T> {
        self.map_err(|source| SourceError::Filesystem {
            action,
            path: path.to_path_buf(),
            source,
        })
    }
}
