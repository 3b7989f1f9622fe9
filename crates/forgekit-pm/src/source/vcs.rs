//! Pieces shared by the git and svn backends.

use std::path::{Path, PathBuf};

use super::context::SourceContext;
use super::dependency::Dependency;
use super::forge::ForgeSource;
use super::Source;
use crate::error::{IoResultExt, Result, SourceError};
use crate::util::{copy_dir_all, module_short_name, remove_path};

/// Version assumed for a checkout without a descriptor.
pub const DEFAULT_MODULE_VERSION: &str = "0.0.1";

pub(crate) fn descriptor_version(context: &SourceContext, root: &Path) -> Result<Option<String>> {
    Ok(context
        .descriptors()
        .read(root)?
        .and_then(|descriptor| descriptor.version))
}

/// Dependencies declared in the descriptor below `root`, resolved against
/// the default forge.
pub(crate) fn descriptor_dependencies(
    context: &SourceContext,
    root: &Path,
    module: &str,
    version: &str,
) -> Result<Vec<Dependency>> {
    let descriptor = match context.descriptors().read(root)? {
        Some(descriptor) => descriptor,
        None => return Ok(Vec::new()),
    };

    let forge = Source::Forge(ForgeSource::new(context.clone(), context.default_forge()));
    descriptor
        .dependencies
        .iter()
        .map(|(name, requirement)| {
            Dependency::declared_by(module, version, name, requirement, Some(forge.clone()))
        })
        .collect()
}

/// Replace `<install_root>/<short name>` with a copy of `found`.
pub(crate) fn install_tree(
    context: &SourceContext,
    found: &Path,
    name: &str,
    skip: &[&str],
    source_id: &str,
) -> Result<PathBuf> {
    if !found.is_dir() {
        return Err(SourceError::ModuleNotFound {
            name: name.to_string(),
            source_id: source_id.to_string(),
        });
    }

    let install_path = context.env().install_root().join(module_short_name(name));
    log::debug!("Copying {} to {}", found.display(), install_path.display());
    remove_path(&install_path).at_path("remove", &install_path)?;
    copy_dir_all(found, &install_path, skip).at_path("copy module into", &install_path)?;
    Ok(install_path)
}
