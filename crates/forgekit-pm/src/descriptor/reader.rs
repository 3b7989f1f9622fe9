use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use super::modulefile::parse_modulefile;
use super::ANY_REQUIREMENT;
use crate::error::{IoResultExt, Result, SourceError};

pub const METADATA_JSON: &str = "metadata.json";
pub const MODULEFILE: &str = "Modulefile";

/// What a module says about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleDescriptor {
    pub name: Option<String>,
    pub version: Option<String>,
    /// Dependency name to requirement string, in declaration order.
    pub dependencies: IndexMap<String, String>,
}

pub trait DescriptorReader: Send + Sync {
    /// Read the descriptor below `root`; `Ok(None)` when there is none.
    fn read(&self, root: &Path) -> Result<Option<ModuleDescriptor>>;
}

/// Reads `metadata.json`, falling back to `Modulefile`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileDescriptorReader;

#[derive(Deserialize)]
struct MetadataJson {
    name: Option<String>,
    version: Option<String>,
    #[serde(default)]
    dependencies: Vec<MetadataDependency>,
}

#[derive(Deserialize)]
struct MetadataDependency {
    name: String,
    version_requirement: Option<String>,
}

impl DescriptorReader for FileDescriptorReader {
    fn read(&self, root: &Path) -> Result<Option<ModuleDescriptor>> {
        let metadata = root.join(METADATA_JSON);
        if metadata.is_file() {
            log::trace!("Reading {}", metadata.display());
            let contents = fs::read_to_string(&metadata).at_path("read", &metadata)?;
            let parsed: MetadataJson =
                serde_json::from_str(&contents).map_err(|e| SourceError::InvalidDescriptor {
                    path: metadata.clone(),
                    reason: e.to_string(),
                })?;

            let dependencies = parsed
                .dependencies
                .into_iter()
                .map(|d| {
                    let requirement = d
                        .version_requirement
                        .unwrap_or_else(|| ANY_REQUIREMENT.to_string());
                    (d.name, requirement)
                })
                .collect();

            return Ok(Some(ModuleDescriptor {
                name: parsed.name,
                version: parsed.version,
                dependencies,
            }));
        }

        let modulefile = root.join(MODULEFILE);
        if modulefile.is_file() {
            log::trace!("Reading {}", modulefile.display());
            let contents = fs::read_to_string(&modulefile).at_path("read", &modulefile)?;
            return parse_modulefile(&contents)
                .map(Some)
                .map_err(|reason| SourceError::InvalidDescriptor {
                    path: modulefile,
                    reason,
                });
        }

        Ok(None)
    }
}
