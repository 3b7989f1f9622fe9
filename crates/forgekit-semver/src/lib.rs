//! Version handling for infrastructure modules.
//!
//! Module versions follow the loose dotted scheme used by module registries:
//! numeric release segments optionally followed by alphanumeric pre-release
//! segments (`1.2.0`, `1.0.0.rc1`, `2.0.0-beta.2`). Requirements use the
//! operator syntax found in module descriptors (`>= 1.0.0 < 2.0.0`, `1.x`,
//! `~> 1.2`).

mod requirement;
mod version;

pub use requirement::{Operator, Predicate, Requirement, RequirementError};
pub use version::{Version, VersionError};

/// Sort version strings newest first, dropping the ones that do not parse.
///
/// Returns the sorted valid versions and the rejected inputs in their
/// original order.
pub fn sort_descending<S: AsRef<str>>(versions: &[S]) -> (Vec<String>, Vec<String>) {
    let mut valid = Vec::with_capacity(versions.len());
    let mut rejected = Vec::new();

    for raw in versions {
        let raw = raw.as_ref();
        match Version::parse(raw) {
            Ok(version) => valid.push(version),
            Err(_) => rejected.push(raw.to_string()),
        }
    }

    valid.sort_by(|a, b| b.cmp(a));
    (valid.into_iter().map(|v| v.to_string()).collect(), rejected)
}
