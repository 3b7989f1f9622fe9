//! Key/value options of a source declaration or lock entry.

use indexmap::IndexMap;

use crate::error::{Result, SourceError};

/// Ordered option map, e.g. `{remote: …, ref: …, sha: …}`.
pub type SourceOptions = IndexMap<String, String>;

pub const REMOTE: &str = "remote";
pub const REF: &str = "ref";
pub const SHA: &str = "sha";
pub const REV: &str = "rev";
pub const PATH: &str = "path";

pub(crate) fn reject_unrecognized(options: &SourceOptions, recognized: &[&str]) -> Result<()> {
    let unrecognized: Vec<String> = options
        .keys()
        .filter(|key| !recognized.contains(&key.as_str()))
        .cloned()
        .collect();

    if unrecognized.is_empty() {
        Ok(())
    } else {
        Err(SourceError::UnrecognizedSourceOption {
            options: unrecognized,
        })
    }
}

pub(crate) fn required(options: &SourceOptions, key: &str) -> Result<String> {
    options
        .get(key)
        .cloned()
        .ok_or_else(|| SourceError::MissingSourceOption {
            option: key.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_unrecognized_lists_every_key() {
        let mut options = SourceOptions::new();
        options.insert("ref".into(), "v1".into());
        options.insert("branch".into(), "main".into());
        options.insert("tag".into(), "v1".into());

        let err = reject_unrecognized(&options, &[REF, PATH]).unwrap_err();
        assert_eq!(err.to_string(), "Unrecognised options: branch, tag");
    }

    #[test]
    fn test_required() {
        let options = SourceOptions::new();
        let err = required(&options, REMOTE).unwrap_err();
        assert!(matches!(err, SourceError::MissingSourceOption { .. }));
    }
}
