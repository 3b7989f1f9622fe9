use md5::{Digest, Md5};
use std::fs;
use std::io;
use std::path::PathBuf;

/// MD5 hex digest of `value`.
pub fn hexdigest(value: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Identity string of a VCS checkout: `uri`, `/path` when set, then `#ref`.
pub fn vcs_cache_key(uri: &str, path: Option<&str>, reference: &str) -> String {
    let mut key = String::from(uri);
    if let Some(path) = path {
        key.push('/');
        key.push_str(path);
    }
    key.push('#');
    key.push_str(reference);
    key
}

/// Maps identifying keys to directories below a root.
///
/// A directory that exists is a cache hit; nothing else is tracked. Callers
/// populate a directory once and trust it for the rest of the run.
#[derive(Debug, Clone)]
pub struct ContentCache {
    root: PathBuf,
    digest_len: Option<usize>,
}

impl ContentCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            digest_len: None,
        }
    }

    /// Cache whose directory names are the first `len` hex digits of the digest.
    pub fn truncated(root: impl Into<PathBuf>, len: usize) -> Self {
        Self {
            root: root.into(),
            digest_len: Some(len),
        }
    }

    pub fn digest(&self, key: &str) -> String {
        let mut digest = hexdigest(key);
        if let Some(len) = self.digest_len {
            digest.truncate(len);
        }
        digest
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(self.digest(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.path_for(key).is_dir()
    }

    /// Create the directory for `key` and return it.
    pub fn create(&self, key: &str) -> io::Result<PathBuf> {
        let path = self.path_for(key);
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// Remove the directory for `key`; a missing directory is not an error.
    pub fn remove(&self, key: &str) -> io::Result<()> {
        match fs::remove_dir_all(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}
