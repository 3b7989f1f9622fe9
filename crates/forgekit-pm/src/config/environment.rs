use std::path::PathBuf;

/// Paths and operating mode consumed by the source backends.
pub trait Environment: Send + Sync {
    /// Local (offline) mode: only vendored artifacts may be used.
    fn is_local(&self) -> bool;

    /// Vendor mode: persist downloaded artifacts for later offline use.
    fn is_vendor(&self) -> bool;

    fn cache_root(&self) -> PathBuf;

    fn install_root(&self) -> PathBuf;

    /// Where forge release tarballs are vendored.
    fn vendor_cache_root(&self) -> PathBuf;

    /// Where git snapshots are vendored.
    fn vendor_source_root(&self) -> PathBuf;
}
