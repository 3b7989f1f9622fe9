//! Content-addressed cache directories.

mod content;

pub use content::{hexdigest, vcs_cache_key, ContentCache};
