//! Configuration and the environment the backends run in.
//!
//! # Configuration Sources (in priority order, highest to lowest)
//!
//! 1. Environment variables (`FORGEKIT_*`)
//! 2. Project `forgekit.json`
//! 3. Built-in defaults
//!
//! # Example
//!
//! ```rust,no_run
//! use forgekit_pm::config::{ConfigLoader, Environment};
//! use std::path::Path;
//!
//! let config = ConfigLoader::new(true).load(Path::new("/path/to/project")).unwrap();
//! println!("Modules go to {:?}", config.install_root());
//! ```

mod config;
mod environment;
mod loader;

pub use config::{Config, DEFAULT_FORGE_URL};
pub use environment::Environment;
pub use loader::{ConfigLoader, RawConfig, CONFIG_FILE};
