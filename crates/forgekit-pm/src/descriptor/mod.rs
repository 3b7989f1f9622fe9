//! Module descriptor reading.
//!
//! A checked-out module declares its own version and dependencies either in
//! `metadata.json` or in the older `Modulefile`. The backends only see the
//! [`DescriptorReader`] trait.

mod modulefile;
mod reader;

pub use modulefile::parse_modulefile;
pub use reader::{DescriptorReader, FileDescriptorReader, ModuleDescriptor, METADATA_JSON, MODULEFILE};

/// Requirement used when a dependency does not state one.
pub const ANY_REQUIREMENT: &str = ">= 0";
