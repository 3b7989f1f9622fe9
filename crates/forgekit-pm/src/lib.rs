pub mod archive;
pub mod cache;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod http;
pub mod process;
pub mod source;
pub mod util;

pub use config::{Config, ConfigLoader, Environment};
pub use descriptor::{DescriptorReader, FileDescriptorReader, ModuleDescriptor};
pub use error::{Result, SourceError};
pub use http::{HttpClient, HttpClientConfig, HttpError};
pub use process::{CommandOutput, CommandRunner, SystemCommandRunner};
pub use source::{
    Dependency, ForgeSource, GitSource, Manifest, Source, SourceContext, SourceKind,
    SourceOptions, SvnSource,
};

#[cfg(test)]
mod test_support;
