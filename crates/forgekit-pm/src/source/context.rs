use std::fmt;
use std::sync::Arc;

use crate::config::{Config, Environment, DEFAULT_FORGE_URL};
use crate::descriptor::{DescriptorReader, FileDescriptorReader};
use crate::error::Result;
use crate::http::HttpClient;
use crate::process::{CommandRunner, SystemCommandRunner};

/// Collaborators shared by every source of one run.
#[derive(Clone)]
pub struct SourceContext {
    env: Arc<dyn Environment>,
    http: HttpClient,
    runner: Arc<dyn CommandRunner>,
    descriptors: Arc<dyn DescriptorReader>,
    default_forge: String,
}

impl SourceContext {
    pub fn builder(env: Arc<dyn Environment>) -> SourceContextBuilder {
        SourceContextBuilder {
            env,
            http: None,
            runner: None,
            descriptors: None,
            default_forge: None,
        }
    }

    /// Production context: real HTTP, real processes, file descriptors.
    pub fn from_config(config: Config) -> Result<Self> {
        let http = HttpClient::with_config(&config.http_client_config())?;
        let forge = config.forge_url.clone();
        Self::builder(Arc::new(config))
            .with_http(http)
            .with_default_forge(forge)
            .build()
    }

    pub fn env(&self) -> &dyn Environment {
        self.env.as_ref()
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    pub fn descriptors(&self) -> &dyn DescriptorReader {
        self.descriptors.as_ref()
    }

    /// Forge that VCS-hosted modules resolve their dependencies against.
    pub fn default_forge(&self) -> &str {
        &self.default_forge
    }
}

impl fmt::Debug for SourceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceContext")
            .field("default_forge", &self.default_forge)
            .finish_non_exhaustive()
    }
}

pub struct SourceContextBuilder {
    env: Arc<dyn Environment>,
    http: Option<HttpClient>,
    runner: Option<Arc<dyn CommandRunner>>,
    descriptors: Option<Arc<dyn DescriptorReader>>,
    default_forge: Option<String>,
}

impl SourceContextBuilder {
    pub fn with_http(mut self, http: HttpClient) -> Self {
        self.http = Some(http);
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn with_descriptor_reader(mut self, reader: Arc<dyn DescriptorReader>) -> Self {
        self.descriptors = Some(reader);
        self
    }

    pub fn with_default_forge(mut self, uri: impl Into<String>) -> Self {
        self.default_forge = Some(uri.into());
        self
    }

    pub fn build(self) -> Result<SourceContext> {
        let http = match self.http {
            Some(http) => http,
            None => HttpClient::new()?,
        };

        Ok(SourceContext {
            env: self.env,
            http,
            runner: self.runner.unwrap_or_else(|| Arc::new(SystemCommandRunner)),
            descriptors: self
                .descriptors
                .unwrap_or_else(|| Arc::new(FileDescriptorReader)),
            default_forge: self
                .default_forge
                .unwrap_or_else(|| DEFAULT_FORGE_URL.to_string()),
        })
    }
}
