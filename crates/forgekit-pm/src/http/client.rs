//! Redirect-following HTTP client.
//!
//! # Examples
//!
//! ```no_run
//! use forgekit_pm::http::HttpClient;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new()?;
//! let response = client.get("https://forgeapi.example.com/puppetlabs/stdlib.json")?;
//! println!("{}", response.text()?);
//! # Ok(())
//! # }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use thiserror::Error;
use url::Url;

use super::transport::{HttpResponse, ReqwestTransport, Transport};

/// Maximum number of redirects followed for a single request.
pub const MAX_REDIRECTS: usize = 10;

const DEFAULT_USER_AGENT: &str = concat!("forgekit/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Request failed for {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Could not get {url} because {status} {message}")]
    HttpStatus {
        status: u16,
        message: String,
        url: String,
    },

    #[error("Could not get {url} because too many redirects")]
    TooManyRedirects { url: String },

    #[error("Could not get {url} because of a redirect cycle at {location}")]
    RedirectCycle { url: String, location: String },

    #[error("Redirect for {url} did not carry a Location header")]
    MissingLocation { url: String },

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(reqwest::Error),

    #[error("JSON deserialization error for {url}: {reason}")]
    JsonParse { url: String, reason: String },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl HttpError {
    /// Status code of a terminal non-success response, if that is what this is.
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub proxy: Option<String>,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            proxy: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// GET client that follows redirects itself.
///
/// There is no retry or backoff: a single non-success, non-redirect response
/// ends the request.
#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn Transport>,
}

impl HttpClient {
    pub fn new() -> Result<Self, HttpError> {
        Self::with_config(&HttpClientConfig::default())
    }

    pub fn with_config(config: &HttpClientConfig) -> Result<Self, HttpError> {
        let transport = ReqwestTransport::with_config(config)?;
        Ok(Self::with_transport(Arc::new(transport)))
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Perform a GET, following up to [`MAX_REDIRECTS`] redirects.
    ///
    /// The returned response is always a success; its body is left unread.
    pub fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        let mut current = Url::parse(url).map_err(|e| HttpError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let mut visited = vec![current.to_string()];

        loop {
            self.trace_attempt(&current);

            let response = self.transport.send_get(&current)?;

            if response.is_success() {
                log::debug!("Responded with success");
                return Ok(response);
            }

            if !response.is_redirect() {
                return Err(HttpError::HttpStatus {
                    status: response.status,
                    message: response.reason.clone(),
                    url: url.to_string(),
                });
            }

            let location = response
                .header("location")
                .ok_or_else(|| HttpError::MissingLocation {
                    url: current.to_string(),
                })?;
            let next = current.join(location).map_err(|e| HttpError::InvalidUrl {
                url: location.to_string(),
                reason: e.to_string(),
            })?;
            log::debug!("Responded with redirect to {}", next);

            // `visited` holds the original URL plus every hop taken so far.
            if visited.len() > MAX_REDIRECTS {
                return Err(HttpError::TooManyRedirects {
                    url: url.to_string(),
                });
            }
            if visited.iter().any(|seen| seen == next.as_str()) {
                return Err(HttpError::RedirectCycle {
                    url: url.to_string(),
                    location: next.to_string(),
                });
            }

            visited.push(next.to_string());
            current = next;
        }
    }

    /// GET and deserialize a JSON body.
    pub fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, HttpError> {
        self.get(url)?.json(url)
    }

    /// Stream `url` into `dest`.
    ///
    /// The body goes to a temporary file next to `dest` that is renamed into
    /// place only once fully written, so an interrupted download never leaves
    /// a file at `dest`.
    pub fn download_to(&self, url: &str, dest: &Path) -> Result<u64, HttpError> {
        let response = self.get(url)?;

        let parent = match dest.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let write_error = |source: io::Error| HttpError::Write {
            path: dest.to_path_buf(),
            source,
        };

        fs::create_dir_all(parent).map_err(write_error)?;
        let mut tmp = NamedTempFile::new_in(parent).map_err(write_error)?;
        let mut body = response.into_reader();
        let written = io::copy(&mut body, tmp.as_file_mut()).map_err(write_error)?;
        tmp.as_file().sync_all().map_err(write_error)?;
        tmp.persist(dest).map_err(|e| write_error(e.error))?;

        log::debug!("Downloaded {} bytes from {} to {}", written, url, dest.display());
        Ok(written)
    }

    fn trace_attempt(&self, url: &Url) {
        log::debug!("Performing http-get for {}", url);
        log::debug!("  uri.host = {}", url.host_str().unwrap_or(""));
        log::debug!(
            "  uri.port = {}",
            url.port_or_known_default()
                .map(|p| p.to_string())
                .unwrap_or_default()
        );
        log::debug!("  uri.path = {}", url.path());
        log::debug!(
            "  uri.request_uri = {}{}",
            url.path(),
            url.query().map(|q| format!("?{}", q)).unwrap_or_default()
        );
        if let Some(proxy) = self.transport.proxy_for(url) {
            log::debug!("  proxy = {}", proxy);
        }
    }
}
