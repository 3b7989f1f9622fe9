//! Single-request transports used by [`super::HttpClient`].

use std::fmt;
use std::io::Read;

use reqwest::blocking::Client;
use reqwest::header::HeaderMap;
use reqwest::redirect::Policy;
use serde::de::DeserializeOwned;
use url::Url;

use super::client::{HttpClientConfig, HttpError};

/// A response whose body has not been read yet.
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub headers: HeaderMap,
    body: Box<dyn Read + Send>,
}

impl HttpResponse {
    pub fn new(
        status: u16,
        reason: impl Into<String>,
        headers: HeaderMap,
        body: Box<dyn Read + Send>,
    ) -> Self {
        Self {
            status,
            reason: reason.into(),
            headers,
            body,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    /// Header value as a string, ignoring values that are not valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Hand over the body stream.
    pub fn into_reader(self) -> Box<dyn Read + Send> {
        self.body
    }

    pub fn text(mut self) -> std::io::Result<String> {
        let mut text = String::new();
        self.body.read_to_string(&mut text)?;
        Ok(text)
    }

    pub fn json<T: DeserializeOwned>(self, url: &str) -> Result<T, HttpError> {
        let text = self.text()?;
        serde_json::from_str(&text).map_err(|e| HttpError::JsonParse {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("reason", &self.reason)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Sends exactly one GET request and never follows redirects.
pub trait Transport: Send + Sync {
    fn send_get(&self, url: &Url) -> Result<HttpResponse, HttpError>;

    /// Proxy in use for `url`, for tracing only.
    fn proxy_for(&self, _url: &Url) -> Option<String> {
        None
    }
}

/// Production transport on top of the blocking `reqwest` client.
pub struct ReqwestTransport {
    client: Client,
    proxy: Option<String>,
}

impl ReqwestTransport {
    pub fn with_config(config: &HttpClientConfig) -> Result<Self, HttpError> {
        let mut builder = Client::builder()
            .redirect(Policy::none())
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .gzip(true)
            .user_agent(config.user_agent.as_str());

        if let Some(proxy_url) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url).map_err(HttpError::Client)?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(HttpError::Client)?;

        Ok(Self {
            client,
            proxy: config.proxy.clone(),
        })
    }
}

impl Transport for ReqwestTransport {
    fn send_get(&self, url: &Url) -> Result<HttpResponse, HttpError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| HttpError::Request {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        let reason = status.canonical_reason().unwrap_or("").to_string();
        let headers = response.headers().clone();

        Ok(HttpResponse::new(
            status.as_u16(),
            reason,
            headers,
            Box::new(response),
        ))
    }

    fn proxy_for(&self, url: &Url) -> Option<String> {
        self.proxy
            .clone()
            .or_else(|| env_proxy(url, |name| std::env::var(name).ok()))
    }
}

/// Proxy reqwest picks up from the environment for `url`, if any.
///
/// Reads `HTTP_PROXY`/`HTTPS_PROXY`, falling back to `ALL_PROXY`, in upper
/// then lower case. Hosts listed in `NO_PROXY` are reached directly.
fn env_proxy(url: &Url, var: impl Fn(&str) -> Option<String>) -> Option<String> {
    let lookup = |name: &str| {
        var(&name.to_ascii_uppercase())
            .or_else(|| var(name))
            .filter(|value| !value.trim().is_empty())
    };

    let host = url.host_str()?;
    if lookup("no_proxy").map_or(false, |list| bypasses_proxy(&list, host)) {
        return None;
    }

    let scheme_var = match url.scheme() {
        "https" => "https_proxy",
        "http" => "http_proxy",
        _ => return None,
    };
    lookup(scheme_var).or_else(|| lookup("all_proxy"))
}

fn bypasses_proxy(no_proxy: &str, host: &str) -> bool {
    no_proxy
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .any(|entry| {
            if entry == "*" {
                return true;
            }
            let domain = entry.trim_start_matches('.');
            host == domain || host.ends_with(&format!(".{}", domain))
        })
}
