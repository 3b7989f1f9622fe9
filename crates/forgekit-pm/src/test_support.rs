//! Scripted fakes and fixtures for unit tests.

use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, Mutex};

use reqwest::header::{HeaderMap, HeaderValue, LOCATION};
use reqwest::StatusCode;
use tempfile::TempDir;
use url::Url;
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::Result;
use crate::http::{HttpClient, HttpError, HttpResponse, Transport};
use crate::process::{format_command, CommandOutput, CommandRunner};
use crate::source::SourceContext;

pub fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// Uncompressed tar of every file below `dir`, with relative names.
pub fn tar_bytes_of(dir: &Path) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry.unwrap();
        if entry.file_type().is_file() {
            let relative = entry.path().strip_prefix(dir).unwrap();
            builder.append_path_with_name(entry.path(), relative).unwrap();
        }
    }
    builder.into_inner().unwrap()
}

#[derive(Clone)]
struct Route {
    status: u16,
    location: Option<String>,
    body: Vec<u8>,
}

/// In-memory transport; unknown URLs answer 404.
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<String>>,
}

fn normalize(url: &str) -> String {
    Url::parse(url).map(|u| u.to_string()).unwrap_or_else(|_| url.to_string())
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, status: u16, body: impl AsRef<[u8]>) {
        self.routes.lock().unwrap().insert(
            normalize(url),
            Route {
                status,
                location: None,
                body: body.as_ref().to_vec(),
            },
        );
    }

    pub fn redirect(&self, url: &str, location: &str) {
        self.routes.lock().unwrap().insert(
            normalize(url),
            Route {
                status: 302,
                location: Some(location.to_string()),
                body: Vec::new(),
            },
        );
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        let url = normalize(url);
        self.requests.lock().unwrap().iter().filter(|r| **r == url).count()
    }
}

impl Transport for FakeTransport {
    fn send_get(&self, url: &Url) -> std::result::Result<HttpResponse, HttpError> {
        self.requests.lock().unwrap().push(url.to_string());

        let route = self
            .routes
            .lock()
            .unwrap()
            .get(url.as_str())
            .cloned()
            .unwrap_or(Route {
                status: 404,
                location: None,
                body: Vec::new(),
            });

        let mut headers = HeaderMap::new();
        if let Some(location) = &route.location {
            headers.insert(LOCATION, HeaderValue::from_str(location).unwrap());
        }
        let reason = StatusCode::from_u16(route.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("")
            .to_string();

        Ok(HttpResponse::new(
            route.status,
            reason,
            headers,
            Box::new(Cursor::new(route.body)),
        ))
    }
}

type Handler = Box<dyn Fn(&[String], Option<&Path>) -> CommandOutput + Send + Sync>;

struct Rule {
    prefix: String,
    handler: Handler,
}

/// Scripted command runner.
///
/// Rules match on the rendered command line prefix; the most recently added
/// matching rule wins. Unmatched commands succeed with no output.
#[derive(Default)]
pub struct FakeRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<String>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, prefix: &str, status: i32, stdout: impl AsRef<[u8]>, stderr: &str) {
        let stdout = stdout.as_ref().to_vec();
        let stderr = stderr.to_string();
        self.on_with(prefix, move |_, _| CommandOutput {
            status: Some(status),
            stdout: stdout.clone(),
            stderr: stderr.clone(),
            cwd: None,
        });
    }

    pub fn on_with<F>(&self, prefix: &str, handler: F)
    where
        F: Fn(&[String], Option<&Path>) -> CommandOutput + Send + Sync + 'static,
    {
        self.rules.lock().unwrap().push(Rule {
            prefix: prefix.to_string(),
            handler: Box::new(handler),
        });
    }

    /// Every command line run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, program: &str, args: &[String], cwd: Option<&Path>) -> Result<CommandOutput> {
        let line = format_command(program, args);
        self.calls.lock().unwrap().push(line.clone());

        let rules = self.rules.lock().unwrap();
        let output = match rules.iter().rev().find(|r| line.starts_with(&r.prefix)) {
            Some(rule) => (rule.handler)(args, cwd),
            None => CommandOutput {
                status: Some(0),
                ..Default::default()
            },
        };

        Ok(CommandOutput {
            cwd: cwd.map(Path::to_path_buf),
            ..output
        })
    }
}

/// Temporary project directory with a config rooted in it.
pub struct Fixture {
    _dir: TempDir,
    pub config: Config,
    pub transport: Arc<FakeTransport>,
    pub runner: Arc<FakeRunner>,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = Config::with_base_dir(dir.path());
        Self {
            _dir: dir,
            config,
            transport: Arc::new(FakeTransport::new()),
            runner: Arc::new(FakeRunner::new()),
        }
    }

    pub fn local(mut self) -> Self {
        self.config.local = true;
        self
    }

    pub fn vendor(mut self) -> Self {
        self.config.vendor = true;
        self
    }

    pub fn context(&self) -> SourceContext {
        SourceContext::builder(Arc::new(self.config.clone()))
            .with_http(HttpClient::with_transport(self.transport.clone()))
            .with_runner(self.runner.clone())
            .with_default_forge("http://forge.test")
            .build()
            .unwrap()
    }
}
