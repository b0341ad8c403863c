//! HTTP transport seam.
//!
//! # Design
//! The connection core describes each request as plain data and hands it to
//! a `Transport`. `UreqTransport` performs real blocking I/O; tests plug in
//! scripted transports to count calls and replay canned responses.

use std::collections::HashMap;
use std::fmt;
use std::io::{Cursor, Read};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::config::ProxySettings;

/// A POST request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub proxy: Option<ProxySettings>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Response status and headers, with the body left unread.
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Box<dyn Read>,
}

impl HttpResponse {
    /// Response with an in-memory body.
    pub fn from_bytes(status: u16, headers: Vec<(String, String)>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers,
            body: Box::new(Cursor::new(body.into())),
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Connection-level failure; no response is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    /// TLS handshake or certificate validation failed.
    Tls(String),
    Connection(String),
}

pub trait Transport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure>;
}

/// Blocking transport backed by `ureq`. Non-2xx statuses are returned as
/// responses, never as errors. No timeout is configured beyond ureq's own.
///
/// One agent is kept per proxy setting, so pooled connections are reused
/// across retries and calls.
#[derive(Debug, Default)]
pub struct UreqTransport {
    agents: Mutex<HashMap<Option<String>, ureq::Agent>>,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn agent_for(&self, proxy: Option<&ProxySettings>) -> Result<ureq::Agent, TransportFailure> {
        let key = proxy.map(ProxySettings::to_uri);
        let mut agents = self.agents.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(agent) = agents.get(&key) {
            return Ok(agent.clone());
        }

        let proxy = match &key {
            Some(uri) => Some(
                ureq::Proxy::new(uri).map_err(|e| TransportFailure::Connection(e.to_string()))?,
            ),
            None => None,
        };
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .proxy(proxy)
            .build()
            .new_agent();
        debug!(proxied = key.is_some(), "created http agent");
        agents.insert(key, agent.clone());
        Ok(agent)
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure> {
        let agent = self.agent_for(request.proxy.as_ref())?;

        let mut builder = agent.post(request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let response = builder.send(&request.body[..]).map_err(classify_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = Box::new(response.into_body().into_reader());

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// TLS variants map directly; I/O errors fall back to the message text since
/// handshake failures can surface wrapped in `io::Error`.
fn classify_error(err: ureq::Error) -> TransportFailure {
    match err {
        ureq::Error::Tls(_)
        | ureq::Error::Rustls(_)
        | ureq::Error::Pem(_)
        | ureq::Error::TlsRequired => TransportFailure::Tls(err.to_string()),
        ureq::Error::Io(_) => classify_failure(err.to_string()),
        other => TransportFailure::Connection(other.to_string()),
    }
}

/// Sort a connection error message into TLS and everything else.
pub fn classify_failure(message: String) -> TransportFailure {
    let lower = message.to_ascii_lowercase();
    if ["certificate", "tls", "ssl", "handshake"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        TransportFailure::Tls(message)
    } else {
        TransportFailure::Connection(message)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
