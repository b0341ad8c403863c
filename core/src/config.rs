//! Connection settings shared by every converter.
//!
//! `ConnectionConfig` is read once at the start of each `post`; changing it
//! between calls affects only later calls.

use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::error::ApiError;
use crate::validation::{Check, Rule};

pub const DEFAULT_HOST: &str = "api.pdfcrowd.com";
pub const DEFAULT_CONVERTER_VERSION: &str = "24.04";
pub const DEFAULT_RETRY_COUNT: u32 = 1;
pub const DEFAULT_RETRY_UNIT: Duration = Duration::from_millis(100);
pub const HTTP_PORT: u16 = 80;
pub const HTTPS_PORT: u16 = 443;
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Converter whose reference is linked when no converter is named.
const DEFAULT_CONVERTER: &str = "html-to-pdf";

const fn converter_version_rule(converter: &'static str) -> Rule {
    Rule::new(
        "converter_version",
        converter,
        "set_converter_version",
        "Allowed values are 24.04, 20.10, 18.10, latest.",
        Check::Pattern(r"(24\.04|20\.10|18\.10|latest)"),
    )
}

/// Proxy the requests are routed through (HTTPS mode only).
#[derive(Clone, PartialEq, Eq)]
pub struct ProxySettings {
    pub host: String,
    pub port: u16,
    pub user_name: Option<String>,
    pub password: Option<String>,
}

impl ProxySettings {
    /// Proxy URI with percent-encoded credentials, as understood by `ureq`.
    pub fn to_uri(&self) -> String {
        match &self.user_name {
            Some(user) => {
                let user = utf8_percent_encode(user, NON_ALPHANUMERIC);
                let password = self.password.as_deref().unwrap_or("");
                let password = utf8_percent_encode(password, NON_ALPHANUMERIC);
                format!("http://{user}:{password}@{}:{}", self.host, self.port)
            }
            None => format!("http://{}:{}", self.host, self.port),
        }
    }
}

impl fmt::Debug for ProxySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxySettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user_name", &self.user_name)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Clone)]
pub struct ConnectionConfig {
    user_name: String,
    api_key: String,
    host: String,
    port: Option<u16>,
    use_http: bool,
    proxy: Option<ProxySettings>,
    user_agent: String,
    converter_version: String,
    retry_count: u32,
    retry_unit: Duration,
    force_502: bool,
}

impl ConnectionConfig {
    pub fn new(user_name: &str, api_key: &str) -> Self {
        Self {
            user_name: user_name.to_string(),
            api_key: api_key.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: None,
            use_http: false,
            proxy: None,
            user_agent: format!("pdfcrowd_rust_client/{CLIENT_VERSION} (https://pdfcrowd.com)"),
            converter_version: DEFAULT_CONVERTER_VERSION.to_string(),
            retry_count: DEFAULT_RETRY_COUNT,
            retry_unit: DEFAULT_RETRY_UNIT,
            force_502: false,
        }
    }

    /// Like [`ConnectionConfig::new`], then applies `PDFCROWD_HOST` as the host
    /// override and enables forced 502 responses when
    /// `PDFCROWD_UNIT_TEST_MODE` is set.
    pub fn from_env(user_name: &str, api_key: &str) -> Self {
        let mut config = Self::new(user_name, api_key);
        if let Ok(host) = std::env::var("PDFCROWD_HOST") {
            if !host.is_empty() {
                config.set_host(&host);
            }
        }
        if std::env::var("PDFCROWD_UNIT_TEST_MODE").is_ok_and(|v| !v.is_empty()) {
            config.set_force_502(true);
        }
        config
    }

    /// Plain HTTP instead of HTTPS. Cannot be combined with a proxy.
    pub fn set_use_http(&mut self, value: bool) -> &mut Self {
        self.use_http = value;
        self
    }

    pub fn set_user_agent(&mut self, value: &str) -> &mut Self {
        self.user_agent = value.to_string();
        self
    }

    pub fn set_proxy(
        &mut self,
        host: &str,
        port: u16,
        user_name: Option<&str>,
        password: Option<&str>,
    ) -> &mut Self {
        self.proxy = Some(ProxySettings {
            host: host.to_string(),
            port,
            user_name: user_name.map(str::to_string),
            password: password.map(str::to_string),
        });
        self
    }

    pub fn clear_proxy(&mut self) -> &mut Self {
        self.proxy = None;
        self
    }

    /// Maximum number of retries after a 502 response.
    pub fn set_retry_count(&mut self, value: u32) -> &mut Self {
        self.retry_count = value;
        self
    }

    pub fn set_converter_version(&mut self, value: &str) -> Result<&mut Self, ApiError> {
        self.set_converter_version_for(value, DEFAULT_CONVERTER)
    }

    /// Like [`ConnectionConfig::set_converter_version`], with errors linking
    /// to the reference of `converter` (e.g. `pdf-to-pdf`).
    pub fn set_converter_version_for(
        &mut self,
        value: &str,
        converter: &'static str,
    ) -> Result<&mut Self, ApiError> {
        converter_version_rule(converter).validate(value)?;
        self.converter_version = value.to_string();
        Ok(self)
    }

    pub fn set_host(&mut self, value: &str) -> &mut Self {
        self.host = value.to_string();
        self
    }

    /// Overrides the port implied by the scheme.
    pub fn set_port(&mut self, value: Option<u16>) -> &mut Self {
        self.port = value;
        self
    }

    /// Backoff unit; the n-th retry sleeps `n * unit`.
    pub fn set_retry_unit(&mut self, value: Duration) -> &mut Self {
        self.retry_unit = value;
        self
    }

    /// Answer attempts with a synthetic 502 while retries remain.
    pub fn set_force_502(&mut self, value: bool) -> &mut Self {
        self.force_502 = value;
        self
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn use_http(&self) -> bool {
        self.use_http
    }

    pub fn proxy(&self) -> Option<&ProxySettings> {
        self.proxy.as_ref()
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn converter_version(&self) -> &str {
        &self.converter_version
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn retry_unit(&self) -> Duration {
        self.retry_unit
    }

    pub fn force_502(&self) -> bool {
        self.force_502
    }

    pub fn scheme(&self) -> &'static str {
        if self.use_http {
            "http"
        } else {
            "https"
        }
    }

    pub fn port(&self) -> u16 {
        self.port
            .unwrap_or(if self.use_http { HTTP_PORT } else { HTTPS_PORT })
    }

    pub fn endpoint_url(&self) -> String {
        format!(
            "{}://{}:{}/convert/{}/",
            self.scheme(),
            self.host,
            self.port(),
            self.converter_version
        )
    }

    /// `Authorization` header value: Basic over the Latin-1 bytes of
    /// `user:key`.
    pub fn authorization(&self) -> String {
        let credentials = format!("{}:{}", self.user_name, self.api_key);
        format!("Basic {}", STANDARD.encode(latin1_bytes(&credentials)))
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("user_name", &self.user_name)
            .field("api_key", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port())
            .field("use_http", &self.use_http)
            .field("proxy", &self.proxy)
            .field("user_agent", &self.user_agent)
            .field("converter_version", &self.converter_version)
            .field("retry_count", &self.retry_count)
            .field("force_502", &self.force_502)
            .finish()
    }
}

/// Characters outside Latin-1 become `?`.
fn latin1_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}
