//! Error type shared by every conversion call.
//!
//! # Design
//! The API reports failures as text of the shape
//! `"<http>.<reason> - <message>[ Documentation link: <url>]"`. `ApiError`
//! parses that text into fields callers can branch on. Failures that never
//! reach the server (bad option values, incompatible settings, unreadable
//! files, broken connections) use the same type, tagged with an `ErrorKind`.

use std::io;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Status code attached to option values rejected before sending.
pub const VALIDATION_STATUS: u16 = 470;

/// Synthetic status code for TLS/certificate failures.
pub const TLS_STATUS: u16 = 481;

/// Reason code reported when the code could not be parsed.
pub const UNKNOWN_REASON: i32 = -1;

static STRUCTURED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^(\d+)\.(\d+)\s+-\s+(.*?)(?:\s+Documentation link:\s+(.*))?$")
        .expect("structured error pattern is valid")
});

/// Where an error originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An option value failed its format or range rule.
    Validation,
    /// Client settings that cannot be used together.
    Configuration,
    /// The server answered with a non-200 status.
    Protocol,
    /// The connection failed before a response was available.
    Transport,
    /// A local file could not be read or created.
    Encoding,
}

/// Structured error returned by every fallible operation in this crate.
#[derive(Debug, Error)]
#[error("{display}")]
pub struct ApiError {
    kind: ErrorKind,
    status_code: u16,
    reason_code: i32,
    message: String,
    doc_link: String,
    display: String,
    #[source]
    source: Option<io::Error>,
}

impl ApiError {
    /// Parse error text, falling back to `status` when the text is not in
    /// the structured format. A `status` of 0 means "no status available".
    pub fn parse(kind: ErrorKind, text: &str, status: u16) -> Self {
        if let Some(caps) = STRUCTURED.captures(text) {
            let status_code = caps[1].parse().unwrap_or(status);
            let reason_code = caps[2].parse().unwrap_or(UNKNOWN_REASON);
            return Self {
                kind,
                status_code,
                reason_code,
                message: caps[3].to_string(),
                doc_link: caps.get(4).map(|m| m.as_str().to_string()).unwrap_or_default(),
                display: text.to_string(),
                source: None,
            };
        }

        let display = if status != 0 {
            format!("{status} - {text}")
        } else {
            text.to_string()
        };
        Self {
            kind,
            status_code: status,
            reason_code: UNKNOWN_REASON,
            message: text.to_string(),
            doc_link: String::new(),
            display,
            source: None,
        }
    }

    /// Non-200 response body together with its HTTP status.
    pub fn protocol(body: &str, status: u16) -> Self {
        Self::parse(ErrorKind::Protocol, body, status)
    }

    /// Option value rejected by a validation rule; `text` is the output of
    /// [`crate::validation::create_invalid_value_message`].
    pub fn validation(text: &str) -> Self {
        let mut err = Self::parse(ErrorKind::Validation, text, VALIDATION_STATUS);
        err.status_code = VALIDATION_STATUS;
        err
    }

    pub fn configuration(message: &str) -> Self {
        Self::parse(ErrorKind::Configuration, message, 0)
    }

    /// Connection failure with no server response to parse.
    pub fn transport(message: &str) -> Self {
        Self::parse(ErrorKind::Transport, message, 0)
    }

    /// TLS handshake or certificate failure. The message points at plain
    /// HTTP as the fallback.
    pub fn tls(detail: &str) -> Self {
        let text = format!(
            "{TLS_STATUS}.356 - There was a problem connecting to Pdfcrowd servers over HTTPS:\n{detail}\n\
             You can still use the API over HTTP, you just need to call \
             set_use_http(true) right after the client is created."
        );
        Self::parse(ErrorKind::Transport, &text, TLS_STATUS)
    }

    /// A local file could not be read for a file part, or created for
    /// output.
    pub fn encoding(path: &Path, source: io::Error) -> Self {
        let text = format!("cannot access file '{}': {source}", path.display());
        let mut err = Self::parse(ErrorKind::Encoding, &text, 0);
        err.source = Some(source);
        err
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// HTTP status code, or 0 when none applies.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Server-specific sub-code, or [`UNKNOWN_REASON`].
    pub fn reason_code(&self) -> i32 {
        self.reason_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Documentation link, empty when the server did not send one.
    pub fn doc_link(&self) -> &str {
        &self.doc_link
    }
}
