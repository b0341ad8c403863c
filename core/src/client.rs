//! The connection core: one multipart POST per conversion.
//!
//! # Design
//! `Connection` owns the settings and a `Transport`. A `post` encodes the
//! request once, then sends it until it gets a non-502 outcome or runs out
//! of retries. Response metadata is built fresh for every call and returned
//! with the output, so nothing from an earlier call can leak into a later
//! one.
//!
//! Settings are read through `&self` during a call; `config_mut` needs
//! `&mut self`, so changes only ever apply to the next call.

use std::io::{self, Read, Seek, Write};
use std::str::FromStr;
use std::thread;

use tracing::{debug, warn};

use crate::config::ConnectionConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport, TransportFailure, UreqTransport};
use crate::multipart;
use crate::types::{Conversion, RequestSpec, ResponseMetadata, UNKNOWN_CREDITS};

pub const HEADER_DEBUG_LOG: &str = "X-Pdfcrowd-Debug-Log";
pub const HEADER_REMAINING_CREDITS: &str = "X-Pdfcrowd-Remaining-Credits";
pub const HEADER_CONSUMED_CREDITS: &str = "X-Pdfcrowd-Consumed-Credits";
pub const HEADER_JOB_ID: &str = "X-Pdfcrowd-Job-Id";
pub const HEADER_PAGES: &str = "X-Pdfcrowd-Pages";
pub const HEADER_TOTAL_PAGES: &str = "X-Pdfcrowd-Total-Pages";
pub const HEADER_OUTPUT_SIZE: &str = "X-Pdfcrowd-Output-Size";

const BAD_GATEWAY: u16 = 502;

const HTTP_OVER_PROXY: &str =
    "HTTP over a proxy is not supported. Use HTTPS with the proxy, or remove the proxy.";

#[derive(Debug)]
pub struct Connection<T: Transport = UreqTransport> {
    config: ConnectionConfig,
    transport: T,
}

impl Connection<UreqTransport> {
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_transport(config, UreqTransport::new())
    }
}

impl<T: Transport> Connection<T> {
    pub fn with_transport(config: ConnectionConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Settings for subsequent calls.
    pub fn config_mut(&mut self) -> &mut ConnectionConfig {
        &mut self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send `spec` and buffer the output in memory.
    pub fn post(&self, spec: &RequestSpec) -> Result<Conversion, ApiError> {
        let mut bytes = Vec::new();
        let metadata = self.post_to(spec, &mut bytes)?;
        Ok(Conversion { bytes, metadata })
    }

    /// Send `spec` and stream the output into `sink`. Nothing is written to
    /// `sink` unless the server answered 200.
    pub fn post_to<W: Write + ?Sized>(
        &self,
        spec: &RequestSpec,
        sink: &mut W,
    ) -> Result<ResponseMetadata, ApiError> {
        if self.config.use_http() && self.config.proxy().is_some() {
            return Err(ApiError::configuration(HTTP_OVER_PROXY));
        }

        let body = multipart::encode(spec)?;
        let mut retries = 0;
        loop {
            match self.attempt(&body, retries) {
                Ok(response) => return self.finish(response, retries, sink),
                Err(failed)
                    if failed.http_status == BAD_GATEWAY && retries < self.config.retry_count() =>
                {
                    retries += 1;
                    let delay = self.config.retry_unit() * retries;
                    warn!(
                        retry = retries,
                        max = self.config.retry_count(),
                        delay_ms = delay.as_millis() as u64,
                        "bad gateway, retrying"
                    );
                    thread::sleep(delay);
                }
                Err(failed) => return Err(failed.error),
            }
        }
    }

    /// [`Connection::post_to`], then rewind `sink` to its start.
    pub fn post_to_seekable<W: Write + Seek + ?Sized>(
        &self,
        spec: &RequestSpec,
        sink: &mut W,
    ) -> Result<ResponseMetadata, ApiError> {
        let metadata = self.post_to(spec, sink)?;
        sink.rewind()
            .map_err(|e| ApiError::transport(&format!("cannot rewind output: {e}")))?;
        Ok(metadata)
    }

    fn attempt(&self, body: &[u8], retries: u32) -> Result<HttpResponse, FailedAttempt> {
        if self.config.force_502() && retries < self.config.retry_count() {
            debug!(retry = retries, "forced bad gateway");
            return Err(FailedAttempt {
                http_status: BAD_GATEWAY,
                error: ApiError::protocol("502.0 - Forced bad gateway response.", BAD_GATEWAY),
            });
        }

        let request = self.build_request(body);
        debug!(
            url = %request.url,
            body_len = request.body.len(),
            attempt = retries + 1,
            "sending conversion request"
        );

        let mut response = self.transport.execute(request).map_err(|failure| FailedAttempt {
            http_status: 0,
            error: match failure {
                TransportFailure::Tls(detail) => ApiError::tls(&detail),
                TransportFailure::Connection(message) => ApiError::transport(&message),
            },
        })?;

        if response.status == 200 {
            return Ok(response);
        }

        let mut raw = Vec::new();
        if let Err(e) = response.body.read_to_end(&mut raw) {
            debug!(error = %e, "failed to read error body");
        }
        let text = String::from_utf8_lossy(&raw);
        Err(FailedAttempt {
            http_status: response.status,
            error: ApiError::protocol(text.trim_end(), response.status),
        })
    }

    fn build_request(&self, body: &[u8]) -> HttpRequest {
        HttpRequest {
            url: self.config.endpoint_url(),
            headers: vec![
                ("Authorization".to_string(), self.config.authorization()),
                ("User-Agent".to_string(), self.config.user_agent().to_string()),
                ("Content-Type".to_string(), multipart::content_type()),
            ],
            body: body.to_vec(),
            proxy: self.config.proxy().cloned(),
        }
    }

    fn finish<W: Write + ?Sized>(
        &self,
        mut response: HttpResponse,
        retries: u32,
        sink: &mut W,
    ) -> Result<ResponseMetadata, ApiError> {
        let mut metadata = read_metadata(&response);
        metadata.converter_version = self.config.converter_version().to_string();
        metadata.retries = retries;

        io::copy(&mut response.body, sink)
            .map_err(|e| ApiError::transport(&format!("failed to read conversion output: {e}")))?;

        debug!(
            job_id = %metadata.job_id,
            pages = metadata.page_count,
            output_size = metadata.output_size,
            remaining_credits = metadata.remaining_credit_count,
            "conversion finished"
        );
        Ok(metadata)
    }
}

/// An attempt that produced no usable output. `http_status` is the status
/// line of the response (0 without one), which may differ from the code
/// parsed out of the error body.
struct FailedAttempt {
    http_status: u16,
    error: ApiError,
}

/// Metadata from response headers; absent or malformed headers keep their
/// defaults.
pub fn read_metadata(response: &HttpResponse) -> ResponseMetadata {
    ResponseMetadata {
        debug_log_url: response
            .header(HEADER_DEBUG_LOG)
            .filter(|v| !v.is_empty())
            .map(str::to_string),
        remaining_credit_count: parse_header(response, HEADER_REMAINING_CREDITS, UNKNOWN_CREDITS),
        consumed_credit_count: parse_header(response, HEADER_CONSUMED_CREDITS, 0),
        job_id: response.header(HEADER_JOB_ID).unwrap_or_default().to_string(),
        page_count: parse_header(response, HEADER_PAGES, 0),
        total_page_count: parse_header(response, HEADER_TOTAL_PAGES, 0),
        output_size: parse_header(response, HEADER_OUTPUT_SIZE, 0),
        ..ResponseMetadata::default()
    }
}

fn parse_header<V: FromStr>(response: &HttpResponse, name: &str, default: V) -> V {
    response
        .header(name)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
