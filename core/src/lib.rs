//! Client core for the Pdfcrowd conversion API.
//!
//! # Overview
//! Every conversion is a single authenticated `multipart/form-data` POST to
//! `{scheme}://{host}:{port}/convert/{version}/`. Converter builders collect
//! options into a `RequestSpec`; `Connection` encodes it, sends it, retries
//! on 502, and returns the output bytes together with the metadata the
//! server reports in response headers.
//!
//! # Design
//! - All failures are a single `ApiError` carrying status code, reason code,
//!   message and documentation link.
//! - Network I/O sits behind the `Transport` trait; `UreqTransport` is the
//!   blocking implementation used by default.
//! - The host override and forced 502s used for testing are explicit
//!   `ConnectionConfig` fields; `ConnectionConfig::from_env` opts into
//!   reading them from the environment.
//! - Nothing is shared between calls: metadata is returned per call.

pub mod client;
pub mod config;
pub mod converters;
pub mod error;
pub mod http;
pub mod multipart;
pub mod types;
pub mod validation;

pub use client::Connection;
pub use config::{ConnectionConfig, ProxySettings};
pub use converters::{HtmlToImageClient, HtmlToPdfClient, PdfToPdfClient};
pub use error::{ApiError, ErrorKind};
pub use http::{HttpRequest, HttpResponse, Transport, TransportFailure, UreqTransport};
pub use types::{Conversion, RequestBuilder, RequestSpec, ResponseMetadata};
pub use validation::{create_invalid_value_message, Check, Rule};
