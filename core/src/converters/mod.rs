//! Converter builders.
//!
//! Each converter pre-sets its input/output formats, validates option values
//! against its rule table, and sends everything through a shared
//! [`Connection`]. Only a representative set of options is exposed; any other
//! wire option can be passed with `set_option`.

mod html_to_image;
mod html_to_pdf;
mod pdf_to_pdf;

pub use html_to_image::HtmlToImageClient;
pub use html_to_pdf::HtmlToPdfClient;
pub use pdf_to_pdf::PdfToPdfClient;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::client::Connection;
use crate::error::ApiError;
use crate::http::Transport;
use crate::types::{Conversion, RequestBuilder, RequestSpec, ResponseMetadata};
use crate::validation::{Check, Rule};

/// Options and connection shared by all converters.
#[derive(Debug)]
struct ConverterCore<T: Transport> {
    connection: Connection<T>,
    request: RequestBuilder,
}

impl<T: Transport> ConverterCore<T> {
    fn new(connection: Connection<T>, input_format: &str, output_format: &str) -> Self {
        let mut request = RequestBuilder::new();
        request
            .set("input_format", input_format)
            .set("output_format", output_format);
        Self {
            connection,
            request,
        }
    }

    fn set_checked(&mut self, rule: &Rule, value: &str) -> Result<(), ApiError> {
        rule.validate(value)?;
        self.request.set(rule.field, value);
        Ok(())
    }

    /// Options plus the per-call input added by `input`.
    fn spec_with(&self, input: impl FnOnce(&mut RequestBuilder)) -> RequestSpec {
        let mut request = self.request.clone();
        input(&mut request);
        request.build()
    }

    fn post(&self, spec: &RequestSpec) -> Result<Conversion, ApiError> {
        self.connection.post(spec)
    }

    fn post_to<W: Write + ?Sized>(
        &self,
        spec: &RequestSpec,
        sink: &mut W,
    ) -> Result<ResponseMetadata, ApiError> {
        self.connection.post_to(spec, sink)
    }

    fn post_to_file(&self, spec: &RequestSpec, path: &Path) -> Result<ResponseMetadata, ApiError> {
        write_to_file(path, |file| self.connection.post_to(spec, file))
    }
}

/// Create `path` and let `convert` fill it; the file is removed again if
/// the conversion fails.
fn write_to_file<F>(path: &Path, convert: F) -> Result<ResponseMetadata, ApiError>
where
    F: FnOnce(&mut File) -> Result<ResponseMetadata, ApiError>,
{
    let mut file = File::create(path).map_err(|e| ApiError::encoding(path, e))?;
    match convert(&mut file) {
        Ok(metadata) => Ok(metadata),
        Err(err) => {
            drop(file);
            if let Err(e) = fs::remove_file(path) {
                debug!(path = %path.display(), error = %e, "failed to remove partial output");
            }
            Err(err)
        }
    }
}

/// Rule for an input that only has to be present.
const fn non_empty(field: &'static str, converter: &'static str, anchor: &'static str) -> Rule {
    Rule::new(field, converter, anchor, "The string must not be empty.", Check::NonEmpty)
}

/// Rule for URL inputs.
const fn http_url(field: &'static str, converter: &'static str, anchor: &'static str) -> Rule {
    Rule::new(
        field,
        converter,
        anchor,
        "Supported protocols are http:// and https://.",
        Check::Pattern("https?://.*"),
    )
}

/// Rule for CSS-like lengths such as `1in` or `12.5mm`.
const fn length(field: &'static str, converter: &'static str, anchor: &'static str) -> Rule {
    Rule::new(
        field,
        converter,
        anchor,
        "The value must be specified in inches \"in\", millimeters \"mm\", centimeters \"cm\", pixels \"px\", or points \"pt\".",
        Check::Pattern(r"(0|[0-9]*\.?[0-9]+(pt|px|mm|cm|in))"),
    )
}
