//! HTML to PDF conversion.

use std::io::Write;
use std::path::Path;

use super::{http_url, length, non_empty, ConverterCore};
use crate::client::Connection;
use crate::config::ConnectionConfig;
use crate::error::ApiError;
use crate::http::{Transport, UreqTransport};
use crate::types::{Conversion, ResponseMetadata};
use crate::validation::{Check, Rule};

const CONVERTER: &str = "html-to-pdf";

const URL: Rule = http_url("url", CONVERTER, "convert_url");
const FILE: Rule = non_empty("file", CONVERTER, "convert_file");
const TEXT: Rule = non_empty("text", CONVERTER, "convert_string");
const PAGE_SIZE: Rule = Rule::new(
    "page_size",
    CONVERTER,
    "set_page_size",
    "Allowed values are A0, A1, A2, A3, A4, A5, A6, Letter.",
    Check::Pattern("(A0|A1|A2|A3|A4|A5|A6|Letter)"),
);
const ORIENTATION: Rule = Rule::new(
    "orientation",
    CONVERTER,
    "set_orientation",
    "Allowed values are landscape, portrait.",
    Check::Pattern("(landscape|portrait)"),
);
const MARGIN_TOP: Rule = length("margin_top", CONVERTER, "set_margin_top");
const MARGIN_RIGHT: Rule = length("margin_right", CONVERTER, "set_margin_right");
const MARGIN_BOTTOM: Rule = length("margin_bottom", CONVERTER, "set_margin_bottom");
const MARGIN_LEFT: Rule = length("margin_left", CONVERTER, "set_margin_left");
const HEADER_URL: Rule = http_url("header_url", CONVERTER, "set_header_url");
const FOOTER_URL: Rule = http_url("footer_url", CONVERTER, "set_footer_url");
const JAVASCRIPT_DELAY: Rule = Rule::new(
    "javascript_delay",
    CONVERTER,
    "set_javascript_delay",
    "Must be a positive integer or 0.",
    Check::Range(0, i32::MAX as i64),
);

/// Conversion from a web page, HTML file or HTML string to PDF.
#[derive(Debug)]
pub struct HtmlToPdfClient<T: Transport = UreqTransport> {
    core: ConverterCore<T>,
}

impl HtmlToPdfClient {
    pub fn new(user_name: &str, api_key: &str) -> Self {
        Self::with_connection(Connection::new(ConnectionConfig::new(user_name, api_key)))
    }
}

impl<T: Transport> HtmlToPdfClient<T> {
    pub fn with_connection(connection: Connection<T>) -> Self {
        Self {
            core: ConverterCore::new(connection, "html", "pdf"),
        }
    }

    pub fn connection(&self) -> &Connection<T> {
        &self.core.connection
    }

    pub fn convert_url(&self, url: &str) -> Result<Conversion, ApiError> {
        URL.validate(url)?;
        self.core.post(&self.core.spec_with(|r| {
            r.set("url", url);
        }))
    }

    pub fn convert_url_to_stream<W: Write + ?Sized>(
        &self,
        url: &str,
        sink: &mut W,
    ) -> Result<ResponseMetadata, ApiError> {
        URL.validate(url)?;
        self.core.post_to(
            &self.core.spec_with(|r| {
                r.set("url", url);
            }),
            sink,
        )
    }

    pub fn convert_url_to_file(
        &self,
        url: &str,
        path: impl AsRef<Path>,
    ) -> Result<ResponseMetadata, ApiError> {
        URL.validate(url)?;
        self.core.post_to_file(
            &self.core.spec_with(|r| {
                r.set("url", url);
            }),
            path.as_ref(),
        )
    }

    /// Convert a local HTML file, or an archive (zip, tar.gz, ...) with
    /// HTML and its assets.
    pub fn convert_file(&self, file: impl AsRef<Path>) -> Result<Conversion, ApiError> {
        let file = file.as_ref();
        FILE.validate(&file.to_string_lossy())?;
        self.core.post(&self.core.spec_with(|r| {
            r.add_file("file", file);
        }))
    }

    pub fn convert_file_to_stream<W: Write + ?Sized>(
        &self,
        file: impl AsRef<Path>,
        sink: &mut W,
    ) -> Result<ResponseMetadata, ApiError> {
        let file = file.as_ref();
        FILE.validate(&file.to_string_lossy())?;
        self.core.post_to(
            &self.core.spec_with(|r| {
                r.add_file("file", file);
            }),
            sink,
        )
    }

    pub fn convert_file_to_file(
        &self,
        file: impl AsRef<Path>,
        path: impl AsRef<Path>,
    ) -> Result<ResponseMetadata, ApiError> {
        let file = file.as_ref();
        FILE.validate(&file.to_string_lossy())?;
        self.core.post_to_file(
            &self.core.spec_with(|r| {
                r.add_file("file", file);
            }),
            path.as_ref(),
        )
    }

    pub fn convert_string(&self, text: &str) -> Result<Conversion, ApiError> {
        TEXT.validate(text)?;
        self.core.post(&self.core.spec_with(|r| {
            r.set("text", text);
        }))
    }

    pub fn convert_string_to_stream<W: Write + ?Sized>(
        &self,
        text: &str,
        sink: &mut W,
    ) -> Result<ResponseMetadata, ApiError> {
        TEXT.validate(text)?;
        self.core.post_to(
            &self.core.spec_with(|r| {
                r.set("text", text);
            }),
            sink,
        )
    }

    pub fn convert_string_to_file(
        &self,
        text: &str,
        path: impl AsRef<Path>,
    ) -> Result<ResponseMetadata, ApiError> {
        TEXT.validate(text)?;
        self.core.post_to_file(
            &self.core.spec_with(|r| {
                r.set("text", text);
            }),
            path.as_ref(),
        )
    }

    pub fn set_page_size(&mut self, size: &str) -> Result<&mut Self, ApiError> {
        self.core.set_checked(&PAGE_SIZE, size)?;
        Ok(self)
    }

    pub fn set_orientation(&mut self, orientation: &str) -> Result<&mut Self, ApiError> {
        self.core.set_checked(&ORIENTATION, orientation)?;
        Ok(self)
    }

    pub fn set_margin_top(&mut self, top: &str) -> Result<&mut Self, ApiError> {
        self.core.set_checked(&MARGIN_TOP, top)?;
        Ok(self)
    }

    pub fn set_margin_right(&mut self, right: &str) -> Result<&mut Self, ApiError> {
        self.core.set_checked(&MARGIN_RIGHT, right)?;
        Ok(self)
    }

    pub fn set_margin_bottom(&mut self, bottom: &str) -> Result<&mut Self, ApiError> {
        self.core.set_checked(&MARGIN_BOTTOM, bottom)?;
        Ok(self)
    }

    pub fn set_margin_left(&mut self, left: &str) -> Result<&mut Self, ApiError> {
        self.core.set_checked(&MARGIN_LEFT, left)?;
        Ok(self)
    }

    /// Set all four margins at once.
    pub fn set_page_margins(
        &mut self,
        top: &str,
        right: &str,
        bottom: &str,
        left: &str,
    ) -> Result<&mut Self, ApiError> {
        self.set_margin_top(top)?
            .set_margin_right(right)?
            .set_margin_bottom(bottom)?
            .set_margin_left(left)
    }

    pub fn set_no_margins(&mut self, value: bool) -> &mut Self {
        self.core.request.set_bool("no_margins", value);
        self
    }

    pub fn set_header_url(&mut self, url: &str) -> Result<&mut Self, ApiError> {
        self.core.set_checked(&HEADER_URL, url)?;
        Ok(self)
    }

    pub fn set_header_html(&mut self, html: Option<&str>) -> &mut Self {
        self.core.request.set_opt("header_html", html);
        self
    }

    pub fn set_footer_url(&mut self, url: &str) -> Result<&mut Self, ApiError> {
        self.core.set_checked(&FOOTER_URL, url)?;
        Ok(self)
    }

    pub fn set_footer_html(&mut self, html: Option<&str>) -> &mut Self {
        self.core.request.set_opt("footer_html", html);
        self
    }

    /// Milliseconds to wait for JavaScript to finish before rendering.
    pub fn set_javascript_delay(&mut self, delay: u32) -> Result<&mut Self, ApiError> {
        self.core.set_checked(&JAVASCRIPT_DELAY, &delay.to_string())?;
        Ok(self)
    }

    pub fn set_use_print_media(&mut self, value: bool) -> &mut Self {
        self.core.request.set_bool("use_print_media", value);
        self
    }

    pub fn set_no_background(&mut self, value: bool) -> &mut Self {
        self.core.request.set_bool("no_background", value);
        self
    }

    pub fn set_title(&mut self, title: Option<&str>) -> &mut Self {
        self.core.request.set_opt("title", title);
        self
    }

    /// Ask the server for a debug log; its URL is reported in the metadata.
    pub fn set_debug_log(&mut self, value: bool) -> &mut Self {
        self.core.request.set_bool("debug_log", value);
        self
    }

    /// Tag the conversion for the usage statistics.
    pub fn set_tag(&mut self, tag: Option<&str>) -> &mut Self {
        self.core.request.set_opt("tag", tag);
        self
    }

    /// Any wire option without a dedicated setter. `None` unsets it.
    pub fn set_option(&mut self, name: &str, value: Option<&str>) -> &mut Self {
        self.core.request.set_opt(name, value);
        self
    }

    pub fn set_use_http(&mut self, value: bool) -> &mut Self {
        self.core.connection.config_mut().set_use_http(value);
        self
    }

    pub fn set_user_agent(&mut self, value: &str) -> &mut Self {
        self.core.connection.config_mut().set_user_agent(value);
        self
    }

    pub fn set_proxy(
        &mut self,
        host: &str,
        port: u16,
        user_name: Option<&str>,
        password: Option<&str>,
    ) -> &mut Self {
        self.core
            .connection
            .config_mut()
            .set_proxy(host, port, user_name, password);
        self
    }

    pub fn set_retry_count(&mut self, value: u32) -> &mut Self {
        self.core.connection.config_mut().set_retry_count(value);
        self
    }

    pub fn set_converter_version(&mut self, version: &str) -> Result<&mut Self, ApiError> {
        self.core
            .connection
            .config_mut()
            .set_converter_version_for(version, CONVERTER)?;
        Ok(self)
    }
}
