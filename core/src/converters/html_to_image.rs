//! HTML to image conversion. Output defaults to PNG.

use std::io::Write;
use std::path::Path;

use super::{http_url, non_empty, ConverterCore};
use crate::client::Connection;
use crate::config::ConnectionConfig;
use crate::error::ApiError;
use crate::http::{Transport, UreqTransport};
use crate::types::{Conversion, ResponseMetadata};
use crate::validation::{Check, Rule};

const CONVERTER: &str = "html-to-image";

const URL: Rule = http_url("url", CONVERTER, "convert_url");
const FILE: Rule = non_empty("file", CONVERTER, "convert_file");
const TEXT: Rule = non_empty("text", CONVERTER, "convert_string");
const OUTPUT_FORMAT: Rule = Rule::new(
    "output_format",
    CONVERTER,
    "set_output_format",
    "Allowed values are png, jpg, gif, tiff, bmp, ico, ppm, pgm, pbm, pnm, psb, pct, ras, tga, sgi, sun, webp.",
    Check::Pattern("(png|jpg|gif|tiff|bmp|ico|ppm|pgm|pbm|pnm|psb|pct|ras|tga|sgi|sun|webp)"),
);
const SCREENSHOT_WIDTH: Rule = Rule::new(
    "screenshot_width",
    CONVERTER,
    "set_screenshot_width",
    "The value must be in the range 96-65000.",
    Check::Range(96, 65000),
);
const SCREENSHOT_HEIGHT: Rule = Rule::new(
    "screenshot_height",
    CONVERTER,
    "set_screenshot_height",
    "Must be a positive integer.",
    Check::Range(1, i32::MAX as i64),
);
const SCALE_FACTOR: Rule = Rule::new(
    "scale_factor",
    CONVERTER,
    "set_scale_factor",
    "Must be a positive integer.",
    Check::Range(1, i32::MAX as i64),
);

/// Conversion from a web page, HTML file or HTML string to an image.
#[derive(Debug)]
pub struct HtmlToImageClient<T: Transport = UreqTransport> {
    core: ConverterCore<T>,
}

impl HtmlToImageClient {
    pub fn new(user_name: &str, api_key: &str) -> Self {
        Self::with_connection(Connection::new(ConnectionConfig::new(user_name, api_key)))
    }
}

impl<T: Transport> HtmlToImageClient<T> {
    /// Output format starts as `png`.
    pub fn with_connection(connection: Connection<T>) -> Self {
        Self {
            core: ConverterCore::new(connection, "html", "png"),
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

    pub fn set_output_format(&mut self, format: &str) -> Result<&mut Self, ApiError> {
        self.core.set_checked(&OUTPUT_FORMAT, format)?;
        Ok(self)
    }

    /// Browser viewport width in pixels.
    pub fn set_screenshot_width(&mut self, width: u32) -> Result<&mut Self, ApiError> {
        self.core.set_checked(&SCREENSHOT_WIDTH, &width.to_string())?;
        Ok(self)
    }

    /// Height of the captured area; the full page when unset.
    pub fn set_screenshot_height(&mut self, height: u32) -> Result<&mut Self, ApiError> {
        self.core.set_checked(&SCREENSHOT_HEIGHT, &height.to_string())?;
        Ok(self)
    }

    /// Scale as a percentage of the rendered size.
    pub fn set_scale_factor(&mut self, factor: u32) -> Result<&mut Self, ApiError> {
        self.core.set_checked(&SCALE_FACTOR, &factor.to_string())?;
        Ok(self)
    }

    pub fn set_no_background(&mut self, value: bool) -> &mut Self {
        self.core.request.set_bool("no_background", value);
        self
    }

    pub fn set_use_print_media(&mut self, value: bool) -> &mut Self {
        self.core.request.set_bool("use_print_media", value);
        self
    }

    pub fn set_debug_log(&mut self, value: bool) -> &mut Self {
        self.core.request.set_bool("debug_log", value);
        self
    }

    pub fn set_tag(&mut self, tag: Option<&str>) -> &mut Self {
        self.core.request.set_opt("tag", tag);
        self
    }

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
