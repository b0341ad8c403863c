//! PDF to PDF operations over numbered `f_N` inputs.

use std::io::Write;
use std::path::Path;

use super::{non_empty, ConverterCore};
use crate::client::Connection;
use crate::config::ConnectionConfig;
use crate::error::ApiError;
use crate::http::{Transport, UreqTransport};
use crate::types::{Conversion, ResponseMetadata};
use crate::validation::{create_invalid_value_message, Check, Rule};

const CONVERTER: &str = "pdf-to-pdf";

const ACTION: Rule = Rule::new(
    "action",
    CONVERTER,
    "set_action",
    "Allowed values are join, shuffle, extract, delete, move.",
    Check::Pattern("(join|shuffle|extract|delete|move)"),
);
const INPUT_FILE: Rule = non_empty("f_N", CONVERTER, "add_pdf_file");
const PAGE_RANGE: Rule = Rule::new(
    "page_range",
    CONVERTER,
    "set_page_range",
    "A comma separated list of page numbers or ranges. Special strings may be used, such as 'odd', 'even' and 'last'.",
    Check::Pattern(r"\s*(\d+|last|odd|even)(\s*-\s*(\d+|last))?\s*(,\s*(\d+|last|odd|even)(\s*-\s*(\d+|last))?\s*)*"),
);

/// Operations on PDF documents: joining, shuffling, extracting pages.
///
/// Inputs are sent as `f_1`, `f_2`, ... in the order they are added.
#[derive(Debug)]
pub struct PdfToPdfClient<T: Transport = UreqTransport> {
    core: ConverterCore<T>,
}

impl PdfToPdfClient {
    pub fn new(user_name: &str, api_key: &str) -> Self {
        Self::with_connection(Connection::new(ConnectionConfig::new(user_name, api_key)))
    }
}

impl<T: Transport> PdfToPdfClient<T> {
    pub fn with_connection(connection: Connection<T>) -> Self {
        Self {
            core: ConverterCore::new(connection, "pdf", "pdf"),
        }
    }

    pub fn connection(&self) -> &Connection<T> {
        &self.core.connection
    }

    pub fn set_action(&mut self, action: &str) -> Result<&mut Self, ApiError> {
        self.core.set_checked(&ACTION, action)?;
        Ok(self)
    }

    pub fn add_pdf_file(&mut self, file: impl AsRef<Path>) -> Result<&mut Self, ApiError> {
        let file = file.as_ref();
        INPUT_FILE.validate(&file.to_string_lossy())?;
        self.core.request.add_pdf_file(file);
        Ok(self)
    }

    /// Add an in-memory PDF. The data must start with the `%PDF` signature.
    pub fn add_pdf_raw_data(&mut self, data: impl Into<Vec<u8>>) -> Result<&mut Self, ApiError> {
        let data = data.into();
        if !data.starts_with(b"%PDF") {
            return Err(ApiError::validation(&create_invalid_value_message(
                "raw PDF data",
                "f_N",
                CONVERTER,
                "Input contains no data or is not a PDF.",
                "add_pdf_raw_data",
            )));
        }
        self.core.request.add_pdf_raw(data);
        Ok(self)
    }

    /// Number of inputs added so far.
    pub fn input_count(&self) -> usize {
        self.core.request.pdf_count()
    }

    pub fn convert(&self) -> Result<Conversion, ApiError> {
        self.core.post(&self.core.request.build())
    }

    pub fn convert_to_stream<W: Write + ?Sized>(
        &self,
        sink: &mut W,
    ) -> Result<ResponseMetadata, ApiError> {
        self.core.post_to(&self.core.request.build(), sink)
    }

    pub fn convert_to_file(&self, path: impl AsRef<Path>) -> Result<ResponseMetadata, ApiError> {
        self.core
            .post_to_file(&self.core.request.build(), path.as_ref())
    }

    /// Pages the action applies to, e.g. `1-3,last`.
    pub fn set_page_range(&mut self, pages: &str) -> Result<&mut Self, ApiError> {
        self.core.set_checked(&PAGE_RANGE, pages)?;
        Ok(self)
    }

    pub fn set_title(&mut self, title: Option<&str>) -> &mut Self {
        self.core.request.set_opt("title", title);
        self
    }

    pub fn set_author(&mut self, author: Option<&str>) -> &mut Self {
        self.core.request.set_opt("author", author);
        self
    }

    pub fn set_linearize(&mut self, value: bool) -> &mut Self {
        self.core.request.set_bool("linearize", value);
        self
    }

    pub fn set_encrypt(&mut self, value: bool) -> &mut Self {
        self.core.request.set_bool("encrypt", value);
        self
    }

    pub fn set_user_password(&mut self, password: Option<&str>) -> &mut Self {
        self.core.request.set_opt("user_password", password);
        self
    }

    pub fn set_owner_password(&mut self, password: Option<&str>) -> &mut Self {
        self.core.request.set_opt("owner_password", password);
        self
    }

    pub fn set_debug_log(&mut self, value: bool) -> &mut Self {
        self.core.request.set_bool("debug_log", value);
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
