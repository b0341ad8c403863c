//! Request and response DTOs for the conversion API.
//!
//! # Design
//! `RequestBuilder` is the owned accumulator converters write options into.
//! `build()` snapshots it into a read-only `RequestSpec`, which is all the
//! transport core ever sees. An unset option is absent from the `RequestSpec`; there
//! is no "empty string means unset".

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Remaining-credit value reported when the server did not send one.
pub const UNKNOWN_CREDITS: i64 = 999_999;

/// Everything sent in one conversion request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestSpec {
    fields: Vec<(String, String)>,
    files: Vec<(String, PathBuf)>,
    raw_data: Vec<(String, Vec<u8>)>,
}

impl RequestSpec {
    /// Text fields in insertion order.
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// File parts read from the local filesystem when encoding.
    pub fn files(&self) -> &[(String, PathBuf)] {
        &self.files
    }

    /// File parts whose content is already in memory.
    pub fn raw_data(&self) -> &[(String, Vec<u8>)] {
        &self.raw_data
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Owned accumulator for request options.
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    spec: RequestSpec,
    pdf_count: usize,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a text field, replacing any previous value in place.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        match self.spec.fields.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value,
            None => self.spec.fields.push((name.to_string(), value)),
        }
        self
    }

    /// `None` removes the field.
    pub fn set_opt(&mut self, name: &str, value: Option<impl Into<String>>) -> &mut Self {
        match value {
            Some(value) => self.set(name, value),
            None => self.unset(name),
        }
    }

    /// `true` sends the literal `"true"`; `false` omits the key.
    pub fn set_bool(&mut self, name: &str, value: bool) -> &mut Self {
        if value {
            self.set(name, "true")
        } else {
            self.unset(name)
        }
    }

    pub fn unset(&mut self, name: &str) -> &mut Self {
        self.spec.fields.retain(|(key, _)| key != name);
        self
    }

    pub fn add_file(&mut self, name: &str, path: impl AsRef<Path>) -> &mut Self {
        self.spec.files.retain(|(key, _)| key != name);
        self.spec
            .files
            .push((name.to_string(), path.as_ref().to_path_buf()));
        self
    }

    pub fn add_raw(&mut self, name: &str, data: impl Into<Vec<u8>>) -> &mut Self {
        self.spec.raw_data.retain(|(key, _)| key != name);
        self.spec.raw_data.push((name.to_string(), data.into()));
        self
    }

    /// Add a PDF input as the next `f_N` file part.
    pub fn add_pdf_file(&mut self, path: impl AsRef<Path>) -> &mut Self {
        let name = self.next_pdf_name();
        self.add_file(&name, path)
    }

    /// Add in-memory PDF bytes as the next `f_N` file part.
    pub fn add_pdf_raw(&mut self, data: impl Into<Vec<u8>>) -> &mut Self {
        let name = self.next_pdf_name();
        self.add_raw(&name, data)
    }

    /// Number of `f_N` inputs added so far.
    pub fn pdf_count(&self) -> usize {
        self.pdf_count
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.spec.field(name)
    }

    /// Snapshot the accumulated options.
    pub fn build(&self) -> RequestSpec {
        self.spec.clone()
    }

    fn next_pdf_name(&mut self) -> String {
        self.pdf_count += 1;
        format!("f_{}", self.pdf_count)
    }
}

/// Data the server reports in response headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub debug_log_url: Option<String>,
    pub remaining_credit_count: i64,
    pub consumed_credit_count: i64,
    pub job_id: String,
    pub page_count: u32,
    pub total_page_count: u32,
    pub output_size: u64,
    /// Converter version the request was sent to.
    pub converter_version: String,
    /// 502 retries performed before the successful attempt.
    pub retries: u32,
}

impl Default for ResponseMetadata {
    fn default() -> Self {
        Self {
            debug_log_url: None,
            remaining_credit_count: UNKNOWN_CREDITS,
            consumed_credit_count: 0,
            job_id: String::new(),
            page_count: 0,
            total_page_count: 0,
            output_size: 0,
            converter_version: String::new(),
            retries: 0,
        }
    }
}

/// Buffered output of a conversion together with its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub bytes: Vec<u8>,
    pub metadata: ResponseMetadata,
}
