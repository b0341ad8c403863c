//! `multipart/form-data` encoding of a `RequestSpec`.
//!
//! The boundary token is fixed; option values and file contents must not
//! contain it.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::Path;

use crate::error::ApiError;
use crate::types::RequestSpec;

pub const MULTIPART_BOUNDARY: &str = "----------ThIs_Is_tHe_bOUnDary_$";

const CRLF: &[u8] = b"\r\n";
const CHUNK_SIZE: usize = 64 * 1024;

/// Value of the `Content-Type` header matching [`encode`].
pub fn content_type() -> String {
    format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}")
}

/// Serialize fields, file parts and raw-data parts, in that order.
pub fn encode(spec: &RequestSpec) -> Result<Vec<u8>, ApiError> {
    let mut body = Vec::new();

    for (name, value) in spec.fields() {
        open_part(&mut body);
        body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{name}\"").as_bytes());
        body.extend_from_slice(CRLF);
        body.extend_from_slice(CRLF);
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(CRLF);
    }

    for (name, path) in spec.files() {
        let filename = path.to_string_lossy();
        open_file_part(&mut body, name, &filename);
        copy_file(path, &mut body).map_err(|e| ApiError::encoding(path, e))?;
        body.extend_from_slice(CRLF);
    }

    for (name, data) in spec.raw_data() {
        open_file_part(&mut body, name, name);
        body.extend_from_slice(data);
        body.extend_from_slice(CRLF);
    }

    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--").as_bytes());
    body.extend_from_slice(CRLF);
    Ok(body)
}

fn open_part(body: &mut Vec<u8>) {
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}").as_bytes());
    body.extend_from_slice(CRLF);
}

fn open_file_part(body: &mut Vec<u8>, name: &str, filename: &str) {
    open_part(body);
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"").as_bytes(),
    );
    body.extend_from_slice(CRLF);
    body.extend_from_slice(b"Content-Type: application/octet-stream");
    body.extend_from_slice(CRLF);
    body.extend_from_slice(CRLF);
}

fn copy_file(path: &Path, out: &mut impl Write) -> io::Result<u64> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(CHUNK_SIZE, file);
    io::copy(&mut reader, out)
}
