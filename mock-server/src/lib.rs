//! In-process stand-in for the Pdfcrowd conversion endpoint.
//!
//! Accepts `POST /convert/{version}/` with Basic credentials and a
//! `multipart/form-data` body, records what it received, and answers with a
//! small synthetic document plus the `X-Pdfcrowd-*` metadata headers. A
//! configurable number of leading requests are answered with 502.

use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{debug, info};
use uuid::Uuid;

pub const SUPPORTED_VERSIONS: [&str; 4] = ["24.04", "20.10", "18.10", "latest"];

#[derive(Clone, Debug)]
pub struct MockConfig {
    pub user_name: String,
    pub api_key: String,
    /// Number of requests answered with 502 before normal processing.
    pub fail_with_502: u32,
    pub credits: i64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            user_name: "demo".to_string(),
            api_key: "secret".to_string(),
            fail_with_502: 0,
            credits: 1000,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedFile {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// One successfully parsed conversion request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedRequest {
    pub converter_version: String,
    pub user_agent: Option<String>,
    pub fields: Vec<(String, String)>,
    pub files: Vec<ReceivedFile>,
}

impl ReceivedRequest {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn file(&self, name: &str) -> Option<&ReceivedFile> {
        self.files.iter().find(|f| f.name == name)
    }
}

#[derive(Debug)]
struct Inner {
    attempts: u32,
    remaining_502: u32,
    credits: i64,
    received: Vec<ReceivedRequest>,
}

/// Shared server state; clones observe the same counters.
#[derive(Clone, Debug)]
pub struct MockState {
    config: Arc<MockConfig>,
    inner: Arc<Mutex<Inner>>,
}

impl MockState {
    pub fn new(config: MockConfig) -> Self {
        let inner = Inner {
            attempts: 0,
            remaining_502: config.fail_with_502,
            credits: config.credits,
            received: Vec::new(),
        };
        Self {
            config: Arc::new(config),
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Every POST that reached the handler, including rejected ones.
    pub fn attempts(&self) -> u32 {
        self.lock().attempts
    }

    pub fn received(&self) -> Vec<ReceivedRequest> {
        self.lock().received.clone()
    }

    /// Answer the next `count` requests with 502.
    pub fn fail_next(&self, count: u32) {
        self.lock().remaining_502 = count;
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn expected_authorization(&self) -> String {
        let credentials = format!("{}:{}", self.config.user_name, self.config.api_key);
        format!("Basic {}", STANDARD.encode(credentials))
    }
}

pub fn app(state: MockState) -> Router {
    Router::new()
        .route("/convert/{version}/", post(convert))
        .route("/_mock/requests", get(list_requests))
        .with_state(state)
}

pub async fn run(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock conversion server listening");
    }
    axum::serve(listener, app(state)).await
}

async fn list_requests(State(state): State<MockState>) -> Json<Vec<ReceivedRequest>> {
    Json(state.received())
}

async fn convert(
    State(state): State<MockState>,
    Path(version): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    state.lock().attempts += 1;

    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == state.expected_authorization());
    if !authorized {
        return api_error(
            StatusCode::UNAUTHORIZED,
            "401.0 - Unauthorized. Check your username and API key.",
        );
    }

    {
        let mut inner = state.lock();
        if inner.remaining_502 > 0 {
            inner.remaining_502 -= 1;
            debug!(remaining = inner.remaining_502, "answering with 502");
            return api_error(StatusCode::BAD_GATEWAY, "502.0 - Bad gateway.");
        }
    }

    if !SUPPORTED_VERSIONS.contains(&version.as_str()) {
        return api_error(
            StatusCode::NOT_FOUND,
            &format!("404.0 - Unknown converter version '{version}'."),
        );
    }

    let mut received = ReceivedRequest {
        converter_version: version,
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        ..ReceivedRequest::default()
    };

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let name = field.name().unwrap_or_default().to_string();
                let filename = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = match field.bytes().await {
                    Ok(data) => data.to_vec(),
                    Err(e) => return malformed(&e.to_string()),
                };
                if filename.is_some() {
                    received.files.push(ReceivedFile {
                        name,
                        filename,
                        content_type,
                        data,
                    });
                } else {
                    received
                        .fields
                        .push((name, String::from_utf8_lossy(&data).into_owned()));
                }
            }
            Ok(None) => break,
            Err(e) => return malformed(&e.to_string()),
        }
    }

    let rendered = render(&received);
    state.lock().received.push(received);

    match rendered {
        Ok(output) => success(&state, output),
        Err(body) => api_error(StatusCode::BAD_REQUEST, &body),
    }
}

struct Output {
    bytes: Vec<u8>,
    pages: u32,
    debug_log: bool,
}

/// Produce a synthetic document describing the request.
fn render(request: &ReceivedRequest) -> Result<Output, String> {
    let output_format = request.field("output_format").unwrap_or("pdf");
    let debug_log = request.field("debug_log") == Some("true");

    let inputs: Vec<&ReceivedFile> = request
        .files
        .iter()
        .filter(|f| f.name.starts_with("f_"))
        .collect();
    if !inputs.is_empty() {
        let mut bytes = Vec::new();
        for input in &inputs {
            bytes.extend_from_slice(&input.data);
        }
        return Ok(Output {
            bytes,
            pages: inputs.len() as u32,
            debug_log,
        });
    }

    let source = if let Some(url) = request.field("url") {
        format!("url={url}")
    } else if let Some(text) = request.field("text") {
        format!("text={text}")
    } else if let Some(file) = request.file("file") {
        format!("file={}", String::from_utf8_lossy(&file.data))
    } else {
        return Err(
            "400.303 - No input specified. Documentation link: https://pdfcrowd.com/api/"
                .to_string(),
        );
    };

    Ok(Output {
        bytes: format!("mock {output_format}\n{source}\n").into_bytes(),
        pages: 1,
        debug_log,
    })
}

fn success(state: &MockState, output: Output) -> Response {
    let job_id = Uuid::new_v4().to_string();
    let remaining = {
        let mut inner = state.lock();
        inner.credits -= 1;
        inner.credits
    };

    let mut headers = HeaderMap::new();
    put(&mut headers, "x-pdfcrowd-job-id", &job_id);
    put(&mut headers, "x-pdfcrowd-pages", &output.pages.to_string());
    put(&mut headers, "x-pdfcrowd-total-pages", &output.pages.to_string());
    put(&mut headers, "x-pdfcrowd-output-size", &output.bytes.len().to_string());
    put(&mut headers, "x-pdfcrowd-remaining-credits", &remaining.to_string());
    put(&mut headers, "x-pdfcrowd-consumed-credits", "1");
    if output.debug_log {
        put(
            &mut headers,
            "x-pdfcrowd-debug-log",
            &format!("https://pdfcrowd.com/debug-log/{job_id}/"),
        );
    }

    info!(%job_id, size = output.bytes.len(), "conversion served");
    (StatusCode::OK, headers, output.bytes).into_response()
}

fn put(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(HeaderName::from_static(name), value);
    }
}

fn malformed(detail: &str) -> Response {
    api_error(
        StatusCode::BAD_REQUEST,
        &format!("400.0 - Malformed multipart body: {detail}"),
    )
}

fn api_error(status: StatusCode, body: &str) -> Response {
    (status, body.to_string()).into_response()
}
