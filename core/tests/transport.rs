//! Connection behaviour against a scripted transport.
//!
//! # Design
//! `ScriptedTransport` replays canned outcomes and records every request it
//! is asked to execute, so tests can count network calls and inspect the
//! exact headers and body the connection produced.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{Cursor, Seek, SeekFrom, Write};
use std::time::{Duration, Instant};

use pdfcrowd_core::multipart::MULTIPART_BOUNDARY;
use pdfcrowd_core::{
    ApiError, Connection, ConnectionConfig, ErrorKind, HttpRequest, HttpResponse, RequestBuilder,
    RequestSpec, Transport, TransportFailure,
};

type Outcome = Result<(u16, Vec<(String, String)>, Vec<u8>), TransportFailure>;

#[derive(Default)]
struct ScriptedTransport {
    script: RefCell<VecDeque<Outcome>>,
    requests: RefCell<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    fn new(outcomes: Vec<Outcome>) -> Self {
        Self {
            script: RefCell::new(outcomes.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl Transport for ScriptedTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure> {
        self.requests.borrow_mut().push(request);
        match self.script.borrow_mut().pop_front() {
            Some(Ok((status, headers, body))) => Ok(HttpResponse::from_bytes(status, headers, body)),
            Some(Err(failure)) => Err(failure),
            None => panic!("transport called more often than scripted"),
        }
    }
}

fn ok(body: &str) -> Outcome {
    Ok((200, Vec::new(), body.as_bytes().to_vec()))
}

fn ok_with(headers: &[(&str, &str)], body: &str) -> Outcome {
    Ok((
        200,
        headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        body.as_bytes().to_vec(),
    ))
}

fn status(code: u16, body: &str) -> Outcome {
    Ok((code, Vec::new(), body.as_bytes().to_vec()))
}

fn config() -> ConnectionConfig {
    let mut cfg = ConnectionConfig::new("demo", "secret");
    cfg.set_retry_unit(Duration::ZERO);
    cfg
}

fn connection(cfg: ConnectionConfig, outcomes: Vec<Outcome>) -> Connection<ScriptedTransport> {
    Connection::with_transport(cfg, ScriptedTransport::new(outcomes))
}

fn url_spec() -> RequestSpec {
    let mut b = RequestBuilder::new();
    b.set("input_format", "html")
        .set("output_format", "pdf")
        .set("url", "https://example.com");
    b.build()
}

// ---------------------------------------------------------------------------
// Request shape
// ---------------------------------------------------------------------------

#[test]
fn request_carries_auth_agent_and_multipart_body() {
    let conn = connection(config(), vec![ok("%PDF")]);
    conn.post(&url_spec()).unwrap();

    let requests = conn.transport().requests.borrow();
    let req = &requests[0];
    assert_eq!(req.url, "https://api.pdfcrowd.com:443/convert/24.04/");
    assert_eq!(req.header("authorization"), Some("Basic ZGVtbzpzZWNyZXQ="));
    assert!(req.header("user-agent").unwrap().starts_with("pdfcrowd_rust_client/"));
    assert_eq!(
        req.header("content-type").unwrap(),
        format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}")
    );
    let body = String::from_utf8(req.body.clone()).unwrap();
    assert!(body.contains("name=\"url\"\r\n\r\nhttps://example.com\r\n"));
    assert!(body.ends_with(&format!("--{MULTIPART_BOUNDARY}--\r\n")));
    assert!(req.proxy.is_none());
}

#[test]
fn converter_version_selects_path() {
    let mut cfg = config();
    cfg.set_converter_version("18.10").unwrap();
    let conn = connection(cfg, vec![ok("")]);
    let result = conn.post(&url_spec()).unwrap();
    assert_eq!(result.metadata.converter_version, "18.10");
    assert!(conn.transport().requests.borrow()[0].url.ends_with("/convert/18.10/"));
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[test]
fn http_with_proxy_fails_without_network_call() {
    let mut cfg = config();
    cfg.set_use_http(true)
        .set_proxy("proxy.local", 3128, None, None);
    let conn = connection(cfg, vec![]);

    let err = conn.post(&url_spec()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(err.status_code(), 0);
    assert_eq!(conn.transport().calls(), 0);
}

#[test]
fn https_with_proxy_routes_through_proxy() {
    let mut cfg = config();
    cfg.set_proxy("proxy.local", 3128, Some("bob"), Some("pw"));
    let conn = connection(cfg, vec![ok("%PDF")]);

    conn.post(&url_spec()).unwrap();
    let requests = conn.transport().requests.borrow();
    let proxy = requests[0].proxy.as_ref().unwrap();
    assert_eq!(proxy.host, "proxy.local");
    assert_eq!(proxy.port, 3128);
    assert_eq!(proxy.user_name.as_deref(), Some("bob"));
}

#[test]
fn unreadable_file_fails_before_sending() {
    let mut b = RequestBuilder::new();
    b.add_file("file", "/nonexistent/input.html");
    let conn = connection(config(), vec![]);

    let err = conn.post(&b.build()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Encoding);
    assert_eq!(conn.transport().calls(), 0);
}

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

#[test]
fn two_502s_then_success_with_two_retries() {
    let mut cfg = config();
    cfg.set_retry_count(2);
    let conn = connection(
        cfg,
        vec![
            status(502, "502.0 - Bad gateway."),
            status(502, "502.0 - Bad gateway."),
            ok_with(&[("X-Pdfcrowd-Job-Id", "final")], "%PDF-final"),
        ],
    );

    let result = conn.post(&url_spec()).unwrap();
    assert_eq!(conn.transport().calls(), 3);
    assert_eq!(result.bytes, b"%PDF-final");
    assert_eq!(result.metadata.job_id, "final");
    assert_eq!(result.metadata.retries, 2);
}

#[test]
fn two_502s_with_one_retry_surfaces_502() {
    let mut cfg = config();
    cfg.set_retry_count(1);
    let conn = connection(
        cfg,
        vec![
            status(502, "502.0 - Bad gateway."),
            status(502, "502.0 - Bad gateway."),
            ok("%PDF"),
        ],
    );

    let err = conn.post(&url_spec()).unwrap_err();
    assert_eq!(conn.transport().calls(), 2);
    assert_eq!(err.status_code(), 502);
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert_eq!(err.message(), "Bad gateway.");
}

#[test]
fn zero_retries_surfaces_first_502() {
    let mut cfg = config();
    cfg.set_retry_count(0);
    let conn = connection(cfg, vec![status(502, "Bad Gateway")]);

    let err = conn.post(&url_spec()).unwrap_err();
    assert_eq!(conn.transport().calls(), 1);
    assert_eq!(err.to_string(), "502 - Bad Gateway");
}

#[test]
fn other_errors_are_not_retried() {
    let mut cfg = config();
    cfg.set_retry_count(5);
    let conn = connection(
        cfg,
        vec![status(
            503,
            "503.0 - Service temporarily unavailable. Documentation link: https://pdfcrowd.com/api/status-codes/",
        )],
    );

    let err = conn.post(&url_spec()).unwrap_err();
    assert_eq!(conn.transport().calls(), 1);
    assert_eq!(err.status_code(), 503);
    assert_eq!(err.reason_code(), 0);
    assert_eq!(err.doc_link(), "https://pdfcrowd.com/api/status-codes/");
}

#[test]
fn http_502_is_retried_whatever_the_body_says() {
    let mut cfg = config();
    cfg.set_retry_count(1);
    let conn = connection(
        cfg,
        vec![status(502, "400.311 - upstream said no"), ok("%PDF")],
    );

    let result = conn.post(&url_spec()).unwrap();
    assert_eq!(conn.transport().calls(), 2);
    assert_eq!(result.bytes, b"%PDF");
    assert_eq!(result.metadata.retries, 1);
}

#[test]
fn body_code_502_on_other_status_is_not_retried() {
    let mut cfg = config();
    cfg.set_retry_count(1);
    let conn = connection(
        cfg,
        vec![status(400, "502.0 - body claims gateway"), ok("%PDF")],
    );

    let err = conn.post(&url_spec()).unwrap_err();
    assert_eq!(conn.transport().calls(), 1);
    assert_eq!(err.status_code(), 502);
    assert_eq!(err.message(), "body claims gateway");
}

#[test]
fn retry_delay_grows_linearly() {
    let unit = Duration::from_millis(25);
    let mut cfg = config();
    cfg.set_retry_count(2).set_retry_unit(unit);
    let conn = connection(
        cfg,
        vec![
            status(502, "502.0 - Bad gateway."),
            status(502, "502.0 - Bad gateway."),
            ok("%PDF"),
        ],
    );

    let started = Instant::now();
    conn.post(&url_spec()).unwrap();
    // unit after the first 502, 2 * unit after the second
    assert!(started.elapsed() >= unit * 3, "elapsed {:?}", started.elapsed());
    assert_eq!(conn.transport().calls(), 3);
}

#[test]
fn no_delay_without_a_502() {
    let mut cfg = config();
    cfg.set_retry_unit(Duration::from_secs(5));
    let conn = connection(cfg, vec![status(400, "400.0 - Bad request.")]);

    let started = Instant::now();
    conn.post(&url_spec()).unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn forced_502_is_synthetic_until_retries_run_out() {
    let mut cfg = config();
    cfg.set_retry_count(2).set_force_502(true);
    let conn = connection(cfg, vec![ok("%PDF")]);

    let result = conn.post(&url_spec()).unwrap();
    assert_eq!(conn.transport().calls(), 1);
    assert_eq!(result.metadata.retries, 2);
}

#[test]
fn forced_502_without_retries_goes_straight_to_network() {
    let mut cfg = config();
    cfg.set_retry_count(0).set_force_502(true);
    let conn = connection(cfg, vec![ok("%PDF")]);

    conn.post(&url_spec()).unwrap();
    assert_eq!(conn.transport().calls(), 1);
}

// ---------------------------------------------------------------------------
// Transport failures
// ---------------------------------------------------------------------------

#[test]
fn tls_failure_maps_to_481() {
    let conn = connection(
        config(),
        vec![Err(TransportFailure::Tls("invalid peer certificate: UnknownIssuer".to_string()))],
    );

    let err = conn.post(&url_spec()).unwrap_err();
    assert_eq!(err.status_code(), 481);
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.message().contains("UnknownIssuer"));
    assert!(err.message().contains("set_use_http(true)"));
    assert_eq!(conn.transport().calls(), 1);
}

#[test]
fn connection_failure_has_no_status() {
    let conn = connection(
        config(),
        vec![Err(TransportFailure::Connection("Connection refused".to_string()))],
    );

    let err = conn.post(&url_spec()).unwrap_err();
    assert_eq!(err.status_code(), 0);
    assert_eq!(err.reason_code(), -1);
    assert_eq!(err.to_string(), "Connection refused");
}

// ---------------------------------------------------------------------------
// Metadata and output
// ---------------------------------------------------------------------------

#[test]
fn metadata_is_fresh_for_every_call() {
    let conn = connection(
        config(),
        vec![
            ok_with(
                &[
                    ("X-Pdfcrowd-Debug-Log", "https://pdfcrowd.com/log/1"),
                    ("X-Pdfcrowd-Remaining-Credits", "42"),
                    ("X-Pdfcrowd-Job-Id", "first"),
                    ("X-Pdfcrowd-Pages", "7"),
                    ("X-Pdfcrowd-Output-Size", "4"),
                ],
                "%PDF",
            ),
            ok(""),
        ],
    );

    let first = conn.post(&url_spec()).unwrap().metadata;
    assert_eq!(first.job_id, "first");
    assert_eq!(first.remaining_credit_count, 42);

    let second = conn.post(&url_spec()).unwrap().metadata;
    assert_eq!(second.remaining_credit_count, 999_999);
    assert!(second.job_id.is_empty());
    assert_eq!(second.page_count, 0);
    assert_eq!(second.output_size, 0);
    assert!(second.debug_log_url.is_none());
}

#[test]
fn metadata_comes_from_the_successful_attempt() {
    let mut cfg = config();
    cfg.set_retry_count(1);
    let conn = connection(
        cfg,
        vec![
            Ok((
                502,
                vec![("X-Pdfcrowd-Job-Id".to_string(), "failed".to_string())],
                b"502.0 - Bad gateway.".to_vec(),
            )),
            ok_with(&[("X-Pdfcrowd-Pages", "2")], "%PDF"),
        ],
    );

    let meta = conn.post(&url_spec()).unwrap().metadata;
    assert!(meta.job_id.is_empty());
    assert_eq!(meta.page_count, 2);
}

#[test]
fn error_leaves_sink_untouched() {
    let conn = connection(config(), vec![status(400, "400.303 - No input specified.")]);
    let mut sink = Vec::new();

    let err: ApiError = conn.post_to(&url_spec(), &mut sink).unwrap_err();
    assert_eq!(err.reason_code(), 303);
    assert!(sink.is_empty());
}

#[test]
fn seekable_sink_is_rewound() {
    let conn = connection(config(), vec![ok("%PDF-1.7")]);
    let mut sink = Cursor::new(Vec::new());
    sink.write_all(b"old").unwrap();
    sink.seek(SeekFrom::Start(0)).unwrap();

    conn.post_to_seekable(&url_spec(), &mut sink).unwrap();
    assert_eq!(sink.position(), 0);
    assert_eq!(sink.get_ref(), b"%PDF-1.7");
}

#[test]
fn config_changes_apply_to_next_call() {
    let mut conn = connection(config(), vec![ok(""), ok("")]);
    conn.post(&url_spec()).unwrap();
    conn.config_mut().set_use_http(true);
    conn.post(&url_spec()).unwrap();

    let requests = conn.transport().requests.borrow();
    assert!(requests[0].url.starts_with("https://"));
    assert!(requests[1].url.starts_with("http://api.pdfcrowd.com:80/"));
}
