//! Encoded bodies parse back into exactly the parts that went in.

use pdfcrowd_core::multipart::{encode, MULTIPART_BOUNDARY};
use pdfcrowd_core::RequestBuilder;
use proptest::prelude::*;

#[derive(Debug, PartialEq, Eq)]
struct Part {
    name: String,
    filename: Option<String>,
    data: Vec<u8>,
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Minimal multipart parser for the framing produced by `encode`.
fn parse(body: &[u8]) -> Vec<Part> {
    let delimiter = format!("--{MULTIPART_BOUNDARY}");
    let terminator = format!("{delimiter}--\r\n");
    assert!(body.ends_with(terminator.as_bytes()), "missing terminator");
    let mut rest = &body[..body.len() - terminator.len()];

    let open = format!("{delimiter}\r\n");
    let mut parts = Vec::new();
    while !rest.is_empty() {
        assert!(rest.starts_with(open.as_bytes()), "part does not open with boundary");
        rest = &rest[open.len()..];

        let headers_end = find(rest, b"\r\n\r\n").expect("header block");
        let headers = std::str::from_utf8(&rest[..headers_end]).unwrap();
        rest = &rest[headers_end + 4..];

        let next = find(rest, format!("\r\n{delimiter}").as_bytes()).expect("part end");
        let data = rest[..next].to_vec();
        rest = &rest[next + 2..];

        let disposition = headers.lines().next().unwrap();
        let name = between(disposition, "name=\"", "\"").unwrap().to_string();
        let filename = between(disposition, "filename=\"", "\"").map(str::to_string);
        parts.push(Part {
            name,
            filename,
            data,
        });
    }
    parts
}

fn between<'a>(s: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = s.find(start)? + start.len();
    let len = s[from..].find(end)?;
    Some(&s[from..from + len])
}

#[test]
fn file_contents_are_streamed_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.bin");
    let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    std::fs::write(&path, &content).unwrap();

    let mut b = RequestBuilder::new();
    b.set("input_format", "pdf").add_file("file", &path);
    let parts = parse(&encode(&b.build()).unwrap());

    assert_eq!(parts.len(), 2);
    assert_eq!(parts[1].name, "file");
    assert_eq!(parts[1].filename.as_deref(), Some(path.to_str().unwrap()));
    assert_eq!(parts[1].data, content);
}

proptest! {
    #[test]
    fn encoded_parts_round_trip(
        fields in prop::collection::vec(("[a-z_]{1,12}", "[ -~\r\n]{0,40}"), 0..8),
        blobs in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..128), 0..4),
    ) {
        let mut b = RequestBuilder::new();
        for (name, value) in &fields {
            b.set(name, value.as_str());
        }
        for blob in &blobs {
            b.add_pdf_raw(blob.clone());
        }
        let spec = b.build();

        let parts = parse(&encode(&spec).unwrap());
        prop_assert_eq!(parts.len(), spec.fields().len() + spec.raw_data().len());

        for ((name, value), part) in spec.fields().iter().zip(&parts) {
            prop_assert_eq!(&part.name, name);
            prop_assert_eq!(&part.filename, &None);
            prop_assert_eq!(&part.data, &value.as_bytes().to_vec());
        }
        for ((name, data), part) in spec.raw_data().iter().zip(&parts[spec.fields().len()..]) {
            prop_assert_eq!(&part.name, name);
            prop_assert_eq!(part.filename.as_deref(), Some(name.as_str()));
            prop_assert_eq!(&part.data, data);
        }
    }

    #[test]
    fn unset_and_false_never_reach_the_body(
        name in "[a-z]{1,10}",
        value in "[a-z0-9]{1,10}",
    ) {
        let mut b = RequestBuilder::new();
        b.set(&name, value.as_str());
        b.unset(&name);
        b.set_bool("flag", true);
        b.set_bool("flag", false);
        let body = encode(&b.build()).unwrap();
        let text = String::from_utf8(body).unwrap();
        let name_needle = format!("name=\"{}\"", name);
        prop_assert!(!text.contains(&name_needle));
        prop_assert!(!text.contains("name=\"flag\""));
    }
}
