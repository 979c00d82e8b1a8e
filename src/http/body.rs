use std::collections::HashMap;

use bytes::Bytes;

use crate::http::buffer::SEPARATOR;
use crate::http::parser::find;
use crate::http::request::{Attachment, ContentKind, FilePart};

const FILENAME: &[u8] = b"filename=\"";
const NAME: &[u8] = b"name=\"";

/// Decodes a complete POST body according to its `Content-Type`
/// classification.
pub fn parse_body(body: &[u8], kind: ContentKind, boundary: Option<&str>) -> Attachment {
    match (kind, boundary) {
        (ContentKind::Multipart, Some(b)) => parse_multipart(body, b),
        _ => parse_urlencoded(body),
    }
}

/// Splits a `multipart/form-data` body on its boundary token.
///
/// A part whose header block carries `filename="..."` is recorded as a
/// file attachment; one carrying only `name="..."` as a form field.
/// Fewer than three boundary occurrences (no full part between two
/// markers) yields an empty attachment rather than an error.
pub fn parse_multipart(body: &[u8], boundary: &str) -> Attachment {
    let mut out = Attachment::default();
    let delim = [b"--", boundary.as_bytes()].concat();
    let mut marks = Vec::new();
    let mut at = 0;
    while let Some(i) = find(&body[at..], &delim) {
        marks.push(at + i);
        at += i + delim.len();
    }
    if marks.len() <= 2 {
        return out;
    }
    for pair in marks.windows(2) {
        // part = bytes between the boundary's trailing CRLF and the next marker
        let part = match body.get(pair[0] + delim.len() + 2..pair[1]) {
            Some(p) => p,
            None => continue,
        };
        let Some(z) = find(part, SEPARATOR) else { continue };
        let head = &part[..z];
        // trailing CRLF before the next boundary belongs to the framing
        let start = z + SEPARATOR.len();
        let end = part.len().saturating_sub(2).max(start);
        let content = &part[start..end];
        if let Some(j) = find(head, FILENAME) {
            let m = &head[j + FILENAME.len()..];
            if let Some(q) = m.iter().position(|&b| b == b'"') {
                out.files.push(FilePart {
                    name: String::from_utf8_lossy(&m[..q]).into_owned(),
                    data: Bytes::copy_from_slice(content),
                });
            }
        } else if let Some(j) = find(head, NAME) {
            let m = &head[j + NAME.len()..];
            if let Some(q) = m.iter().position(|&b| b == b'"') {
                let key = String::from_utf8_lossy(&m[..q]).into_owned();
                let value = String::from_utf8_lossy(content).into_owned();
                out.query.entry(key).or_default().push(value);
            }
        }
    }
    out
}

/// Decodes an `application/x-www-form-urlencoded` body. Repeated keys
/// accumulate in order.
pub fn parse_urlencoded(body: &[u8]) -> Attachment {
    Attachment {
        query: parse_query_bytes(body),
        files: Vec::new(),
    }
}

/// Decodes a query string (`a=1&b=2&a=3`) into a multi-value map.
pub fn parse_query(s: &str) -> HashMap<String, Vec<String>> {
    parse_query_bytes(s.as_bytes())
}

fn parse_query_bytes(raw: &[u8]) -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for (k, v) in url::form_urlencoded::parse(raw) {
        if k.is_empty() {
            continue;
        }
        map.entry(k.into_owned()).or_default().push(v.into_owned());
    }
    map
}
