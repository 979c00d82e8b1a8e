use crate::http::request::{ContentKind, HeaderView, Protocol};

const HOST: &[u8] = b"Host: ";
const CONTENT_LENGTH: &[u8] = b"Content-Length: ";
const CONNECTION: &[u8] = b"Connection: ";
const CONTENT_TYPE: &[u8] = b"Content-Type: ";
const RANGE: &[u8] = b"Range: bytes=";
const IF_NONE_MATCH: &[u8] = b"If-None-Match: ";
const IF_MODIFIED_SINCE: &[u8] = b"If-Modified-Since: ";

#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    /// Missing method, URI or protocol token.
    BadRequestLine,
}

/// Decodes the request line into `(method token, uri, protocol)`.
///
/// The line must end in exactly `HTTP/1.0` or `HTTP/1.1`; any other
/// trailing token is malformed. Method and URI split on the first
/// space. The method token is returned raw; resolving it to a known
/// method (or 405) is the engine's call.
pub fn parse_request_line(line: &[u8]) -> Result<(String, String, Protocol), ParseError> {
    let tail = if line.len() >= 9 { &line[line.len() - 9..] } else { line };
    let protocol = match std::str::from_utf8(tail).map(str::trim) {
        Ok("HTTP/1.0") => Protocol::Http10,
        Ok("HTTP/1.1") => Protocol::Http11,
        _ => return Err(ParseError::BadRequestLine),
    };
    let space = line
        .iter()
        .position(|&b| b == b' ')
        .ok_or(ParseError::BadRequestLine)?;
    let method = String::from_utf8_lossy(&line[..space]).into_owned();
    let uri = line
        .get(space + 1..line.len() - 9)
        .map(|u| String::from_utf8_lossy(u).trim().to_string())
        .unwrap_or_default();
    if method.is_empty() || uri.is_empty() {
        return Err(ParseError::BadRequestLine);
    }
    Ok((method, uri, protocol))
}

/// Scans the raw header lines (everything between the request line and
/// the header/body separator) into a typed [`HeaderView`].
///
/// Each recognized header is matched by case-sensitive literal prefix;
/// the first occurrence wins and later duplicates are ignored. A zero
/// length input (bare HTTP/1.0 request line) yields an empty view.
pub fn parse_headers(raw: &[u8]) -> HeaderView {
    let mut view = HeaderView::default();
    if raw.is_empty() {
        return view;
    }
    for line in raw.split(|&b| b == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() {
            continue;
        }
        view.list.push(String::from_utf8_lossy(line).into_owned());
        if view.hostname.is_none() && line.starts_with(HOST) {
            let v = &line[HOST.len()..];
            match v.iter().position(|&b| b == b':') {
                Some(j) => {
                    view.hostname = Some(lossy_trim(&v[..j]).to_lowercase());
                    view.port = lossy_trim(&v[j + 1..]).parse().ok();
                }
                None => view.hostname = Some(lossy_trim(v).to_lowercase()),
            }
        } else if view.length.is_none() && line.starts_with(CONTENT_LENGTH) {
            view.length = lossy_trim(&line[CONTENT_LENGTH.len()..]).parse().ok();
        } else if view.connection.is_none() && line.starts_with(CONNECTION) {
            view.connection = Some(lossy_trim(&line[CONNECTION.len()..]).to_lowercase());
        } else if view.kind.is_none() && line.starts_with(CONTENT_TYPE) {
            let v = &line[CONTENT_TYPE.len()..];
            if find(v, b"urlencoded").is_some() {
                view.kind = Some(ContentKind::UrlEncoded);
            } else if find(v, b"multipart").is_some() {
                view.kind = Some(ContentKind::Multipart);
                if let Some(j) = find(v, b"boundary=") {
                    let b = &v[j + b"boundary=".len()..];
                    let end = b.iter().position(|&c| c == b';').unwrap_or(b.len());
                    view.boundary = Some(lossy_trim(&b[..end]).to_string());
                }
            } else {
                view.kind = Some(ContentKind::Other);
            }
        } else if view.etag.is_none() && line.starts_with(IF_NONE_MATCH) {
            view.etag = Some(lossy_trim(&line[IF_NONE_MATCH.len()..]).to_string());
        } else if view.modified.is_none() && line.starts_with(IF_MODIFIED_SINCE) {
            view.modified = Some(lossy_trim(&line[IF_MODIFIED_SINCE.len()..]).to_string());
        } else if view.range.is_none() && line.starts_with(RANGE) {
            view.range = Some(lossy_trim(&line[RANGE.len()..]).to_string());
        }
    }
    view
}

/// First offset of `needle` in `hay`, if any.
pub fn find(hay: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || hay.len() < needle.len() {
        return None;
    }
    hay.windows(needle.len()).position(|w| w == needle)
}

fn lossy_trim(b: &[u8]) -> String {
    String::from_utf8_lossy(b).trim().to_string()
}
