use httpstream::http::body::{parse_multipart, parse_query, parse_urlencoded};

fn multipart_two_fields() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(b"--X\r\n");
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"t1\"\r\n\r\n");
    body.extend_from_slice(b"value\r\n");
    body.extend_from_slice(b"--X\r\n");
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"up\"; filename=\"f1\"\r\n\r\n");
    body.extend_from_slice(b"\x00\x01\x02file bytes\r\n");
    body.extend_from_slice(b"--X--\r\n");
    body
}

#[test]
fn test_multipart_file_and_field() {
    let attach = parse_multipart(&multipart_two_fields(), "X");

    assert_eq!(attach.query.get("t1").unwrap(), &vec!["value".to_string()]);
    assert_eq!(attach.files.len(), 1);
    assert_eq!(attach.files[0].name, "f1");
    assert_eq!(&attach.files[0].data[..], b"\x00\x01\x02file bytes");
}

#[test]
fn test_multipart_repeated_field_names_accumulate() {
    let mut body = Vec::new();
    for v in ["a", "b", "c"] {
        body.extend_from_slice(b"--B\r\n");
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"k\"\r\n\r\n");
        body.extend_from_slice(v.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(b"--B--\r\n");

    let attach = parse_multipart(&body, "B");
    assert_eq!(
        attach.query.get("k").unwrap(),
        &vec!["a".to_string(), "b".to_string(), "c".to_string()]
    );
}

#[test]
fn test_multipart_too_few_boundaries_yields_empty() {
    // fewer than three markers means no full part; callers must
    // tolerate an empty attachment rather than a failed request
    let attach = parse_multipart(b"--X\r\njunk\r\n--X--", "X");
    assert!(attach.query.is_empty());
    assert!(attach.files.is_empty());

    let attach = parse_multipart(b"no markers at all", "X");
    assert!(attach.query.is_empty());
    assert!(attach.files.is_empty());
}

#[test]
fn test_multipart_part_without_separator_is_skipped() {
    let body = b"--X\r\nno header separator here--X\r\nstill none--X--";
    let attach = parse_multipart(body, "X");
    assert!(attach.query.is_empty());
    assert!(attach.files.is_empty());
}

#[test]
fn test_urlencoded_basic() {
    let attach = parse_urlencoded(b"a=1&b=hello+world&a=2");
    assert_eq!(
        attach.query.get("a").unwrap(),
        &vec!["1".to_string(), "2".to_string()]
    );
    assert_eq!(
        attach.query.get("b").unwrap(),
        &vec!["hello world".to_string()]
    );
    assert!(attach.files.is_empty());
}

#[test]
fn test_urlencoded_percent_decoding() {
    let attach = parse_urlencoded(b"msg=caf%C3%A9");
    assert_eq!(attach.query.get("msg").unwrap(), &vec!["café".to_string()]);
}

#[test]
fn test_query_string() {
    let q = parse_query("x=1&y=&x=3");
    assert_eq!(q.get("x").unwrap(), &vec!["1".to_string(), "3".to_string()]);
    assert_eq!(q.get("y").unwrap(), &vec!["".to_string()]);
}
