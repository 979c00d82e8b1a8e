use md5::{Digest, Md5};

/// Resolved byte window: `(start, end_exclusive)` with
/// `0 <= start <= end <= total`.
pub type Window = (u64, u64);

/// Resolves a `Range: bytes=` header value against a known total
/// length. Single range only; multi-range requests and anything
/// malformed are not satisfiable.
///
/// - `-N`  suffix form: last `N` bytes, satisfiable iff `0 < N <= total`
/// - `N-`  prefix form: from `N` to the end, satisfiable iff `N < total`
/// - `S-E` explicit form: satisfiable iff `S <= E < total`
pub fn resolve(spec: &str, total: u64) -> Option<Window> {
    let parts: Vec<&str> = spec.split('-').collect();
    if parts.len() != 2 {
        return None;
    }
    match (parts[0], parts[1]) {
        ("", e) => {
            let n: u64 = e.parse().ok()?;
            (n > 0 && n <= total).then(|| (total - n, total))
        }
        (s, "") => {
            let n: u64 = s.parse().ok()?;
            (n < total).then(|| (n, total))
        }
        (s, e) => {
            let start: u64 = s.parse().ok()?;
            let end: u64 = e.parse().ok()?;
            (start <= end && end < total).then(|| (start, end + 1))
        }
    }
}

/// Content validator: md5 hex digest over the full response body.
/// Range slicing layers on top; the tag always identifies the whole
/// resource.
pub fn etag(body: &[u8]) -> String {
    format!("{:x}", Md5::digest(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_form() {
        assert_eq!(resolve("0-99", 1000), Some((0, 100)));
        assert_eq!(resolve("999-999", 1000), Some((999, 1000)));
        assert_eq!(resolve("1000-1001", 1000), None);
        assert_eq!(resolve("5-4", 1000), None);
    }

    #[test]
    fn suffix_and_prefix_forms() {
        assert_eq!(resolve("-10", 1000), Some((990, 1000)));
        assert_eq!(resolve("-0", 1000), None);
        assert_eq!(resolve("500-", 1000), Some((500, 1000)));
        assert_eq!(resolve("1000-", 1000), None);
    }

    #[test]
    fn malformed_forms() {
        assert_eq!(resolve("abc", 1000), None);
        assert_eq!(resolve("1-2-3", 1000), None);
        assert_eq!(resolve("a-b", 1000), None);
        assert_eq!(resolve("-", 1000), None);
    }

    #[test]
    fn etag_is_md5_hex() {
        assert_eq!(etag(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(etag(b"hello"), etag(b"hello"));
        assert_ne!(etag(b"hello"), etag(b"world"));
    }
}
