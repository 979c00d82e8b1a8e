use bytes::{Bytes, BytesMut};

/// Header/body separator.
pub const SEPARATOR: &[u8] = b"\r\n\r\n";

/// Accumulates unconsumed inbound bytes for one connection.
///
/// Inbound reads never align with HTTP message boundaries, so the engine
/// appends whatever the transport delivers and slices complete requests
/// back out. The engine enforces the configured size limit *before*
/// appending; the accumulator itself never rejects.
#[derive(Debug, Default)]
pub struct Accumulator {
    buf: BytesMut,
}

impl Accumulator {
    pub fn new() -> Self {
        Self { buf: BytesMut::new() }
    }

    pub fn append(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Offset of the first CRLF-CRLF, if any.
    pub fn find_separator(&self) -> Option<usize> {
        self.buf.windows(SEPARATOR.len()).position(|w| w == SEPARATOR)
    }

    /// Removes and returns the first `n` bytes, retaining the remainder.
    pub fn take(&mut self, n: usize) -> Bytes {
        debug_assert!(n <= self.buf.len());
        self.buf.split_to(n).freeze()
    }

    /// Drops the first `n` bytes.
    pub fn consume(&mut self, n: usize) {
        let _ = self.buf.split_to(n);
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separator_across_appends() {
        let mut acc = Accumulator::new();
        acc.append(b"GET / HTTP/1.1\r\n");
        assert_eq!(acc.find_separator(), None);
        acc.append(b"\r");
        assert_eq!(acc.find_separator(), None);
        acc.append(b"\n");
        assert_eq!(acc.find_separator(), Some(14));
    }

    #[test]
    fn take_retains_remainder() {
        let mut acc = Accumulator::new();
        acc.append(b"hello world");
        assert_eq!(&acc.take(5)[..], b"hello");
        assert_eq!(acc.as_slice(), b" world");
    }
}
