use serde::Deserialize;

/// Engine construction options.
///
/// All fields have working defaults; a host application can also
/// deserialize them from a YAML document via [`Options::from_yaml`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Maximum accumulated request bytes before the engine answers
    /// 413 and closes the connection (~500 MB).
    pub limit: usize,
    /// Accept `Range: bytes=` requests.
    pub ranges: bool,
    /// Value of the `Server` response header; `None` suppresses it.
    pub name: Option<String>,
    /// Client cache negotiation: send/verify `ETag` and `Last-Modified`.
    pub cache: bool,
    /// Close the connection on any response with status >= 400.
    /// 413 closes regardless of this setting.
    pub close_on_error: bool,
    /// Chunk size in bytes for `Transfer-Encoding: chunked` (~20 MB).
    /// Bodies longer than this (or of unknown length) are chunked on
    /// HTTP/1.1. 0 disables chunking entirely.
    pub chunked: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            limit: 500_000_000,
            ranges: true,
            name: Some(concat!("httpstream/", env!("CARGO_PKG_VERSION")).to_string()),
            cache: true,
            close_on_error: false,
            chunked: 20_000_000,
        }
    }
}

impl Options {
    /// Loads options from a YAML document. Missing keys fall back to
    /// their defaults.
    pub fn from_yaml(s: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }
}
