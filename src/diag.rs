use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

/// One diagnostic event: the status of a failed response plus the
/// `host protocol method path` context line. Never sent over the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub status: u16,
    pub context: String,
}

/// Diagnostic sink shared by engine and encoder.
///
/// Every response with status >= 400, every 416 and every mid-stream
/// I/O failure lands here. Events are always traced; a host
/// application can additionally subscribe via [`Diagnostics::channel`].
#[derive(Clone, Default)]
pub struct Diagnostics {
    tx: Option<UnboundedSender<Diagnostic>>,
}

impl Diagnostics {
    /// Trace-only sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink paired with a receiver for the host application.
    pub fn channel() -> (Self, UnboundedReceiver<Diagnostic>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn emit(&self, status: u16, context: impl Into<String>) {
        let context = context.into();
        tracing::warn!(status, %context, "http error");
        if let Some(tx) = &self.tx {
            // receiver dropped means the host stopped listening; fine
            let _ = tx.send(Diagnostic { status, context });
        }
    }
}
