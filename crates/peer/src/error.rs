//! Error taxonomy for outbound peer calls.

use std::error::Error as _;

/// Classified failure of an outbound call to a peer server.
///
/// The taxonomy is deliberately small: it exists so that the last-error
/// text stored on a connected server (and shown to the user) says
/// "connection refused" rather than dumping a transport stack trace.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    #[error("Connection refused")]
    ConnectionRefused,

    #[error("DNS lookup failed")]
    DnsFailure,

    #[error("TLS handshake failed")]
    TlsFailure,

    #[error("Request timed out")]
    Timeout,

    #[error("Connection reset by peer")]
    ConnectionReset,

    #[error("Peer returned HTTP {0}")]
    Http(u16),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid peer URL: {0}")]
    InvalidUrl(String),

    #[error("Unexpected response from peer: {0}")]
    Decode(String),
}

impl PeerError {
    /// Whether the peer answered at all. HTTP-level failures mean the
    /// server is up (and should not flip the online bit to false).
    pub fn is_transport(&self) -> bool {
        !matches!(self, PeerError::Http(_) | PeerError::Decode(_))
    }
}

/// Classify a [`reqwest::Error`] into the taxonomy.
///
/// `reqwest` does not expose structured causes for most transport
/// failures, so after the typed checks this walks the source chain
/// looking for an [`std::io::Error`] kind and falls back to message
/// sniffing for DNS and TLS. Crude, but these strings are produced by
/// our own dependency stack, not by the remote end.
pub fn classify_reqwest(err: reqwest::Error) -> PeerError {
    if err.is_timeout() {
        return PeerError::Timeout;
    }
    if err.is_decode() {
        return PeerError::Decode(err.to_string());
    }

    let mut source: Option<&(dyn std::error::Error + 'static)> = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            match io.kind() {
                std::io::ErrorKind::ConnectionRefused => return PeerError::ConnectionRefused,
                std::io::ErrorKind::ConnectionReset => return PeerError::ConnectionReset,
                std::io::ErrorKind::TimedOut => return PeerError::Timeout,
                _ => {}
            }
        }
        source = cause.source();
    }

    let text = format!("{err:?}").to_ascii_lowercase();
    if text.contains("dns") || text.contains("name resolution") || text.contains("lookup") {
        return PeerError::DnsFailure;
    }
    if text.contains("tls") || text.contains("certificate") || text.contains("handshake") {
        return PeerError::TlsFailure;
    }
    if text.contains("refused") {
        return PeerError::ConnectionRefused;
    }
    if text.contains("reset") {
        return PeerError::ConnectionReset;
    }

    PeerError::Network(err.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
