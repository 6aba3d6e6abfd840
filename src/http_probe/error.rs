use std::net::SocketAddr;

use thiserror::Error;

/// Failure of a single probe.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("could not resolve {host}: {message}")]
    Resolve { host: String, message: String },

    #[error("could not connect to {host}")]
    Connect {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no address to connect to for {0}")]
    NoAddress(String),

    #[error("invalid TLS server name {0:?}")]
    ServerName(String),

    #[error("TLS handshake with {host} failed")]
    Tls {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("request error")]
    Request(#[source] hyper::http::Error),

    #[error("client error")]
    Http(#[source] hyper::Error),
}

impl ProbeError {
    /// Construction errors affect every probe identically and are always fatal.
    pub fn is_request_error(&self) -> bool {
        matches!(self, ProbeError::Request(_))
    }

    pub fn connect_failed(host: &str, addr: SocketAddr, source: std::io::Error) -> Self {
        ProbeError::Connect {
            host: format!("{host} ({addr})"),
            source,
        }
    }
}
