pub mod app_config;
pub mod args;
pub mod model;
pub mod tls;

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while turning flags, environment and the config file into an `AppConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid url {url:?}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported url scheme {0:?}, expected http or https")]
    UnsupportedScheme(String),

    #[error("url {0:?} has no host")]
    MissingHost(String),

    #[error("invalid DNS host {host:?}")]
    InvalidDnsHost {
        host: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("failed to build TLS configuration")]
    Tls(#[source] rustls::Error),
}
