use thiserror::Error;

use crate::config::ConfigError;
use crate::http_probe::error::ProbeError;

/// Anything that ends a run early.
#[derive(Debug, Error)]
pub enum TripperError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("failed to render the JSON report")]
    Output(#[from] serde_json::Error),
}
