pub mod client;
pub mod error;
pub mod probe;
pub mod result;
pub mod stream;

use std::fmt::Write;

/// Render an error and its whole `source()` chain.
pub fn report(mut err: &(dyn std::error::Error + 'static)) -> String {
    let mut s = format!("{}", err);
    while let Some(src) = err.source() {
        let _ = write!(s, "\n\nCaused by: {}", src);
        err = src;
    }
    s
}

pub mod prelude {
    pub use super::client::ProbeClient;
    pub use super::error::ProbeError;
    pub use super::probe::{probe_url, run_probe};
    pub use super::result::ProbeOutcome;
}
