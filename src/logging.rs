//! Logging setup. Everything goes to stderr so stdout only carries the report.

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Initialize the `log` backend.
///
/// With `debug` the crate logs every request lifecycle event; otherwise the
/// level comes from `RUST_LOG` and nothing is logged when it is unset.
pub fn init_logging(debug: bool) {
    logger_builder(Env::default().default_filter_or("off"), debug).init();
}

fn logger_builder(env: Env, debug: bool) -> Builder {
    let mut builder = Builder::from_env(env);

    if debug {
        builder.filter_module(env!("CARGO_CRATE_NAME"), LevelFilter::Debug);
    }

    // Lifecycle events carry their own UTC timestamp.
    builder
        .target(env_logger::Target::Stderr)
        .format_timestamp(None);
    builder
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unset_env() -> Env<'static> {
        Env::new()
            .filter("TRIPPER_TEST_LOG_UNSET")
            .default_filter_or("off")
    }

    #[test]
    fn test_silent_without_debug() {
        let logger = logger_builder(unset_env(), false).build();
        assert_eq!(logger.filter(), LevelFilter::Off);
    }

    #[test]
    fn test_debug_enables_crate_logging() {
        let logger = logger_builder(unset_env(), true).build();
        assert_eq!(logger.filter(), LevelFilter::Debug);
    }

    #[test]
    fn test_env_filter_still_applies() {
        let logger = logger_builder(unset_env().default_filter_or("warn"), false).build();
        assert_eq!(logger.filter(), LevelFilter::Warn);
    }
}
