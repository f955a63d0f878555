//! Diagnostic logging setup.
//!
//! Console progress lines are rendered by `output`; this is the `tracing`
//! side, written to stderr so it never mixes with printed translations.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter directive for a verbosity level.
///
/// `RUST_LOG` takes precedence when set.
pub fn default_directive(verbosity: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbosity {
        0 => "warn",
        1 => "info,interpsh=info",
        2 => "info,interpsh=debug",
        _ => "debug,interpsh=trace",
    }
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init(verbosity: u8, quiet: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity, quiet)));

    let result = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbosity >= 2),
        )
        .try_init();

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_wins_over_verbosity() {
        assert_eq!(default_directive(3, true), "error");
    }

    #[test]
    fn test_directive_grows_with_verbosity() {
        assert_eq!(default_directive(0, false), "warn");
        assert!(default_directive(2, false).contains("interpsh=debug"));
        assert!(default_directive(9, false).contains("interpsh=trace"));
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init(0, false);
        init(2, false);
    }
}
