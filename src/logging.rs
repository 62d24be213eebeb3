//! Diagnostic logging to stderr.
//!
//! Stdout belongs to the presentation; every `tracing` event goes to stderr.
//! `RUST_LOG` takes precedence over the verbosity flags.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Level directive for the given flags.
pub fn default_level(quiet: bool, verbosity: u8) -> &'static str {
    if quiet {
        return "error";
    }
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(quiet: bool, verbosity: u8) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(quiet, verbosity)));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbosity >= 2);

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("logging already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level_follows_verbosity() {
        assert_eq!(default_level(false, 0), "warn");
        assert_eq!(default_level(false, 1), "info");
        assert_eq!(default_level(false, 2), "debug");
        assert_eq!(default_level(false, 7), "debug");
    }

    #[test]
    fn test_quiet_wins_over_verbose() {
        assert_eq!(default_level(true, 2), "error");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init(true, 0);
        init(false, 2);
    }
}
