//! Tracing setup for the CLI
//!
//! Diagnostics go to stderr so that `--format json` output on stdout stays
//! parseable.

use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is not set
fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "depgate=debug"
    } else {
        "warn"
    }
}

/// Installs the global subscriber
///
/// `--verbose` wins over `RUST_LOG`; otherwise `RUST_LOG` is honoured and the
/// fallback is `warn`. Calling this twice is harmless.
pub fn init(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(default_directive(true))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(false)))
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_enables_debug_for_crate() {
        assert_eq!(default_directive(true), "depgate=debug");
        assert_eq!(default_directive(false), "warn");
    }

    #[test]
    fn init_twice_does_not_panic() {
        init(false);
        init(true);
    }
}
