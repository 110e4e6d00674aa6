//! Logging setup.
//!
//! All output goes to **stderr**: stdout carries the handshake line the host
//! parses on startup.
//!
//! The filter comes from `RUST_LOG`, then `AUTHENTIK_PROVIDER_LOG`, then the
//! default level.
//!
//! ```bash
//! RUST_LOG=authentik_provider=debug ./authentik-provider
//! AUTHENTIK_PROVIDER_LOG=debug ./authentik-provider
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Provider-specific filter variable, consulted when `RUST_LOG` is unset.
pub const ENV_LOG: &str = "AUTHENTIK_PROVIDER_LOG";

fn filter_from(rust_log: Option<String>, provider_log: Option<String>, default_level: &str) -> EnvFilter {
    [rust_log, provider_log]
        .into_iter()
        .flatten()
        .find_map(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_level))
}

fn env_filter(default_level: &str) -> EnvFilter {
    filter_from(
        std::env::var(EnvFilter::DEFAULT_ENV).ok(),
        std::env::var(ENV_LOG).ok(),
        default_level,
    )
}

fn try_init_with(default_level: &str) -> bool {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init()
        .is_ok()
}

/// Install the global subscriber at `info` unless configured otherwise.
///
/// A second call is a no-op.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Like [`init_logging`] with a different fallback level.
pub fn init_logging_with_default(default_level: &str) {
    if !try_init_with(default_level) {
        tracing::debug!("global subscriber already installed");
    }
}

/// Install the subscriber, returning `false` if one was already set.
pub fn try_init_logging() -> bool {
    try_init_with("info")
}
