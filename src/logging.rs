//! # Diagnostic logging setup.
//!
//! testvisor logs through `tracing`. Libraries never install a subscriber on
//! their own; binaries, demos and tests call [`init`] (or [`init_with`]) once.
//!
//! Logs go to **stderr** so stdout stays reserved for reporter output.
//! `RUST_LOG` wins over the default directive when set.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter directive when `RUST_LOG` is not set.
pub const DEFAULT_DIRECTIVE: &str = "testvisor=info";

/// Installs a compact stderr subscriber filtered by `RUST_LOG` or [`DEFAULT_DIRECTIVE`].
///
/// Returns `false` if a global subscriber was already set (not an error).
pub fn init() -> bool {
    init_with(DEFAULT_DIRECTIVE)
}

/// Like [`init`], with a custom default directive (e.g. `"testvisor=debug"`).
pub fn init_with(default_directive: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact(),
        )
        .try_init()
        .is_ok();

    if !installed {
        tracing::debug!("global tracing subscriber already set; keeping it");
    }
    installed
}
