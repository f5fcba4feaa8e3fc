//! Tracing setup for hosts embedding the crate.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "siteforce_offline=info";

/// Install a `fmt` subscriber filtered by `RUST_LOG`
///
/// Safe to call more than once; only the first call installs anything.
pub fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.to_string());

    let installed = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&env_filter))
        .with_target(true)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!("Tracing initialized with filter {}", env_filter);
    }
}
