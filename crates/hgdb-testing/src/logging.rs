//! Log output for test binaries.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "warn,hgdb_client=debug,hgdb_provider=debug";

static INIT: Once = Once::new();

/// Install a global subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs anything.
/// `RUST_LOG` overrides [`DEFAULT_FILTER`].
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        // Another harness may already own the global subscriber.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
