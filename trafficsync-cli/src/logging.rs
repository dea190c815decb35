//! Process-wide logger setup.

use std::sync::Once;

static INIT: Once = Once::new();

/// Install `env_logger`, defaulting to `info` when `RUST_LOG` is unset.
///
/// Safe to call repeatedly; only the first call installs the logger.
pub(crate) fn init_logging() {
    INIT.call_once(|| {
        let env = env_logger::Env::default().default_filter_or("info");
        // A logger installed by an embedding process takes precedence.
        drop(env_logger::Builder::from_env(env).try_init());
    });
}
