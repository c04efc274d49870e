//! Logging utilities and structured logging support
//!
//! The engine logs through the `log` facade. Binaries pick a backend; these
//! helpers install `env_logger`, which honours `RUST_LOG` when it is set.

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system with an `info` default filter
pub fn init() {
    init_with_filter("info");
}

/// Initialize logging, falling back to `default_filter` when `RUST_LOG` is unset.
///
/// Returns `false` if a global logger was already installed.
pub fn init_with_filter(default_filter: &str) -> bool {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .try_init()
        .is_ok()
}

/// Install a test-friendly logger that writes through the test harness capture.
///
/// Safe to call from every test; only the first call takes effect.
pub fn init_for_tests() {
    let _ = env_logger::builder().is_test(true).try_init();
}
