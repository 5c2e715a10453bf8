//! Process-wide logging setup.

pub mod logging;

pub use logging::{LogFormat, LoggingConfig};

/// Initialize logging from the environment (`RUST_LOG`, `LOG_FORMAT`).
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init() {
    logging::init(LoggingConfig::from_env());
}
