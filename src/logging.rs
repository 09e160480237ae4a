use log::{debug, error, info, warn};

/// Initializes the logger with the `env_logger` crate.
pub fn init_logger() {
    env_logger::init();
}

/// Initializes a capture-friendly logger for test binaries. Safe to call more
/// than once.
pub fn init_test_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Logs an error message.
pub fn log_error(message: &str) {
    error!("{message}");
}

/// Logs a warning message.
pub fn log_warn(message: &str) {
    warn!("{message}");
}

/// Logs an informational message.
pub fn log_info(message: &str) {
    info!("{message}");
}

/// Logs a debug message.
pub fn log_debug(message: &str) {
    debug!("{message}");
}
