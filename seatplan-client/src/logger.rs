//! Logging setup
//!
//! `RUST_LOG` 优先，否则使用传入的默认级别。

use tracing_subscriber::EnvFilter;

/// Initialize the logger with the default `seatplan_client=info` filter
pub fn init_logger() {
    init_logger_with_level(None);
}

/// Initialize the logger; `log_level` is used when `RUST_LOG` is unset
///
/// Safe to call more than once: later calls are ignored.
pub fn init_logger_with_level(log_level: Option<&str>) {
    let fallback = log_level.unwrap_or("seatplan_client=info");
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false)
        .try_init();
}
