//! Process-wide tracing/logging setup shared by every stowage binary.

/// Initialize process-wide observability. Output is JSON unless
/// `STOWAGE_LOG_FORMAT=pretty`.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    self::tracing::init(LogFormat::from_env());
}

pub use self::tracing::{LOG_FORMAT_VAR, LogFormat, init_for_tests};

/// Tracing configuration (filters, layers).
pub mod tracing;
