//! Tracing and logging setup shared by every taskq binary.

/// Initialize process-wide logging.
///
/// The format comes from `TASKQ_LOG_FORMAT` (`json`, the default, or `pretty`).
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    let format = match std::env::var("TASKQ_LOG_FORMAT") {
        Ok(v) => v.parse().unwrap_or_else(|e| {
            eprintln!("{e}; falling back to json logs");
            LogFormat::Json
        }),
        Err(_) => LogFormat::Json,
    };
    tracing::init(format);
}

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use self::tracing::LogFormat;
