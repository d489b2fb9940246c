//! Merge rules: defaults, override order, conflict handling.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Later sources override earlier ones: defaults, global file, project files,
/// explicit file, then `EBX_` environment variables.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("connection.batch_size", 800_i64)?
        .set_default("transport.connect_timeout_secs", 10_i64)?
        .set_default("transport.request_timeout_secs", 60_i64)?
        .set_default("transport.accept_invalid_certs", false)?
        .set_default("monitor.poll_interval_ms", 1000_i64)?
        .set_default("monitor.timeout_minutes", 0_i64)
}
