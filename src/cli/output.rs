//! CLI output: error mapping from domain errors to the CLI surface.

use crate::error::ApiError;

/// Map a domain error to the message printed on stderr.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::AuthenticationFailed { .. } => {
            format!("{}\nCheck connection.email and connection.password.", e)
        }
        ApiError::ConfigError(_) => {
            format!("{}\nRun 'ebx config validate' for details.", e)
        }
        _ => e.to_string(),
    }
}

/// Process exit code for a failed command.
pub fn exit_code(e: &ApiError) -> i32 {
    match e {
        ApiError::Cancelled { .. } => 130,
        ApiError::Timeout { .. } => 3,
        e if e.is_monitor_failure() => 2,
        _ => 1,
    }
}
