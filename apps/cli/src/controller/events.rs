//! Failure reporting for the terminal front end.

use client_core::{ClientError, ErrorCategory};

/// One-line explanation of a failed backend call, suitable for the terminal.
pub fn describe_failure(err: &ClientError) -> String {
    match err.category() {
        ErrorCategory::Auth => {
            "Not signed in; run `kantanmemo login <user-id>` or `kantanmemo register <name>`."
                .to_string()
        }
        ErrorCategory::Transport => {
            format!("Backend unreachable; check backend_url/network and retry ({err}).")
        }
        ErrorCategory::Backend => format!("Backend error: {err}"),
        ErrorCategory::Validation => err.to_string(),
    }
}

/// Whether a failed `/user/me` means the stored session should be dropped.
///
/// Only a backend that actually answered can reject the session; an
/// unreachable backend says nothing about it.
pub fn session_rejected(err: &ClientError) -> bool {
    err.backend_responded()
}
