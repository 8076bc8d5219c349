//! Shared error classification.

/// Grepable error code and retryable flag, surfaced to hosts that decide
/// whether offering a retry makes sense.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}
