//! Label allocation — unique, length-bounded names for generated firewalls.
//!
//! DESIGN
//! ======
//! Candidates are `<base>-<n>` for `n = 1, 2, 3, …`. The base is truncated
//! so the numeric suffix always fits inside `max_length`, and the first
//! candidate not already taken wins. Every candidate keeps at least one
//! base character; once the suffix would leave none the search stops. It is
//! also capped at
//! `MAX_SUFFIX_ATTEMPTS` so a pathological set of existing labels yields an
//! error instead of spinning forever.

use std::collections::HashSet;

use crate::error::ErrorCode;

/// Maximum label length accepted by the firewall API.
pub const DEFAULT_MAX_LABEL_LENGTH: usize = 32;

/// Upper bound on suffixes tried before giving up.
pub const MAX_SUFFIX_ATTEMPTS: u32 = 1000;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LabelError {
    /// Every candidate up to the attempt cap collided with an existing label.
    #[error("unable to allocate a unique label for '{base}' after {attempts} attempts")]
    Exhausted { base: String, attempts: u32 },

    /// `max_length` leaves no room for a base character plus a suffix.
    #[error("max label length {max_length} is too short for a suffixed label")]
    MaxLengthTooShort { max_length: usize },
}

impl ErrorCode for LabelError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Exhausted { .. } => "E_LABEL_EXHAUSTED",
            Self::MaxLengthTooShort { .. } => "E_LABEL_TOO_SHORT",
        }
    }
}

// =============================================================================
// ALLOCATION
// =============================================================================

/// Allocate with the API's default length limit.
///
/// # Errors
///
/// See [`allocate`].
pub fn allocate_default(base: &str, existing: &HashSet<String>) -> Result<String, LabelError> {
    allocate(base, existing, DEFAULT_MAX_LABEL_LENGTH)
}

/// Return the first `<base>-<n>` candidate not present in `existing`.
///
/// Lengths are counted in characters. The result never exceeds
/// `max_length`, and identical inputs always produce identical output.
///
/// # Errors
///
/// Returns [`LabelError::Exhausted`] when all `MAX_SUFFIX_ATTEMPTS`
/// candidates collide, or [`LabelError::MaxLengthTooShort`] when
/// `max_length` cannot hold `x-1`.
pub fn allocate(base: &str, existing: &HashSet<String>, max_length: usize) -> Result<String, LabelError> {
    if max_length < 3 {
        return Err(LabelError::MaxLengthTooShort { max_length });
    }

    let mut attempts = 0;
    for n in 1..=MAX_SUFFIX_ATTEMPTS {
        let suffix = format!("-{n}");
        // No room left for a base character; larger n cannot fit either.
        let room = match max_length.checked_sub(suffix.len()) {
            Some(room) if room > 0 => room,
            _ => break,
        };

        attempts = n;
        let candidate = format!("{}{suffix}", truncate_chars(base, room));
        if !existing.contains(&candidate) {
            return Ok(candidate);
        }
    }

    Err(LabelError::Exhausted { base: base.to_string(), attempts })
}

fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
#[path = "label_test.rs"]
mod tests;
