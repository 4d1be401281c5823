//! Per-event and per-chain outcome records

use crate::error::ErrorCode;

/// Maximum length of an error message carried by an [`EventResult`].
pub const MAX_ERROR_LENGTH: usize = 1024;

/// How much detail failure messages carry.
///
/// `Minimal` strips the original message and reports only the numeric
/// code, for hosts that must not leak phase internals to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailLevel {
    #[default]
    Full,
    Minimal,
}

/// Outcome of a single event execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventResult {
    pub success: bool,
    pub error_code: ErrorCode,
    pub error_message: String,
}

impl EventResult {
    /// A successful result with an empty message.
    pub fn success() -> Self {
        EventResult {
            success: true,
            error_code: ErrorCode::Success,
            error_message: String::new(),
        }
    }

    /// A failed result.
    ///
    /// Under [`DetailLevel::Minimal`] the message is replaced with
    /// `"Error code: N"`. Otherwise the message is truncated to
    /// [`MAX_ERROR_LENGTH`]; an empty message falls back to the code's
    /// description.
    pub fn failure(
        message: impl Into<String>,
        error_code: ErrorCode,
        detail_level: DetailLevel,
    ) -> Self {
        let message = message.into();
        let error_message = match detail_level {
            DetailLevel::Minimal => format!("Error code: {}", error_code.code()),
            DetailLevel::Full => {
                let mut msg = if message.is_empty() {
                    error_code.description().to_string()
                } else {
                    message
                };
                if msg.len() > MAX_ERROR_LENGTH {
                    // Truncate on a char boundary
                    let mut end = MAX_ERROR_LENGTH;
                    while !msg.is_char_boundary(end) {
                        end -= 1;
                    }
                    msg.truncate(end);
                }
                msg
            }
        };

        EventResult {
            success: false,
            error_code,
            error_message,
        }
    }

    pub fn is_failure(&self) -> bool {
        !self.success
    }
}

/// One recorded failure inside a [`ChainResult`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureInfo {
    /// Name of the event whose pipeline produced the failure
    pub event_name: String,
    pub error_message: String,
    pub error_code: ErrorCode,
}

/// Aggregate outcome of a chain execution.
///
/// The failure list is the complete audit trail regardless of fault
/// mode; `success` reflects the fault policy, not the list. In lenient
/// and best-effort modes `success` stays `true` even when failures were
/// recorded, so callers interested in partial failures must inspect
/// [`failure_count`](Self::failure_count).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainResult {
    pub success: bool,
    pub failures: Vec<FailureInfo>,
}

impl ChainResult {
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_result() {
        let result = EventResult::success();
        assert!(result.success);
        assert_eq!(result.error_code, ErrorCode::Success);
        assert!(result.error_message.is_empty());
    }

    #[test]
    fn test_failure_full_detail() {
        let result = EventResult::failure(
            "tokens missing",
            ErrorCode::InvalidParameter,
            DetailLevel::Full,
        );
        assert!(result.is_failure());
        assert_eq!(result.error_code, ErrorCode::InvalidParameter);
        assert_eq!(result.error_message, "tokens missing");
    }

    #[test]
    fn test_failure_minimal_detail() {
        let result = EventResult::failure(
            "sensitive internals",
            ErrorCode::InvalidParameter,
            DetailLevel::Minimal,
        );
        assert_eq!(result.error_message, "Error code: 2");
    }

    #[test]
    fn test_failure_empty_message_uses_description() {
        let result = EventResult::failure("", ErrorCode::NotFound, DetailLevel::Full);
        assert_eq!(result.error_message, "Item not found");
    }

    #[test]
    fn test_failure_message_truncated() {
        let long = "x".repeat(MAX_ERROR_LENGTH * 2);
        let result = EventResult::failure(long, ErrorCode::Overflow, DetailLevel::Full);
        assert_eq!(result.error_message.len(), MAX_ERROR_LENGTH);
    }
}
