//! API wire models

use serde::{Deserialize, Serialize};

/// Numeric error codes carried in caller-visible error bodies
pub mod error_codes {
    /// Current turn exceeds the single-message token budget
    pub const OVERSIZED_TURN: u32 = 1;

    /// Upstream rejected the caller's credential
    pub const UPSTREAM_AUTH: u32 = 2;

    /// Any other upstream or internal failure
    pub const INTERNAL: u32 = 99_999;
}

/// Error body for chat endpoints
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub error_code: u32,
    pub message: String,
}

impl ApiError {
    pub fn new(error_code: u32, message: impl Into<String>) -> Self {
        Self {
            error_code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_wire_format() {
        let error = ApiError::new(error_codes::OVERSIZED_TURN, "too large");
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["errorCode"], 1);
        assert_eq!(json["message"], "too large");
    }

    #[test]
    fn test_error_code_values() {
        assert_eq!(error_codes::OVERSIZED_TURN, 1);
        assert_eq!(error_codes::UPSTREAM_AUTH, 2);
        assert_eq!(error_codes::INTERNAL, 99_999);
    }
}
