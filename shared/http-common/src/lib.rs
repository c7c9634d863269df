//! Shared HTTP utilities for the redirect validator workspace.
//!
//! Provides the webhook response body, small JSON helpers and env flag
//! parsing used by both api-server and lambda-validate.

use domain::ValidationResult;

/// Status code for every webhook answer. The verdict travels in the body;
/// a non-200 would make the CMS treat the validator as broken.
pub const WEBHOOK_STATUS: u16 = 200;

// ============================================================================
// JSON Response Helpers (framework-agnostic)
// ============================================================================

/// Webhook response body: `{"isValid": bool, "messages"?: [...]}`.
pub fn validation_json(result: &ValidationResult) -> serde_json::Value {
    // ValidationResult only holds strings and bools; serialization cannot fail.
    serde_json::to_value(result).unwrap_or_else(|_| serde_json::json!({"isValid": true}))
}

/// Create a structured error JSON with a custom message.
///
/// Returns: `{"error": {"code": "<code>", "message": "<message>"}}`
pub fn json_error_with_message(code: &str, message: &str) -> serde_json::Value {
    serde_json::json!({"error": {"code": code, "message": message}})
}

// ============================================================================
// Env Helpers
// ============================================================================

/// True for `1`, `true`, `yes`, `on` (any case).
pub fn is_truthy(value: &str) -> bool {
    matches_ignore_case(value.trim(), &["1", "true", "yes", "on"])
}

/// Read a boolean flag from the environment; unset means false.
pub fn env_flag(name: &str) -> bool {
    std::env::var(name).map(|v| is_truthy(&v)).unwrap_or(false)
}

fn matches_ignore_case(s: &str, any: &[&str]) -> bool {
    any.iter().any(|t| s.eq_ignore_ascii_case(t))
}

// ============================================================================
// Lambda HTTP Helpers (feature-gated)
// ============================================================================

#[cfg(feature = "lambda")]
pub mod lambda {
    //! Lambda-specific HTTP response builders using `lambda_http` types.

    use domain::ValidationResult;
    use lambda_http::{Body, Error, Response};

    /// Build a JSON response with the given status.
    pub fn resp(status: u16, body_json: serde_json::Value) -> Result<Response<Body>, Error> {
        let body = serde_json::to_string(&body_json)?;
        Ok(Response::builder()
            .status(status)
            .header("content-type", "application/json")
            .body(Body::Text(body))?)
    }

    /// Build the webhook answer for a verdict.
    pub fn validation_resp(result: &ValidationResult) -> Result<Response<Body>, Error> {
        resp(crate::WEBHOOK_STATUS, crate::validation_json(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::ValidationMessage;

    #[test]
    fn test_validation_json() {
        assert_eq!(
            validation_json(&ValidationResult::valid()),
            serde_json::json!({"isValid": true})
        );
        let bad = ValidationResult::rejected(ValidationMessage::error("dup"));
        assert_eq!(
            validation_json(&bad),
            serde_json::json!({"isValid": false, "messages": [{"severity": "error", "message": "dup"}]})
        );
    }

    #[test]
    fn test_json_error_with_message() {
        let err = json_error_with_message("bad_request", "Invalid input");
        assert_eq!(
            err,
            serde_json::json!({"error": {"code": "bad_request", "message": "Invalid input"}})
        );
    }

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy("1"));
        assert!(is_truthy("TRUE"));
        assert!(is_truthy(" yes "));
        assert!(is_truthy("On"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy(""));
        assert!(!is_truthy("enabled"));
    }
}
