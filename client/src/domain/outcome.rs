//! Serialisable success/failure envelope.
//!
//! UI bridges and the CLI report results as `{ "success": true, ... }` or
//! `{ "success": false, "error": "..." }`. The domain itself keeps using
//! `Result<T, Error>`; this type only exists at the edge.

use serde::Serialize;

use super::{Error, ErrorCode};

/// Uniform outcome shape for reporting a [`Result`] to callers.
///
/// # Examples
/// ```
/// use carelink::domain::{Error, OperationOutcome};
///
/// let outcome: OperationOutcome<()> = Err(Error::not_found("User not found")).into();
/// let json = serde_json::to_value(&outcome).expect("serialise");
/// assert_eq!(json["success"], false);
/// assert_eq!(json["error"], "User not found");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcome<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<ErrorCode>,
}

impl<T> OperationOutcome<T> {
    /// Whether the operation succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Failure message, if the operation failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl<T> From<Result<T, Error>> for OperationOutcome<T> {
    fn from(result: Result<T, Error>) -> Self {
        match result {
            Ok(data) => Self {
                success: true,
                data: Some(data),
                error: None,
                code: None,
            },
            Err(err) => Self {
                success: false,
                data: None,
                error: Some(err.message().to_owned()),
                code: Some(err.code()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unit_success_serialises_null_data() {
        let outcome: OperationOutcome<()> = Ok(()).into();
        let value = serde_json::to_value(&outcome).expect("serialise");
        assert_eq!(value, json!({ "success": true, "data": null }));
        assert!(outcome.is_success());
    }

    #[test]
    fn failure_carries_message_and_code() {
        let outcome: OperationOutcome<u8> = Err(Error::not_configured()).into();
        let value = serde_json::to_value(&outcome).expect("serialise");
        assert_eq!(
            value,
            json!({
                "success": false,
                "error": "backend is not configured",
                "code": "not_configured",
            })
        );
    }
}
