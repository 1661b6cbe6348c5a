use serde::Serialize;
use serde_json::Value;

use crate::errors::CoreError;

/// Structured result crossing the request/response boundary. Callers
/// always receive this envelope, never a raw error.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub status: bool,
    pub message: String,
    pub data: Option<Value>,
}

impl ApiResponse {
    pub fn ok(message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            status: true,
            message: message.into(),
            data,
        }
    }

    pub fn error(err: &CoreError) -> Self {
        Self {
            status: false,
            message: err.to_string(),
            data: None,
        }
    }

    /// Success envelope with a serialized payload.
    pub fn from_value<T: Serialize>(message: impl Into<String>, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(data) => Self::ok(message, Some(data)),
            Err(err) => Self::error(&CoreError::Serde(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_carries_message_and_no_data() {
        let err = CoreError::StateConflict("debt is locked".into());
        let response = ApiResponse::error(&err);
        assert!(!response.status);
        assert!(response.message.contains("locked"));
        assert!(response.data.is_none());
    }

    #[test]
    fn ok_envelope_serializes_payload() {
        let response = ApiResponse::from_value("done", &serde_json::json!({"count": 3}));
        assert!(response.status);
        assert_eq!(response.data.unwrap()["count"], 3);
    }
}
