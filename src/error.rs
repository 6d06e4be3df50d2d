//! Error types for the Instatus provider.

use thiserror::Error;

use crate::client::ApiError;

/// Errors that can occur while serving provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An internal provider error occurred.
    #[error("SDK error: {0}")]
    Sdk(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Resource already exists (create conflict).
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    /// Permission denied (authentication/authorization failure).
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Quota or rate limit exceeded.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Service temporarily unavailable.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Operation timed out.
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// Operation failed due to current state (precondition not met).
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    /// Invalid request from client.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// The message carried by the error, without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::Sdk(msg)
            | Self::Configuration(msg)
            | Self::UnknownResource(msg)
            | Self::AlreadyExists(msg)
            | Self::PermissionDenied(msg)
            | Self::ResourceExhausted(msg)
            | Self::Unavailable(msg)
            | Self::DeadlineExceeded(msg)
            | Self::FailedPrecondition(msg)
            | Self::InvalidRequest(msg) => msg,
            Self::Serialization(_) => "serialization error (see Debug output)",
        }
    }

    /// Convert an API error, prefixing the message with the operation that failed.
    ///
    /// ```
    /// use hemmer_provider_instatus::client::ApiError;
    /// use hemmer_provider_instatus::ProviderError;
    ///
    /// let api = ApiError::Status { status: 404, body: "not found".to_string() };
    /// let err = ProviderError::from_api("error reading component", api);
    /// assert!(matches!(err, ProviderError::NotFound(_)));
    /// assert_eq!(
    ///     err.message(),
    ///     "error reading component: API request failed with status 404: not found"
    /// );
    /// ```
    pub fn from_api(context: &str, err: ApiError) -> Self {
        let msg = format!("{}: {}", context, err);
        match &err {
            ApiError::Status { status, .. } => match *status {
                404 => Self::NotFound(msg),
                401 | 403 => Self::PermissionDenied(msg),
                409 => Self::AlreadyExists(msg),
                429 => Self::ResourceExhausted(msg),
                500..=599 => Self::Unavailable(msg),
                _ => Self::InvalidRequest(msg),
            },
            ApiError::Request(source) if source.is_timeout() => Self::DeadlineExceeded(msg),
            ApiError::Request(_) => Self::Unavailable(msg),
            ApiError::Build(_) => Self::Configuration(msg),
            ApiError::Encode(_) | ApiError::Decode(_) => Self::Sdk(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(status: u16, body: &str) -> ApiError {
        ApiError::Status {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_error_display() {
        let err = ProviderError::NotFound("component-123".to_string());
        assert_eq!(format!("{}", err), "Resource not found: component-123");

        let err = ProviderError::Configuration("missing api key".to_string());
        assert_eq!(format!("{}", err), "Configuration error: missing api key");

        let err = ProviderError::UnknownResource("instatus_incident".to_string());
        assert_eq!(format!("{}", err), "Unknown resource type: instatus_incident");
    }

    #[test]
    fn test_api_status_mapping() {
        let cases = [
            (404, "NotFound"),
            (401, "PermissionDenied"),
            (403, "PermissionDenied"),
            (409, "AlreadyExists"),
            (429, "ResourceExhausted"),
            (502, "Unavailable"),
            (400, "InvalidRequest"),
            (422, "InvalidRequest"),
        ];

        for (code, expected) in cases {
            let err = ProviderError::from_api("error creating component", status_error(code, "{}"));
            let variant = format!("{:?}", err);
            assert!(
                variant.starts_with(expected),
                "status {} mapped to {}, expected {}",
                code,
                variant,
                expected
            );
        }
    }

    #[test]
    fn test_api_error_keeps_status_and_body() {
        let err = ProviderError::from_api(
            "error reading component",
            status_error(404, r#"{"error":"component not found"}"#),
        );
        assert_eq!(
            err.message(),
            r#"error reading component: API request failed with status 404: {"error":"component not found"}"#
        );
    }

    #[test]
    fn test_decode_error_maps_to_sdk() {
        let source = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err = ProviderError::from_api("error reading component", ApiError::Decode(source));
        assert!(matches!(err, ProviderError::Sdk(_)));
        assert!(err.message().starts_with("error reading component: error unmarshaling response"));
    }

    #[test]
    fn test_message_method() {
        let err = ProviderError::NotFound("component-123".to_string());
        assert_eq!(err.message(), "component-123");

        let err = ProviderError::InvalidRequest("bad request".to_string());
        assert_eq!(err.message(), "bad request");
    }
}
