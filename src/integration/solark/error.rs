//! Error handling for the Sol-Ark Cloud API client.

use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Authentication failed: invalid credentials")]
    InvalidCredentials,
    #[error("Authentication failed: token expired or rejected")]
    TokenExpired,
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Plant {0} not found")]
    InvalidPlantId(String),
    #[error("Rate limited by the cloud API")]
    RateLimited,

    #[error("Request timed out")]
    Timeout,
    #[error("Cannot reach {0}")]
    Unreachable(String),
    #[error("Server error: HTTP {0}")]
    ServerError(u16),
    #[error("Request rejected: {0}")]
    BadRequest(String),
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Unauthorized")]
    Unauthorized,
    #[error("Not found")]
    NotFound,

    #[error("Unexpected response schema: {0}")]
    SchemaMismatch(String),
    #[error("Cloud API error: {0}")]
    Api(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Host-facing error descriptor with a stable code and remediation hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDescriptor {
    pub code: &'static str,
    pub message: String,
    pub hint: &'static str,
}

impl Error {
    /// Errors worth retrying on the normal polling schedule.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Timeout | Error::Unreachable(_) | Error::ServerError(_) | Error::RequestFailed(_)
        )
    }

    /// Errors that cannot clear without reconfiguration.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Error::InvalidCredentials | Error::InvalidPlantId(_) | Error::BadRequest(_)
        )
    }

    pub fn descriptor(&self) -> ErrorDescriptor {
        let (code, hint) = match self {
            Error::InvalidCredentials => (
                "invalid_credentials",
                "Check the configured Sol-Ark account email and password",
            ),
            Error::TokenExpired | Error::Unauthorized => (
                "auth_expired",
                "Re-authentication is attempted automatically on the next cycle",
            ),
            Error::AuthFailed(_) => (
                "auth_failed",
                "Check the credentials; if they are valid the cloud API may be degraded",
            ),
            Error::InvalidPlantId(_) => ("invalid_plant_id", "Verify the configured plant id"),
            Error::RateLimited => ("rate_limited", "Increase the update interval"),
            Error::Timeout => ("timeout", "Check connectivity to the Sol-Ark Cloud hosts"),
            Error::Unreachable(_) => (
                "unreachable",
                "Check connectivity to the Sol-Ark Cloud hosts",
            ),
            Error::ServerError(_) => (
                "server_error",
                "The cloud API is degraded; retried on the normal schedule",
            ),
            Error::BadRequest(_) | Error::NotFound => (
                "bad_request",
                "Verify the configured plant id and base URL",
            ),
            Error::RequestFailed(_) => ("request_failed", "Check network connectivity"),
            Error::SchemaMismatch(_) => (
                "schema_mismatch",
                "The vendor API may have changed; enable debug logging",
            ),
            Error::Api(_) => (
                "api_error",
                "Enable debug logging and inspect the vendor response",
            ),
        };
        ErrorDescriptor {
            code,
            message: self.to_string(),
            hint,
        }
    }
}
