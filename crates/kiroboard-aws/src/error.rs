//! Error types for AWS calls

use thiserror::Error;

/// Error codes that mean "the resource is already there"
const ALREADY_EXISTS_CODES: &[&str] = &["ResourceExistsException", "AlreadyExistsException"];

/// Error codes AWS uses for throttling, whatever the HTTP status
const THROTTLING_CODES: &[&str] = &[
    "ThrottlingException",
    "Throttling",
    "ThrottledException",
    "TooManyRequestsException",
    "RequestLimitExceeded",
    "RequestThrottled",
    "RequestThrottledException",
];

/// Errors that can occur while talking to an AWS service
#[derive(Debug, Error)]
pub enum AwsError {
    /// The service answered with an error document
    #[error("{service} {operation} failed (HTTP {status}, {code}): {message}")]
    Service {
        service: &'static str,
        operation: String,
        status: u16,
        /// Service error code, e.g. `ResourceExistsException`
        code: String,
        message: String,
    },

    /// The request never produced a response
    #[error("{service} {operation} request failed: {source}")]
    Transport {
        service: &'static str,
        operation: String,
        #[source]
        source: anyhow::Error,
    },

    /// The response could not be decoded
    #[error("Failed to decode {service} {operation} response: {reason}")]
    Decode {
        service: &'static str,
        operation: String,
        reason: String,
    },

    /// Request signing failed
    #[error("Failed to sign {service} request: {reason}")]
    Signing {
        service: &'static str,
        reason: String,
    },

    /// No credentials could be resolved from the environment
    #[error("No AWS credentials available: {0}")]
    Credentials(String),
}

impl AwsError {
    /// Create a service error
    pub fn service(
        service: &'static str,
        operation: impl Into<String>,
        status: u16,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Service {
            service,
            operation: operation.into(),
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(
        service: &'static str,
        operation: impl Into<String>,
        source: anyhow::Error,
    ) -> Self {
        Self::Transport {
            service,
            operation: operation.into(),
            source,
        }
    }

    /// Create a decode error
    pub fn decode(
        service: &'static str,
        operation: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        Self::Decode {
            service,
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Service error code, if the service returned one
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Service { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }

    /// True when create failed because the resource already exists
    pub fn is_already_exists(&self) -> bool {
        self.code()
            .is_some_and(|code| ALREADY_EXISTS_CODES.contains(&code))
    }

    /// Throttling, HTTP 429/5xx and transport failures
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Service { status, code, .. } => {
                *status == 429 || *status >= 500 || THROTTLING_CODES.contains(&code.as_str())
            }
            Self::Transport { .. } => true,
            _ => false,
        }
    }
}

/// Result type alias for AwsError
pub type Result<T> = std::result::Result<T, AwsError>;
