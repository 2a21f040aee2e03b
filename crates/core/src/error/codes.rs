use serde::{Deserialize, Serialize};
use std::fmt;

/// Standardized error codes for the abuse-detection engine.
/// Business-agnostic technical categories, grouped into numeric ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // General System Errors (1000-1999)
    InternalServerError = 1000,
    ConfigurationError = 1001,
    ServiceUnavailable = 1002,
    Timeout = 1003,
    ResourceExhausted = 1004,

    // Durable storage errors (2000-2999)
    EventLogWriteError = 2000,
    EventLogQueryError = 2001,
    BlockStoreIoError = 2002,
    SettingsStoreIoError = 2003,
    CampaignStoreIoError = 2004,

    // Network & external-service errors (3000-3999)
    NetworkError = 3000,
    NetworkTimeout = 3001,
    NetworkConnectionRefused = 3002,
    EnforcerUnavailable = 3003,
    SerializationError = 3004,

    // Input validation errors (5000-5999)
    ValidationFailed = 5000,
    InvalidInput = 5001,
    MissingRequiredField = 5002,
    InvalidFormat = 5003,
    ValueOutOfRange = 5004,

    // Resource errors (6000-6999)
    ResourceNotFound = 6000,
    ResourceAlreadyExists = 6001,

    // Rate limiting & throttling (7000-7999)
    RateLimitExceeded = 7000,
    TooManyRequests = 7001,
}

impl ErrorCode {
    /// Get HTTP status code for this error
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::InternalServerError
            | ErrorCode::ConfigurationError
            | ErrorCode::EventLogWriteError
            | ErrorCode::EventLogQueryError
            | ErrorCode::BlockStoreIoError
            | ErrorCode::SettingsStoreIoError
            | ErrorCode::CampaignStoreIoError
            | ErrorCode::NetworkError
            | ErrorCode::SerializationError => 500,

            ErrorCode::ServiceUnavailable
            | ErrorCode::NetworkConnectionRefused
            | ErrorCode::EnforcerUnavailable => 503,

            ErrorCode::Timeout | ErrorCode::NetworkTimeout => 408,

            ErrorCode::ValidationFailed
            | ErrorCode::InvalidInput
            | ErrorCode::MissingRequiredField
            | ErrorCode::InvalidFormat
            | ErrorCode::ValueOutOfRange => 400,

            ErrorCode::ResourceNotFound => 404,
            ErrorCode::ResourceAlreadyExists => 409,

            ErrorCode::RateLimitExceeded | ErrorCode::TooManyRequests => 429,
            ErrorCode::ResourceExhausted => 507,
        }
    }

    /// Get error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            ErrorCode::InternalServerError
            | ErrorCode::ConfigurationError
            | ErrorCode::ServiceUnavailable
            | ErrorCode::Timeout
            | ErrorCode::ResourceExhausted => "system",

            ErrorCode::EventLogWriteError
            | ErrorCode::EventLogQueryError
            | ErrorCode::BlockStoreIoError
            | ErrorCode::SettingsStoreIoError
            | ErrorCode::CampaignStoreIoError => "storage",

            ErrorCode::NetworkError
            | ErrorCode::NetworkTimeout
            | ErrorCode::NetworkConnectionRefused
            | ErrorCode::EnforcerUnavailable
            | ErrorCode::SerializationError => "network",

            ErrorCode::ValidationFailed
            | ErrorCode::InvalidInput
            | ErrorCode::MissingRequiredField
            | ErrorCode::InvalidFormat
            | ErrorCode::ValueOutOfRange => "validation",

            ErrorCode::ResourceNotFound | ErrorCode::ResourceAlreadyExists => "resource",

            ErrorCode::RateLimitExceeded | ErrorCode::TooManyRequests => "rate_limit",
        }
    }

    /// Check if error should be retried
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::NetworkTimeout
                | ErrorCode::NetworkConnectionRefused
                | ErrorCode::EnforcerUnavailable
                | ErrorCode::ServiceUnavailable
        )
    }

    /// Check if error should be logged at error level
    pub fn should_log_as_error(&self) -> bool {
        !matches!(
            self,
            ErrorCode::ValidationFailed
                | ErrorCode::InvalidInput
                | ErrorCode::MissingRequiredField
                | ErrorCode::InvalidFormat
                | ErrorCode::ValueOutOfRange
                | ErrorCode::ResourceNotFound
                | ErrorCode::RateLimitExceeded
                | ErrorCode::TooManyRequests
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
