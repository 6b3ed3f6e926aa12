use crate::error::*;
use tracing::{error, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    /// Recoverable by counting the failure and carrying on with an empty result.
    fn is_transport(&self) -> bool;
    /// Must terminate the process.
    fn is_fatal(&self) -> bool;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::TwitterApi(e) => {
                error!("Twitter API error details: {:?}", e);
            }
            CoreError::Storage(e) => {
                error!("Storage error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        self
    }

    fn is_transport(&self) -> bool {
        match self {
            CoreError::TwitterApi(e) => e.is_transport(),
            CoreError::Network(_) => true,
            _ => false,
        }
    }

    fn is_fatal(&self) -> bool {
        match self {
            CoreError::TwitterApi(e) => e.is_fatal(),
            CoreError::Network(_) => false,
            CoreError::Internal { .. } => false,
            _ => true,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::TwitterApi(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Storage(_) | CoreError::Io(_) => {
                "Could not access the post store. Check the store path and permissions."
                    .to_string()
            }
            CoreError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            CoreError::FailureBudgetExhausted { failures, .. } => format!(
                "Stopped after {} failed requests. The platform may be blocking guest access.",
                failures
            ),
            _ => "An unexpected error occurred.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::TwitterApi(e) => e.error_code(),
            CoreError::Storage(_) => "STORAGE".to_string(),
            CoreError::Config(e) => e.error_code(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::FailureBudgetExhausted { .. } => "FAILURE_BUDGET_EXHAUSTED".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
        }
    }
}

impl ErrorExt for TwitterApiError {
    fn log_error(&self) -> &Self {
        error!("TwitterApiError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("TwitterApiError (warning): {}", self);
        self
    }

    fn is_transport(&self) -> bool {
        matches!(
            self,
            TwitterApiError::RateLimitExceeded { .. }
                | TwitterApiError::InvalidToken
                | TwitterApiError::Forbidden { .. }
                | TwitterApiError::NotFound { .. }
                | TwitterApiError::ServerError { .. }
                | TwitterApiError::UnexpectedStatus { .. }
                | TwitterApiError::RequestTimeout
        )
    }

    fn is_fatal(&self) -> bool {
        matches!(
            self,
            TwitterApiError::Schema { .. } | TwitterApiError::Bootstrap { .. }
        )
    }

    fn user_friendly_message(&self) -> String {
        match self {
            TwitterApiError::Schema { context } => format!(
                "The response format for {} changed. This client needs an update.",
                context
            ),
            TwitterApiError::Bootstrap { .. } => {
                "Could not start a guest session with Twitter.".to_string()
            }
            TwitterApiError::RateLimitExceeded { retry_after } => format!(
                "Too many requests. Please wait {} seconds before trying again.",
                retry_after
            ),
            TwitterApiError::InvalidToken => {
                "The guest token was rejected. Restart to obtain a new one.".to_string()
            }
            TwitterApiError::RequestTimeout => {
                "Request to Twitter timed out. Please try again.".to_string()
            }
            _ => "Twitter API error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            TwitterApiError::Schema { .. } => "TWITTER_SCHEMA".to_string(),
            TwitterApiError::Bootstrap { .. } => "TWITTER_BOOTSTRAP".to_string(),
            TwitterApiError::RateLimitExceeded { .. } => "TWITTER_RATE_LIMIT".to_string(),
            TwitterApiError::InvalidToken => "TWITTER_INVALID_TOKEN".to_string(),
            TwitterApiError::Forbidden { .. } => "TWITTER_FORBIDDEN".to_string(),
            TwitterApiError::NotFound { .. } => "TWITTER_NOT_FOUND".to_string(),
            TwitterApiError::ServerError { .. } => "TWITTER_SERVER_ERROR".to_string(),
            TwitterApiError::UnexpectedStatus { .. } => "TWITTER_UNEXPECTED_STATUS".to_string(),
            TwitterApiError::RequestTimeout => "TWITTER_TIMEOUT".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ConfigError (warning): {}", self);
        self
    }

    fn is_transport(&self) -> bool {
        false
    }

    fn is_fatal(&self) -> bool {
        true
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file '{}' not found.", path)
            }
            ConfigError::MissingField { field } => {
                format!("Required configuration field '{}' is missing.", field)
            }
            ConfigError::InvalidValue { field, .. } => {
                format!("Invalid value for configuration field '{}'.", field)
            }
            ConfigError::Parse(_) => {
                "Configuration file format is invalid. Please check the settings.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}
