use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Twitter API error: {0}")]
    TwitterApi(#[from] TwitterApiError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Giving up after {failures} failed requests (threshold {threshold})")]
    FailureBudgetExhausted { failures: u32, threshold: u32 },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

#[derive(Error, Debug, Clone)]
pub enum TwitterApiError {
    #[error("API structure for {context} appears to have changed")]
    Schema { context: String },

    #[error("Guest token could not be retrieved: {reason}")]
    Bootstrap { reason: String },

    #[error("Rate limit exceeded. Retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Guest token rejected")]
    InvalidToken,

    #[error("Forbidden access to resource: {resource}")]
    Forbidden { resource: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Server error: {status_code}")]
    ServerError { status_code: u16 },

    #[error("Unexpected HTTP status: {status_code}")]
    UnexpectedStatus { status_code: u16 },

    #[error("Request timeout")]
    RequestTimeout,
}

impl TwitterApiError {
    pub fn schema(context: impl Into<String>) -> Self {
        TwitterApiError::Schema {
            context: context.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to encode record: {0}")]
    Encode(#[from] postcard::Error),

    #[error("Record of {len} bytes does not fit in a frame")]
    RecordTooLarge { len: usize },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
