use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerdError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid input for {field}: {message}")]
    InvalidInput { field: String, message: String },

    #[error("Security error: {message}")]
    Security { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LedgerdError>;
pub type LedgerdResult<T> = std::result::Result<T, LedgerdError>;
