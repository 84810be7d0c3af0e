use thiserror::Error;

pub type Result<T> = std::result::Result<T, PumpError>;

#[derive(Debug, Error)]
pub enum PumpError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Authentication required")]
    AuthRequired,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for PumpError {
    fn from(err: reqwest::Error) -> Self {
        PumpError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for PumpError {
    fn from(err: serde_json::Error) -> Self {
        PumpError::Parse(err.to_string())
    }
}
