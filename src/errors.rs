use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("MISSING_DATA: {0}")]
    MissingData(String),
    #[error("DECODE_FAILURE: {0}")]
    Decode(String),
    #[error("QUERY_FAILURE: {0}")]
    Query(String),
    #[error("CONFIG_INVALID: {0}")]
    Config(String),
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl AppError {
    /// Message without the taxonomy prefix, for the dashboard status line.
    pub fn detail(&self) -> &str {
        match self {
            Self::MissingData(detail)
            | Self::Decode(detail)
            | Self::Query(detail)
            | Self::Config(detail)
            | Self::Io(detail)
            | Self::Internal(detail) => detail,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Query(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Config(value.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
