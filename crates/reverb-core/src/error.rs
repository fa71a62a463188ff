use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReverbError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Health check error: {0}")]
    HealthCheck(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Event bus error: {0}")]
    EventBus(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReverbError>;
