use reelsmith_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("generation cancelled")]
    Cancelled,

    #[error("generation failed: {0}")]
    Failed(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, GenerateError>;
