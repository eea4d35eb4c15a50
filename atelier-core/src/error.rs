#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// A form value outside its allowed range, or an empty prompt.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Anything that went wrong once the request reached the model: the model
    /// call itself, an incomplete batch, or writing the artifacts.
    #[error("Generation failed: {0:#}")]
    Failed(#[from] anyhow::Error),
}

pub type GenerationResult<T> = Result<T, GenerationError>;
