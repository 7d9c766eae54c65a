use crate::executor::error::ExecutorError;

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("text generation backend is not available")]
    ExecutorNotAvailable,
    #[error("prompt encoded to zero tokens")]
    EmptyPrompt,
    #[error(transparent)]
    Executor(#[from] ExecutorError),
}
