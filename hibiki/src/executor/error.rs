#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("no text generation backend is available")]
    NotAvailable,
    #[error("a forward pass is already scheduled")]
    AlreadyScheduled,
    #[error("no forward pass is scheduled")]
    NothingScheduled,
    #[error("the scheduled forward pass has not completed")]
    NotComplete,
    #[error("missing required tensor `{0}`")]
    MissingTensor(String),
    #[error("forward pass execution failed: {0}")]
    ExecutionFailed(String),
}
