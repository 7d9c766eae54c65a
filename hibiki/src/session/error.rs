use crate::{codec::codec::CodecError, generator::error::GeneratorError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("text generation backend is not available")]
    GeneratorNotReady,
    #[error("unable to load prompt template")]
    UnableToLoadPromptTemplate,
    #[error("unable to render prompt template")]
    UnableToRenderPromptTemplate,
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Generator(#[from] GeneratorError),
}
