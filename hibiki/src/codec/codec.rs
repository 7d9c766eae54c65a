#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("unable to load tokenizer")]
    UnableToLoadTokenizer,
    #[error("unable to encode text")]
    UnableToEncodeText,
    #[error("unable to decode tokens")]
    UnableToDecodeTokens,
    #[error("unknown end-of-sequence token `{0}`")]
    UnknownEosToken(String),
}

/// Text to token-id conversion boundary. The generation engine never looks
/// inside tokens; everything textual goes through this trait.
pub trait TokenCodec {
    fn encode(
        &self,
        text: &str,
    ) -> Result<Vec<u32>, CodecError>;

    fn decode(
        &self,
        token_ids: &[u32],
    ) -> Result<String, CodecError>;

    fn eos_token_id(&self) -> u32;
}
