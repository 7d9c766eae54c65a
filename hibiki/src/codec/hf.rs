use std::path::Path;

use tokenizers::Tokenizer;

use super::codec::{CodecError, TokenCodec};

/// `tokenizers`-backed codec loaded from a `tokenizer.json` file.
pub struct HfTokenCodec {
    tokenizer: Tokenizer,
    eos_token_id: u32,
}

impl HfTokenCodec {
    pub fn from_file(
        path: &Path,
        eos_token: &str,
    ) -> Result<Self, CodecError> {
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|_| CodecError::UnableToLoadTokenizer)?;
        Self::new(tokenizer, eos_token)
    }

    pub fn new(
        tokenizer: Tokenizer,
        eos_token: &str,
    ) -> Result<Self, CodecError> {
        let eos_token_id = tokenizer
            .token_to_id(eos_token)
            .ok_or_else(|| CodecError::UnknownEosToken(eos_token.to_string()))?;

        Ok(Self {
            tokenizer,
            eos_token_id,
        })
    }
}

impl TokenCodec for HfTokenCodec {
    fn encode(
        &self,
        text: &str,
    ) -> Result<Vec<u32>, CodecError> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|_| CodecError::UnableToEncodeText)?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode(
        &self,
        token_ids: &[u32],
    ) -> Result<String, CodecError> {
        self.tokenizer
            .decode(token_ids, true)
            .map_err(|_| CodecError::UnableToDecodeTokens)
    }

    fn eos_token_id(&self) -> u32 {
        self.eos_token_id
    }
}
