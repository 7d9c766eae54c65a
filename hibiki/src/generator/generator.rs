use std::rc::Rc;

use super::{
    config::GeneratorConfig, error::GeneratorError, stream::TextStream,
};
use crate::{
    CancellationToken,
    executor::{allocation::AllocationStats, executor::TensorExecutor},
};

/// Drives a transformer-style model through prefill and decode over an
/// external tensor executor. One generator owns one executor; the mutable
/// borrow held by `TextStream` keeps sessions strictly sequential.
pub struct TextGenerator {
    pub config: GeneratorConfig,
    executor: Box<dyn TensorExecutor>,
}

impl TextGenerator {
    pub fn new(
        executor: Box<dyn TensorExecutor>,
        config: GeneratorConfig,
    ) -> Self {
        Self {
            config,
            executor,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.executor.is_ready()
    }

    pub fn allocation_stats(&self) -> Rc<AllocationStats> {
        self.executor.allocation_stats()
    }

    /// Starts one generation session over the prompt tokens. Prompts longer
    /// than the configured cap keep only their trailing tokens.
    pub fn stream(
        &mut self,
        prompt_tokens: Vec<u32>,
        eos_token_id: u32,
        cancellation: CancellationToken,
    ) -> Result<TextStream<'_>, GeneratorError> {
        if !self.executor.is_ready() {
            return Err(GeneratorError::ExecutorNotAvailable);
        }

        let prompt = self.config.truncate_prompt(prompt_tokens);
        TextStream::new(
            self.executor.as_mut(),
            &self.config,
            &prompt,
            eos_token_id,
            cancellation,
        )
    }
}
