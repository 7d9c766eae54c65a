use serde::{Deserialize, Serialize};

use super::{
    config::GeneratorConfig, error::GeneratorError, kv_cache::KvCache,
    mask::AttentionMaskArena, sampler,
};
use crate::{
    CancellationToken, DataType,
    executor::{
        error::ExecutorError,
        executor::{ExecutionProgress, TensorExecutor},
        io::ForwardPassInputs,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishReason {
    Stop,
    Length,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// The step budget was exhausted before the current forward pass
    /// completed; call `step` again on the next frame.
    Pending,
    Token(u32),
    Finished(FinishReason),
}

enum Phase {
    Forward {
        is_prefill: bool,
    },
    Finished(FinishReason),
}

/// One in-flight generation request. Single-pass and non-restartable: tokens
/// come out once, either through `step` or the `Iterator` impl. Every exit
/// path, including early drop by the consumer, releases the session's
/// key/value tensors and any scheduled pass inside the executor.
pub struct TextStream<'a> {
    executor: &'a mut dyn TensorExecutor,
    config: &'a GeneratorConfig,
    cancellation: CancellationToken,
    eos_token_id: u32,
    mask: AttentionMaskArena,
    past: Option<KvCache>,
    prompt_length: usize,
    sequence_length: usize,
    generated_tokens: Vec<u32>,
    phase: Phase,
    error: Option<GeneratorError>,
}

impl<'a> TextStream<'a> {
    pub(crate) fn new(
        executor: &'a mut dyn TensorExecutor,
        config: &'a GeneratorConfig,
        prompt_tokens: &[u32],
        eos_token_id: u32,
        cancellation: CancellationToken,
    ) -> Result<Self, GeneratorError> {
        if prompt_tokens.is_empty() {
            return Err(GeneratorError::EmptyPrompt);
        }

        let mut mask = AttentionMaskArena::new(config.mask_capacity());
        mask.mark_consumed(prompt_tokens.len());

        let past = KvCache::empty(executor);

        let mut stream = Self {
            executor,
            config,
            cancellation,
            eos_token_id,
            mask,
            past: Some(past),
            prompt_length: prompt_tokens.len(),
            sequence_length: 0,
            generated_tokens: Vec::new(),
            phase: Phase::Forward {
                is_prefill: true,
            },
            error: None,
        };
        stream.schedule(prompt_tokens, 0)?;

        Ok(stream)
    }

    pub fn prompt_length(&self) -> usize {
        self.prompt_length
    }

    pub fn generated_tokens(&self) -> &[u32] {
        &self.generated_tokens
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        match self.phase {
            Phase::Finished(reason) => Some(reason),
            Phase::Forward {
                ..
            } => None,
        }
    }

    pub fn error(&self) -> Option<&GeneratorError> {
        self.error.as_ref()
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Advances generation by at most one step budget's worth of executor
    /// work. This is the cooperative suspension point: a frame-aligned host
    /// calls it once per frame and handles the returned event.
    pub fn step(&mut self) -> StreamEvent {
        let is_prefill = match self.phase {
            Phase::Finished(reason) => return StreamEvent::Finished(reason),
            Phase::Forward {
                is_prefill,
            } => is_prefill,
        };

        if self.cancellation.is_cancelled() {
            return StreamEvent::Finished(
                self.finish(FinishReason::Cancelled),
            );
        }

        let budget = if is_prefill {
            self.config.prefill_step_budget
        } else {
            self.config.decode_step_budget
        }
        .max(1);

        for _ in 0..budget {
            match self.executor.step() {
                Ok(ExecutionProgress::Pending) => {},
                Ok(ExecutionProgress::Complete) => {
                    return self.complete_forward();
                },
                Err(error) => {
                    return StreamEvent::Finished(self.fail(error.into()));
                },
            }
        }

        StreamEvent::Pending
    }

    fn schedule(
        &mut self,
        token_ids: &[u32],
        first_position: usize,
    ) -> Result<(), ExecutorError> {
        let token_count = token_ids.len();

        let ids: Vec<i64> = token_ids.iter().map(|&id| id as i64).collect();
        let mut input_ids =
            self.executor.create_array(&[1, token_count], DataType::I64);
        input_ids.copy_from_slice(&ids);

        let mask_prefix = self.mask.prefix();
        let mut attention_mask = self
            .executor
            .create_array(&[1, mask_prefix.len()], DataType::I64);
        attention_mask.copy_from_slice(mask_prefix);

        let positions: Vec<i64> = (0..token_count)
            .map(|offset| (first_position + offset) as i64)
            .collect();
        let mut position_ids =
            self.executor.create_array(&[1, token_count], DataType::I64);
        position_ids.copy_from_slice(&positions);

        let mut inputs =
            ForwardPassInputs::new(input_ids, attention_mask, position_ids);
        if let Some(past) = self.past.take() {
            past.move_into_inputs(&mut inputs);
        }

        self.executor.begin(inputs)?;
        self.sequence_length = first_position + token_count;
        Ok(())
    }

    fn complete_forward(&mut self) -> StreamEvent {
        let num_layers = self.executor.model_shape().num_layers;

        let mut outputs = match self.executor.take_outputs() {
            Ok(outputs) => outputs,
            Err(error) => {
                return StreamEvent::Finished(self.fail(error.into()));
            },
        };

        let logits = match outputs.take_logits() {
            Ok(logits) => logits,
            Err(error) => {
                return StreamEvent::Finished(self.fail(error.into()));
            },
        };
        let token = sampler::sample_last_position(&logits);

        match KvCache::from_outputs(&mut outputs, num_layers) {
            Ok(past) => {
                assert_eq!(
                    past.sequence_length(),
                    self.sequence_length,
                    "Key/value cache is out of sync with consumed tokens"
                );
                self.past = Some(past);
            },
            Err(error) => {
                return StreamEvent::Finished(self.fail(error.into()));
            },
        }

        if token == self.eos_token_id {
            return StreamEvent::Finished(self.finish(FinishReason::Stop));
        }

        self.generated_tokens.push(token);

        if self.generated_tokens.len() >= self.config.max_new_tokens {
            self.finish(FinishReason::Length);
            return StreamEvent::Token(token);
        }

        self.mask.mark_consumed(1);
        let next_position = self.sequence_length;
        if let Err(error) = self.schedule(&[token], next_position) {
            self.fail(error.into());
            return StreamEvent::Token(token);
        }

        self.phase = Phase::Forward {
            is_prefill: false,
        };
        StreamEvent::Token(token)
    }

    fn fail(
        &mut self,
        error: GeneratorError,
    ) -> FinishReason {
        log::error!("Generation failed: {error}");
        self.error = Some(error);
        self.finish(FinishReason::Failed)
    }

    fn finish(
        &mut self,
        reason: FinishReason,
    ) -> FinishReason {
        self.past = None;
        self.executor.reset();
        self.phase = Phase::Finished(reason);
        reason
    }
}

impl Iterator for TextStream<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        loop {
            match self.step() {
                StreamEvent::Pending => {},
                StreamEvent::Token(token) => return Some(token),
                StreamEvent::Finished(_) => return None,
            }
        }
    }
}

impl Drop for TextStream<'_> {
    fn drop(&mut self) {
        if !matches!(self.phase, Phase::Finished(_)) {
            self.past = None;
            self.executor.reset();
        }
    }
}
