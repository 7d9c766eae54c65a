#![allow(dead_code)]

use std::{cell::RefCell, rc::Rc};

use hibiki::{
    Array, DataType,
    codec::codec::{CodecError, TokenCodec},
    executor::{
        allocation::AllocationStats,
        error::ExecutorError,
        executor::{ExecutionProgress, TensorExecutor},
        io::{self, ForwardPassInputs, ForwardPassOutputs},
        model_shape::ModelShape,
    },
};

pub const EOS_TOKEN_ID: u32 = 2;

pub const TEST_SHAPE: ModelShape = ModelShape {
    num_layers: 2,
    num_key_value_heads: 4,
    head_dim: 8,
    vocab_size: 16,
};

/// Inputs of one scheduled forward pass, copied out for assertions.
pub struct CapturedPass {
    pub input_ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
    pub position_ids: Vec<i64>,
    pub past_sequence_length: usize,
}

struct PassState {
    inputs: ForwardPassInputs,
    remaining_steps: usize,
    suffix_length: usize,
    past_sequence_length: usize,
}

/// Scripted executor: pass `k` produces logits whose argmax is the `k`-th
/// scripted token (the last entry repeats). Each pass takes a configurable
/// number of internal steps, and every array handed out is tracked so tests
/// can assert allocation parity.
pub struct MockExecutor {
    shape: ModelShape,
    stats: Rc<AllocationStats>,
    script: Vec<u32>,
    steps_per_pass: usize,
    fail_begin_after: Option<usize>,
    state: Option<PassState>,
    passes_completed: usize,
    pub captured: Rc<RefCell<Vec<CapturedPass>>>,
}

impl MockExecutor {
    pub fn new(script: Vec<u32>) -> Self {
        assert!(!script.is_empty());
        Self {
            shape: TEST_SHAPE,
            stats: Rc::new(AllocationStats::default()),
            script,
            steps_per_pass: 1,
            fail_begin_after: None,
            state: None,
            passes_completed: 0,
            captured: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn with_steps_per_pass(
        mut self,
        steps_per_pass: usize,
    ) -> Self {
        assert!(steps_per_pass > 0);
        self.steps_per_pass = steps_per_pass;
        self
    }

    /// Makes `begin` fail once the given number of passes completed.
    pub fn with_fail_begin_after(
        mut self,
        passes: usize,
    ) -> Self {
        self.fail_begin_after = Some(passes);
        self
    }

    pub fn stats(&self) -> Rc<AllocationStats> {
        self.stats.clone()
    }

    fn scripted_token(&self) -> u32 {
        let index = self.passes_completed.min(self.script.len() - 1);
        self.script[index]
    }
}

impl TensorExecutor for MockExecutor {
    fn model_shape(&self) -> ModelShape {
        self.shape
    }

    fn allocation_stats(&self) -> Rc<AllocationStats> {
        self.stats.clone()
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn begin(
        &mut self,
        inputs: ForwardPassInputs,
    ) -> Result<(), ExecutorError> {
        if self.state.is_some() {
            return Err(ExecutorError::AlreadyScheduled);
        }
        if let Some(after) = self.fail_begin_after {
            if self.passes_completed >= after {
                return Err(ExecutorError::ExecutionFailed(
                    "scripted begin failure".to_string(),
                ));
            }
        }

        let input_ids = inputs.get(io::INPUT_IDS)?;
        let suffix_length = input_ids.shape()[1];
        let input_ids = input_ids.as_slice::<i64>().to_vec();
        let attention_mask =
            inputs.get(io::ATTENTION_MASK)?.as_slice::<i64>().to_vec();
        let position_ids =
            inputs.get(io::POSITION_IDS)?.as_slice::<i64>().to_vec();
        let past_sequence_length =
            inputs.get(&io::past_key_name(0))?.shape()[2];
        for layer in 0..self.shape.num_layers {
            inputs.get(&io::past_key_name(layer))?;
            inputs.get(&io::past_value_name(layer))?;
        }

        self.captured.borrow_mut().push(CapturedPass {
            input_ids,
            attention_mask,
            position_ids,
            past_sequence_length,
        });

        self.state = Some(PassState {
            inputs,
            remaining_steps: self.steps_per_pass,
            suffix_length,
            past_sequence_length,
        });
        Ok(())
    }

    fn step(&mut self) -> Result<ExecutionProgress, ExecutorError> {
        let state =
            self.state.as_mut().ok_or(ExecutorError::NothingScheduled)?;
        if state.remaining_steps > 1 {
            state.remaining_steps -= 1;
            Ok(ExecutionProgress::Pending)
        } else {
            state.remaining_steps = 0;
            Ok(ExecutionProgress::Complete)
        }
    }

    fn take_outputs(&mut self) -> Result<ForwardPassOutputs, ExecutorError> {
        let state = self.state.take().ok_or(ExecutorError::NothingScheduled)?;
        if state.remaining_steps > 0 {
            self.state = Some(state);
            return Err(ExecutorError::NotComplete);
        }

        let token = self.scripted_token();
        let mut outputs = ForwardPassOutputs::new();

        let logits_shape = self.shape.logits_shape(state.suffix_length);
        let mut logits = Array::tracked(&logits_shape, DataType::F32, &self.stats);
        {
            let values = logits.as_slice_mut::<f32>();
            let last_row_start =
                (state.suffix_length - 1) * self.shape.vocab_size;
            values[last_row_start + token as usize] = 1.0;
        }
        outputs.insert(io::LOGITS.to_string(), logits);

        let present_length =
            state.past_sequence_length + state.suffix_length;
        let kv_shape = self.shape.kv_layer_shape(present_length);
        for layer in 0..self.shape.num_layers {
            outputs.insert(
                io::present_key_name(layer),
                Array::tracked(&kv_shape, DataType::F32, &self.stats),
            );
            outputs.insert(
                io::present_value_name(layer),
                Array::tracked(&kv_shape, DataType::F32, &self.stats),
            );
        }

        // Inputs (including the previous key/value tensors) release here.
        drop(state.inputs);
        self.passes_completed += 1;
        Ok(outputs)
    }

    fn reset(&mut self) {
        self.state = None;
    }
}

/// Codec that ignores input text and returns a fixed token sequence, and
/// decodes ids as `<id>` markers. Captures encoded text for assertions.
pub struct ScriptedCodec {
    pub tokens: Vec<u32>,
    pub encoded_texts: Rc<RefCell<Vec<String>>>,
}

impl ScriptedCodec {
    pub fn new(tokens: Vec<u32>) -> Self {
        Self {
            tokens,
            encoded_texts: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl TokenCodec for ScriptedCodec {
    fn encode(
        &self,
        text: &str,
    ) -> Result<Vec<u32>, CodecError> {
        self.encoded_texts.borrow_mut().push(text.to_string());
        Ok(self.tokens.clone())
    }

    fn decode(
        &self,
        token_ids: &[u32],
    ) -> Result<String, CodecError> {
        Ok(token_ids.iter().map(|id| format!("<{id}>")).collect())
    }

    fn eos_token_id(&self) -> u32 {
        EOS_TOKEN_ID
    }
}
