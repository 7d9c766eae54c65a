use std::rc::Rc;

use super::{
    allocation::AllocationStats,
    error::ExecutorError,
    executor::{ExecutionProgress, TensorExecutor},
    io::{ForwardPassInputs, ForwardPassOutputs},
    model_shape::ModelShape,
};

/// Stand-in executor for builds without an inference backend. Every
/// scheduling call fails fast so the session can degrade to an empty output
/// instead of compiling the generation path out.
pub struct NotAvailableExecutor {
    stats: Rc<AllocationStats>,
}

impl NotAvailableExecutor {
    pub fn new() -> Self {
        Self {
            stats: Rc::new(AllocationStats::default()),
        }
    }
}

impl Default for NotAvailableExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl TensorExecutor for NotAvailableExecutor {
    fn model_shape(&self) -> ModelShape {
        ModelShape {
            num_layers: 0,
            num_key_value_heads: 0,
            head_dim: 0,
            vocab_size: 0,
        }
    }

    fn allocation_stats(&self) -> Rc<AllocationStats> {
        self.stats.clone()
    }

    fn is_ready(&self) -> bool {
        false
    }

    fn begin(
        &mut self,
        _inputs: ForwardPassInputs,
    ) -> Result<(), ExecutorError> {
        Err(ExecutorError::NotAvailable)
    }

    fn step(&mut self) -> Result<ExecutionProgress, ExecutorError> {
        Err(ExecutorError::NotAvailable)
    }

    fn take_outputs(&mut self) -> Result<ForwardPassOutputs, ExecutorError> {
        Err(ExecutorError::NotAvailable)
    }

    fn reset(&mut self) {}
}
