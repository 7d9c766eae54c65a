use std::rc::Rc;

use super::{
    allocation::AllocationStats,
    error::ExecutorError,
    io::{ForwardPassInputs, ForwardPassOutputs},
    model_shape::ModelShape,
};
use crate::{Array, DataType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionProgress {
    Pending,
    Complete,
}

/// Steps a transformer-style model over named tensors. One forward pass may
/// be in flight per executor; callers drive it with `step` so a single pass
/// can be spread over several host frames.
pub trait TensorExecutor {
    fn model_shape(&self) -> ModelShape;

    fn allocation_stats(&self) -> Rc<AllocationStats>;

    fn create_array(
        &self,
        shape: &[usize],
        data_type: DataType,
    ) -> Array {
        Array::tracked(shape, data_type, &self.allocation_stats())
    }

    fn is_ready(&self) -> bool;

    /// Takes ownership of the inputs and schedules a forward pass over them.
    fn begin(
        &mut self,
        inputs: ForwardPassInputs,
    ) -> Result<(), ExecutorError>;

    /// Advances the scheduled pass by one internal execution step.
    fn step(&mut self) -> Result<ExecutionProgress, ExecutorError>;

    /// Hands back the named outputs of a completed pass and releases the
    /// pass's inputs.
    fn take_outputs(&mut self) -> Result<ForwardPassOutputs, ExecutorError>;

    /// Drops any in-flight pass along with its inputs.
    fn reset(&mut self);
}
