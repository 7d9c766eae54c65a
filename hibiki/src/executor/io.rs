use std::collections::HashMap;

use super::error::ExecutorError;
use crate::Array;

pub const INPUT_IDS: &str = "input_ids";
pub const ATTENTION_MASK: &str = "attention_mask";
pub const POSITION_IDS: &str = "position_ids";
pub const LOGITS: &str = "logits";

pub fn past_key_name(layer: usize) -> String {
    format!("past_key_values.{layer}.key")
}

pub fn past_value_name(layer: usize) -> String {
    format!("past_key_values.{layer}.value")
}

pub fn present_key_name(layer: usize) -> String {
    format!("present.{layer}.key")
}

pub fn present_value_name(layer: usize) -> String {
    format!("present.{layer}.value")
}

/// Name-keyed tensors for one forward pass. The executor takes ownership of
/// every input; they are released when the pass completes or is reset.
pub struct ForwardPassInputs {
    tensors: HashMap<String, Array>,
}

impl ForwardPassInputs {
    pub fn new(
        input_ids: Array,
        attention_mask: Array,
        position_ids: Array,
    ) -> Self {
        let mut tensors = HashMap::new();
        tensors.insert(INPUT_IDS.to_string(), input_ids);
        tensors.insert(ATTENTION_MASK.to_string(), attention_mask);
        tensors.insert(POSITION_IDS.to_string(), position_ids);
        Self {
            tensors,
        }
    }

    pub fn insert_past(
        &mut self,
        layer: usize,
        keys: Array,
        values: Array,
    ) {
        self.tensors.insert(past_key_name(layer), keys);
        self.tensors.insert(past_value_name(layer), values);
    }

    pub fn get(
        &self,
        name: &str,
    ) -> Result<&Array, ExecutorError> {
        self.tensors
            .get(name)
            .ok_or_else(|| ExecutorError::MissingTensor(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}

pub struct ForwardPassOutputs {
    tensors: HashMap<String, Array>,
}

impl ForwardPassOutputs {
    pub fn new() -> Self {
        Self {
            tensors: HashMap::new(),
        }
    }

    pub fn insert(
        &mut self,
        name: String,
        array: Array,
    ) {
        self.tensors.insert(name, array);
    }

    pub fn take(
        &mut self,
        name: &str,
    ) -> Result<Array, ExecutorError> {
        self.tensors
            .remove(name)
            .ok_or_else(|| ExecutorError::MissingTensor(name.to_string()))
    }

    pub fn take_logits(&mut self) -> Result<Array, ExecutorError> {
        self.take(LOGITS)
    }

    pub fn take_present(
        &mut self,
        layer: usize,
    ) -> Result<(Array, Array), ExecutorError> {
        let keys = self.take(&present_key_name(layer))?;
        let values = self.take(&present_value_name(layer))?;
        Ok((keys, values))
    }
}

impl Default for ForwardPassOutputs {
    fn default() -> Self {
        Self::new()
    }
}
