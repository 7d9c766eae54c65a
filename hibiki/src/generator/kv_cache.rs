use crate::{
    Array, DataType,
    executor::{
        error::ExecutorError,
        executor::TensorExecutor,
        io::{ForwardPassInputs, ForwardPassOutputs},
    },
};

pub struct KvCacheLayer {
    /// [1, num_key_value_heads, sequence_length, head_dim]
    pub keys: Array,
    /// [1, num_key_value_heads, sequence_length, head_dim]
    pub values: Array,
}

impl KvCacheLayer {
    pub fn sequence_length(&self) -> usize {
        self.keys.shape()[2]
    }
}

/// Per-layer attention state carried between forward passes. The cache is
/// exclusively owned by one generation session: each pass consumes the
/// current layers as `past_key_values.*` inputs and the session replaces
/// them wholesale from the pass's `present.*` outputs.
pub struct KvCache {
    layers: Vec<KvCacheLayer>,
}

impl KvCache {
    /// Fresh cache with a zero-length sequence dimension in every layer.
    pub fn empty(executor: &dyn TensorExecutor) -> Self {
        let model_shape = executor.model_shape();
        let layer_shape = model_shape.kv_layer_shape(0);
        let layers = (0..model_shape.num_layers)
            .map(|_| KvCacheLayer {
                keys: executor.create_array(&layer_shape, DataType::F32),
                values: executor.create_array(&layer_shape, DataType::F32),
            })
            .collect();

        Self {
            layers,
        }
    }

    pub fn from_outputs(
        outputs: &mut ForwardPassOutputs,
        num_layers: usize,
    ) -> Result<Self, ExecutorError> {
        let mut layers = Vec::with_capacity(num_layers);
        for layer in 0..num_layers {
            let (keys, values) = outputs.take_present(layer)?;
            layers.push(KvCacheLayer {
                keys,
                values,
            });
        }

        Ok(Self {
            layers,
        })
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn sequence_length(&self) -> usize {
        self.layers
            .first()
            .map(|layer| layer.sequence_length())
            .unwrap_or(0)
    }

    pub fn move_into_inputs(
        self,
        inputs: &mut ForwardPassInputs,
    ) {
        for (layer_index, layer) in self.layers.into_iter().enumerate() {
            inputs.insert_past(layer_index, layer.keys, layer.values);
        }
    }
}
