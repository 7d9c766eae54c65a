#[derive(Debug, Clone, Copy)]
pub struct ModelShape {
    pub num_layers: usize,
    pub num_key_value_heads: usize,
    pub head_dim: usize,
    pub vocab_size: usize,
}

impl ModelShape {
    /// [1, num_key_value_heads, sequence_length, head_dim]
    pub fn kv_layer_shape(
        &self,
        sequence_length: usize,
    ) -> [usize; 4] {
        [1, self.num_key_value_heads, sequence_length, self.head_dim]
    }

    /// [1, suffix_length, vocab_size]
    pub fn logits_shape(
        &self,
        suffix_length: usize,
    ) -> [usize; 3] {
        [1, suffix_length, self.vocab_size]
    }
}
