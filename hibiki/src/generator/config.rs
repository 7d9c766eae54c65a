pub struct GeneratorConfig {
    /// Prompts longer than this keep only their trailing tokens.
    pub max_prompt_length: usize,
    pub max_new_tokens: usize,
    /// Executor steps consumed per `TextStream::step` call during prefill.
    pub prefill_step_budget: usize,
    /// Executor steps consumed per `TextStream::step` call during decode.
    pub decode_step_budget: usize,
}

impl GeneratorConfig {
    pub fn new(
        max_prompt_length: usize,
        max_new_tokens: usize,
        prefill_step_budget: usize,
        decode_step_budget: usize,
    ) -> Self {
        Self {
            max_prompt_length,
            max_new_tokens,
            prefill_step_budget,
            decode_step_budget,
        }
    }

    pub fn mask_capacity(&self) -> usize {
        self.max_prompt_length + self.max_new_tokens
    }

    /// Keeps the most recent tokens when the prompt exceeds the cap; the
    /// front of the prompt is dropped, never the tail.
    pub fn truncate_prompt(
        &self,
        mut tokens: Vec<u32>,
    ) -> Vec<u32> {
        if tokens.len() > self.max_prompt_length {
            tokens.split_off(tokens.len() - self.max_prompt_length)
        } else {
            tokens
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_prompt_length: 512,
            max_new_tokens: 256,
            prefill_step_budget: 4,
            decode_step_budget: 12,
        }
    }
}
