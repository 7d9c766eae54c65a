use serde::{Deserialize, Serialize};

pub use crate::generator::stream::FinishReason;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StepStats {
    pub duration: f64,
    pub tokens_count: u64,
    pub tokens_per_second: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TotalStats {
    pub duration: f64,
    pub tokens_count_input: u64,
    pub tokens_count_output: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Stats {
    pub prefill_stats: Option<StepStats>,
    pub generate_stats: Option<StepStats>,
    pub total_stats: TotalStats,
}

#[derive(Debug, Clone)]
pub struct Output {
    pub text: String,
    pub stats: Stats,
    pub finish_reason: Option<FinishReason>,
}

impl Output {
    pub fn empty(finish_reason: Option<FinishReason>) -> Self {
        Self {
            text: String::new(),
            stats: Stats {
                prefill_stats: None,
                generate_stats: None,
                total_stats: TotalStats {
                    duration: 0.0,
                    tokens_count_input: 0,
                    tokens_count_output: 0,
                },
            },
            finish_reason,
        }
    }

    pub fn clone_with_finish_reason(
        &self,
        finish_reason: Option<FinishReason>,
    ) -> Self {
        Self {
            text: self.text.clone(),
            stats: self.stats.clone(),
            finish_reason,
        }
    }
}
