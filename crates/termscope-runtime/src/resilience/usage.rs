//! Token accounting for model calls made while serving one request.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::providers::TokenUsage;

/// Accumulated LLM usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmUsage {
    pub total_tokens: u32,

    pub prompt_tokens: u32,

    pub completion_tokens: u32,

    /// Tokens spent by the URL retrieval tool
    pub tool_tokens: u32,

    /// Prompt tokens served from cache
    pub cache_read_tokens: u32,

    /// Number of model calls made, retries included
    pub llm_calls: u32,

    /// Estimated cost in USD
    pub estimated_cost: f64,
}

impl LlmUsage {
    /// Add token usage from a provider response.
    pub fn add(&mut self, usage: &TokenUsage, model: &str) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(usage.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(usage.completion_tokens);
        self.tool_tokens = self.tool_tokens.saturating_add(usage.tool_tokens);
        self.cache_read_tokens = self.cache_read_tokens.saturating_add(usage.cache_read_tokens);
        self.total_tokens = self.total_tokens.saturating_add(usage.total());
        self.llm_calls = self.llm_calls.saturating_add(1);
        self.estimated_cost += Self::estimate_cost(usage, model);
    }

    /// Count a call that returned no usage (timeout, transport failure).
    pub fn add_failed_call(&mut self) {
        self.llm_calls = self.llm_calls.saturating_add(1);
    }

    fn estimate_cost(usage: &TokenUsage, model: &str) -> f64 {
        // USD per million tokens: (input, output, cached input)
        let (input_rate, output_rate, cache_read_rate) = match model {
            m if m.contains("flash-lite") => (0.10, 0.40, 0.025),
            m if m.contains("2.5-flash") => (0.30, 2.50, 0.075),
            m if m.contains("2.5-pro") => (1.25, 10.0, 0.31),
            m if m.contains("2.0-flash") => (0.10, 0.40, 0.025),
            _ => (0.30, 2.50, 0.075),
        };

        let cached = usage.cache_read_tokens.min(usage.prompt_tokens);
        let uncached_input = (usage.prompt_tokens - cached) as f64 + usage.tool_tokens as f64;

        (uncached_input / 1_000_000.0) * input_rate
            + (usage.completion_tokens as f64 / 1_000_000.0) * output_rate
            + (cached as f64 / 1_000_000.0) * cache_read_rate
    }
}

/// Thread-safe accumulator for one request.
#[derive(Debug, Default)]
pub struct UsageTracker {
    usage: Mutex<LlmUsage>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, usage: &TokenUsage, model: &str) {
        self.usage.lock().add(usage, model);
    }

    pub fn record_failure(&self) {
        self.usage.lock().add_failed_call();
    }

    pub fn snapshot(&self) -> LlmUsage {
        self.usage.lock().clone()
    }
}
