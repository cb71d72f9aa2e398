//! Turn configuration.
//!
//! Loading from files or the environment belongs to the embedding
//! application; this crate only consumes the resolved values.

/// Configuration for one logical turn.
#[derive(Debug, Clone)]
pub struct TurnConfig {
    /// Fast routing model used by the tool-enabled intent pass.
    pub intent_model: String,
    /// Fuller model used for the user-facing response pass.
    pub response_model: String,
    /// Upper bound on call→dispatch→call iterations in the intent pass.
    pub max_intent_iterations: usize,
    /// Per-model-call timeout.
    pub model_timeout_ms: u64,
    /// Per-tool-call timeout.
    pub tool_timeout_ms: u64,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            intent_model: String::new(),
            response_model: String::new(),
            max_intent_iterations: 4,
            model_timeout_ms: 120_000,
            tool_timeout_ms: 30_000,
        }
    }
}

impl TurnConfig {
    pub fn new(intent_model: impl Into<String>, response_model: impl Into<String>) -> Self {
        Self {
            intent_model: intent_model.into(),
            response_model: response_model.into(),
            ..Self::default()
        }
    }

    pub fn with_max_intent_iterations(mut self, max: usize) -> Self {
        self.max_intent_iterations = max;
        self
    }

    pub fn with_model_timeout_ms(mut self, ms: u64) -> Self {
        self.model_timeout_ms = ms;
        self
    }

    pub fn with_tool_timeout_ms(mut self, ms: u64) -> Self {
        self.tool_timeout_ms = ms;
        self
    }
}
