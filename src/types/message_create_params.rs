use serde::{Deserialize, Serialize};

use crate::types::MessageParam;

/// Request body for a streaming completion.
///
/// At most one of `temperature` and `top_p` is ever populated; see
/// [`crate::InferenceConfig::sampling`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageCreateParams {
    /// The model (catalog id or opaque reference) that will complete the prompt.
    pub model: String,

    /// Prior turns followed by the new user turn.
    pub messages: Vec<MessageParam>,

    /// The maximum number of tokens to generate before stopping.
    pub max_tokens: u32,

    /// Amount of randomness injected into the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Nucleus sampling cutoff.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Always `true` for requests issued by this crate.
    pub stream: bool,
}

impl MessageCreateParams {
    /// Create a new streaming request.
    pub fn new(max_tokens: u32, messages: Vec<MessageParam>, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens,
            temperature: None,
            top_p: None,
            stream: true,
        }
    }

    /// Set the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set top-p.
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }
}
