//! Inference parameters and sampling normalization.
//!
//! Some models reject requests that carry both `temperature` and `top_p`.
//! [`InferenceConfig`] remembers which of the two the caller supplied and
//! [`InferenceConfig::sampling`] picks the single one that goes on the wire.

use crate::types::MessageCreateParams;

/// Default maximum tokens per response.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Generation parameters applied to every request.
///
/// `None` means "not supplied by the caller"; the service default applies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceConfig {
    /// Maximum tokens per response.
    pub max_tokens: u32,
    /// Sampling temperature, if supplied.
    pub temperature: Option<f32>,
    /// Nucleus sampling cutoff, if supplied.
    pub top_p: Option<f32>,
}

/// The one sampling parameter that is sent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sampling {
    /// Neither was supplied; send nothing.
    ServiceDefault,
    /// Send `temperature` only.
    Temperature(f32),
    /// Send `top_p` only.
    TopP(f32),
}

impl InferenceConfig {
    /// Creates a config with the default token limit and no sampling overrides.
    pub fn new() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
            top_p: None,
        }
    }

    /// Sets the maximum tokens per response.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the top-p value.
    pub fn with_top_p(mut self, top_p: Option<f32>) -> Self {
        self.top_p = top_p;
        self
    }

    /// Chooses at most one sampling parameter.  Temperature wins a tie.
    pub fn sampling(&self) -> Sampling {
        match (self.temperature, self.top_p) {
            (Some(t), _) => Sampling::Temperature(t),
            (None, Some(p)) => Sampling::TopP(p),
            (None, None) => Sampling::ServiceDefault,
        }
    }

    /// The warning to surface when both parameters were supplied.
    pub fn sampling_conflict(&self) -> Option<String> {
        match (self.temperature, self.top_p) {
            (Some(t), Some(p)) => Some(format!(
                "both temperature ({t}) and top_p ({p}) were set; sending temperature only"
            )),
            _ => None,
        }
    }

    /// Applies max tokens and the chosen sampling parameter to a request.
    pub fn apply(&self, mut params: MessageCreateParams) -> MessageCreateParams {
        params.max_tokens = self.max_tokens;
        params.temperature = None;
        params.top_p = None;
        match self.sampling() {
            Sampling::ServiceDefault => params,
            Sampling::Temperature(t) => params.with_temperature(t),
            Sampling::TopP(p) => params.with_top_p(p),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_send_no_sampling() {
        let config = InferenceConfig::new();
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(config.sampling(), Sampling::ServiceDefault);
        assert!(config.sampling_conflict().is_none());
    }

    #[test]
    fn single_parameter_passes_through() {
        let t = InferenceConfig::new().with_temperature(Some(0.3));
        assert_eq!(t.sampling(), Sampling::Temperature(0.3));
        let p = InferenceConfig::new().with_top_p(Some(0.9));
        assert_eq!(p.sampling(), Sampling::TopP(0.9));
        assert!(p.sampling_conflict().is_none());
    }

    #[test]
    fn temperature_wins_when_both_supplied() {
        let config = InferenceConfig::new()
            .with_temperature(Some(0.2))
            .with_top_p(Some(0.8));
        assert_eq!(config.sampling(), Sampling::Temperature(0.2));
        assert!(config.sampling_conflict().unwrap().contains("temperature only"));

        let params = config.apply(MessageCreateParams::new(1, vec![], "m"));
        assert_eq!(params.temperature, Some(0.2));
        assert_eq!(params.top_p, None);
    }

    #[test]
    fn apply_sets_max_tokens() {
        let config = InferenceConfig::new().with_max_tokens(128).with_top_p(Some(0.5));
        let params = config.apply(MessageCreateParams::new(1, vec![], "m"));
        assert_eq!(params.max_tokens, 128);
        assert_eq!(params.top_p, Some(0.5));
        assert_eq!(params.temperature, None);
    }
}
