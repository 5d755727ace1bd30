use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Information about a catalog model.
///
/// Besides the identity fields, the catalog advertises what a model can do.
/// The chat engine only talks to models that produce text and support
/// response streaming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Unique model identifier.
    pub id: String,

    /// RFC 3339 datetime string representing the time at which the model was released.
    ///
    /// May be set to an epoch value if the release date is unknown.
    #[serde(rename = "created_at", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// A human-readable name for the model.
    #[serde(rename = "display_name")]
    pub display_name: String,

    /// Object type.
    ///
    /// For Models, this is always `"model"`.
    #[serde(rename = "type")]
    pub r#type: ModelType,

    /// Advertised capabilities.  Absent capabilities count as unsupported.
    #[serde(default)]
    pub capabilities: ModelCapabilities,
}

/// Type of the model object.
///
/// For model objects, this is always "model".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    /// Model type
    Model,
}

/// What a catalog model advertises it can do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCapabilities {
    /// Output modalities the model can produce.
    #[serde(default)]
    pub output_modalities: Vec<Modality>,

    /// Whether the model can stream its response.
    #[serde(default)]
    pub response_streaming_supported: bool,
}

/// An input or output modality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    /// Plain text.
    Text,
    /// Images.
    Image,
    /// Embedding vectors.
    Embedding,
    /// Anything this crate does not know about.
    #[serde(other)]
    Other,
}

impl ModelInfo {
    /// True when the model produces text output.
    pub fn outputs_text(&self) -> bool {
        self.capabilities
            .output_modalities
            .iter()
            .any(|m| *m == Modality::Text)
    }

    /// True when the model supports response streaming.
    pub fn supports_streaming(&self) -> bool {
        self.capabilities.response_streaming_supported
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn model_info_deserialization() {
        let json = serde_json::json!({
            "id": "claude-haiku-4-5",
            "created_at": "2025-10-01T00:00:00Z",
            "display_name": "Claude Haiku 4.5",
            "type": "model",
            "capabilities": {
                "output_modalities": ["text"],
                "response_streaming_supported": true
            }
        });
        let model_info: ModelInfo = serde_json::from_value(json).unwrap();

        assert_eq!(model_info.id, "claude-haiku-4-5");
        assert_eq!(model_info.created_at, datetime!(2025-10-01 0:00:00 UTC));
        assert_eq!(model_info.display_name, "Claude Haiku 4.5");
        assert_eq!(model_info.r#type, ModelType::Model);
        assert!(model_info.outputs_text());
        assert!(model_info.supports_streaming());
    }

    #[test]
    fn missing_capabilities_are_unsupported() {
        let json = serde_json::json!({
            "id": "legacy",
            "created_at": "2024-01-01T00:00:00Z",
            "display_name": "Legacy",
            "type": "model"
        });
        let model_info: ModelInfo = serde_json::from_value(json).unwrap();
        assert!(!model_info.outputs_text());
        assert!(!model_info.supports_streaming());
    }

    #[test]
    fn unknown_modality_is_other() {
        let json = serde_json::json!({
            "output_modalities": ["text", "video"],
            "response_streaming_supported": false
        });
        let caps: ModelCapabilities = serde_json::from_value(json).unwrap();
        assert_eq!(caps.output_modalities, vec![Modality::Text, Modality::Other]);
    }
}
