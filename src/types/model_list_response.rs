use serde::{Deserialize, Serialize};

use crate::types::ModelInfo;

/// One page of the model catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelListResponse {
    /// Models on this page.
    pub data: Vec<ModelInfo>,

    /// Indicates whether there are more results available.
    pub has_more: bool,

    /// The ID of the first object in the current page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_id: Option<String>,

    /// The ID of the last object in the current page.
    ///
    /// Pass it as `after_id` to fetch the next page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_id: Option<String>,
}

impl ModelListResponse {
    /// Create a new `ModelListResponse`.
    pub fn new(
        data: Vec<ModelInfo>,
        has_more: bool,
        first_id: Option<String>,
        last_id: Option<String>,
    ) -> Self {
        Self {
            data,
            has_more,
            first_id,
            last_id,
        }
    }

    /// Get the list of models.
    pub fn models(&self) -> &[ModelInfo] {
        &self.data
    }

    /// Check if there are more results available.
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Get the last model ID for pagination.
    pub fn last_id(&self) -> Option<&str> {
        self.last_id.as_deref()
    }
}
