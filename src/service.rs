//! Seams between the chat engine and the remote service.
//!
//! [`crate::Client`] implements both traits over HTTP.  Tests substitute
//! scripted implementations.

use std::pin::Pin;

use futures::Stream;

use crate::error::Result;
use crate::inference::InferenceConfig;
use crate::models::ModelTarget;
use crate::types::{
    MessageCreateParams, MessageParam, ModelInfo, ModelListParams, ModelListResponse, StreamEvent,
};

/// The ordered event sequence for one completion request.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// Everything needed to ask for one assistant turn.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// The model to address.
    pub target: ModelTarget,
    /// Prior turns followed by the new user turn.
    pub messages: Vec<MessageParam>,
    /// Generation parameters.
    pub inference: InferenceConfig,
}

impl CompletionRequest {
    /// Creates a new request.
    pub fn new(target: ModelTarget, messages: Vec<MessageParam>, inference: InferenceConfig) -> Self {
        Self {
            target,
            messages,
            inference,
        }
    }

    /// Builds the wire body for this request.
    pub fn to_params(&self) -> MessageCreateParams {
        let params = MessageCreateParams::new(
            self.inference.max_tokens,
            self.messages.clone(),
            self.target.model_id(),
        );
        self.inference.apply(params)
    }
}

/// A remote streaming text-generation service.
#[async_trait::async_trait]
pub trait CompletionService: Send + Sync {
    /// Sends a request and returns its event stream.
    ///
    /// Errors returned here happen before any event was produced.
    async fn stream(&self, request: CompletionRequest) -> Result<EventStream>;
}

/// A remote catalog of models.
#[async_trait::async_trait]
pub trait ModelCatalog: Send + Sync {
    /// Looks up one model by catalog identifier.
    async fn get_model(&self, model_id: &str) -> Result<ModelInfo>;

    /// Lists one page of the catalog.
    async fn list_models(&self, params: Option<ModelListParams>) -> Result<ModelListResponse>;
}
