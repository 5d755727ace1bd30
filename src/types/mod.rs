// Public modules
pub mod message_create_params;
pub mod message_param;
pub mod message_stream_event;
pub mod model_info;
pub mod model_list_params;
pub mod model_list_response;
pub mod text_delta;

// Re-exports
pub use message_create_params::MessageCreateParams;
pub use message_param::{MessageParam, MessageRole};
pub use message_stream_event::{
    ContentBlockDeltaEvent, MessageStart, MessageStartEvent, StreamEvent,
};
pub use model_info::{Modality, ModelCapabilities, ModelInfo, ModelType};
pub use model_list_params::ModelListParams;
pub use model_list_response::ModelListResponse;
pub use text_delta::{ContentBlockDelta, TextDelta};
