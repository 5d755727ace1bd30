//! A turn-based chat engine for streaming text-generation services.
//!
//! The engine sends each user turn, with the conversation so far, to a
//! remote completion service; renders the reply as it streams in; and
//! records every turn in a local SQLite history that survives restarts.

// Public modules
pub mod chat;
pub mod client;
pub mod error;
pub mod history;
pub mod inference;
pub mod models;
pub mod render;
pub mod report;
pub mod service;
pub mod sse;
pub mod stream;
pub mod types;
pub mod utils;

mod observability;

// Re-exports
pub use client::Client;
pub use error::{Error, Result};
pub use history::{HistoryStore, RetryPolicy, Retrier};
pub use inference::InferenceConfig;
pub use models::{Capability, ModelSelector, ModelTarget};
pub use observability::register_biometrics;
pub use report::{Disposition, Failure, FailureKind, Reporter, Severity, TracingReporter};
pub use service::{CompletionRequest, CompletionService, EventStream, ModelCatalog};
pub use stream::Interrupt;
pub use types::*;
