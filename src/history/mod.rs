//! Durable conversation history.
//!
//! Every turn of every conversation is one row in a local SQLite database.
//! All operations go through a [`Retrier`] so that brief lock contention
//! is absorbed instead of surfacing to the person chatting.

pub mod retry;
mod schema;
mod store;

pub use retry::{Retrier, RetryError, RetryPolicy};
pub use schema::SCHEMA;
pub use store::{
    ConversationSummary, HistoryStore, NewTurn, RECENT_CONVERSATIONS, Turn,
    is_transient_storage_error,
};
