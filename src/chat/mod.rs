//! Interactive chat.
//!
//! This module provides the turn-based REPL built on top of the colloquy
//! client library:
//!
//! - Streaming responses rendered fragment by fragment
//! - Every exchange persisted to a local history store
//! - `quit`, `/quit` and `/models` directives
//! - Resuming an earlier conversation by id
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing, YAML configuration, merged settings
//! - [`commands`]: classification of input lines
//! - [`input`]: line sources (interactive and scripted)
//! - [`session`]: the conversation loop

pub mod commands;
pub mod config;
pub mod input;
pub mod session;

pub use crate::render::{PlainTextRenderer, RecordingRenderer, Renderer, SessionEvent};
pub use commands::{Command, classify, help_text};
pub use config::{ChatArgs, ChatConfig, ConfigFile};
pub use input::{InputSource, LineEditorInput, ScriptedInput, USER_PROMPT, read_turn_input};
pub use session::{ChatSession, Flow, SessionState};
