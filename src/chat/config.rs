//! Configuration types for the chat application.
//!
//! Settings come from three layers: built-in defaults, an optional YAML
//! file, and command-line flags.  Layers are merged field by field, with
//! flags winning over the file and the file winning over defaults.

use std::path::{Path, PathBuf};

use arrrg_derive::CommandLine;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::history::RetryPolicy;
use crate::inference::InferenceConfig;

/// Catalog model used when none is configured.
pub const DEFAULT_MODEL: &str = "claude-haiku-4-5";

/// History database used when none is configured.
pub const DEFAULT_DB_PATH: &str = "colloquy.db";

/// Command-line arguments for the colloquy-chat tool.
#[derive(CommandLine, Debug, Default, Eq, PartialEq)]
pub struct ChatArgs {
    /// Catalog model to use for chat.
    #[arrrg(optional, "Catalog model to use (default: claude-haiku-4-5)", "MODEL")]
    pub model: Option<String>,

    /// Opaque model reference; wins over --model when both are set.
    #[arrrg(optional, "Opaque model reference (profile or deployment ARN)", "REF")]
    pub model_ref: Option<String>,

    /// Conversation to resume.
    #[arrrg(optional, "Resume the conversation with this id", "CHAT_ID")]
    pub chat_id: Option<String>,

    /// History database path.
    #[arrrg(optional, "History database (default: colloquy.db)", "PATH")]
    pub db_path: Option<String>,

    /// YAML configuration file.
    #[arrrg(optional, "YAML configuration file", "PATH")]
    pub config: Option<String>,

    /// Maximum tokens per response.
    #[arrrg(optional, "Max tokens per response (default: 4096)", "TOKENS")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    #[arrrg(optional, "Sampling temperature", "TEMP")]
    pub temperature: Option<String>,

    /// Nucleus sampling cutoff.
    #[arrrg(optional, "Nucleus sampling cutoff (ignored when --temperature is set)", "P")]
    pub top_p: Option<String>,

    /// API key; falls back to COLLOQUY_API_KEY.
    #[arrrg(optional, "API key (default: $COLLOQUY_API_KEY)", "KEY")]
    pub api_key: Option<String>,

    /// Base URL of the completion service.
    #[arrrg(optional, "Base URL of the completion service", "URL")]
    pub base_url: Option<String>,

    /// List recent conversations and exit.
    #[arrrg(flag, "List recent conversations and exit")]
    pub list_chats: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// The YAML configuration file.  Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Catalog model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Opaque model reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_ref: Option<String>,
    /// History database path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
    /// Maximum tokens per response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Nucleus sampling cutoff.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Base URL of the completion service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Whether to use ANSI colors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<bool>,
    /// Milliseconds before the first storage retry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_base_delay_ms: Option<u64>,
    /// Storage attempts before giving up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_max_attempts: Option<u32>,
}

impl ConfigFile {
    /// Reads a configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&content)
            .map_err(|e| Error::configuration(format!("{}: {e}", path.display())))
    }

    /// Parses configuration from YAML text.
    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after merging the
/// configuration file and command-line arguments over the defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Catalog model identifier.
    pub model: String,

    /// Opaque model reference.  When set, it is what requests use.
    pub model_ref: Option<String>,

    /// Conversation to resume; a fresh one is started when `None`.
    pub chat_id: Option<String>,

    /// History database path.
    pub db_path: PathBuf,

    /// Generation parameters.
    pub inference: InferenceConfig,

    /// API key, if given explicitly.
    pub api_key: Option<String>,

    /// Base URL of the completion service, if not the default.
    pub base_url: Option<String>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// List recent conversations instead of chatting.
    pub list_chats: bool,

    /// Backoff for the history store.
    pub retry: RetryPolicy,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    pub fn new() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            model_ref: None,
            chat_id: None,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            inference: InferenceConfig::new(),
            api_key: None,
            base_url: None,
            use_color: true,
            list_chats: false,
            retry: RetryPolicy::default(),
        }
    }

    /// Builds the configuration from flags, loading `--config` if given.
    pub fn from_args(args: ChatArgs) -> Result<Self> {
        let file = match args.config.as_deref() {
            Some(path) => ConfigFile::from_file(path)?,
            None => ConfigFile::default(),
        };
        Self::new().merge_file(file).merge_args(args)
    }

    /// Applies every field the file sets.
    pub fn merge_file(mut self, file: ConfigFile) -> Self {
        if let Some(model) = file.model {
            self.model = model;
        }
        if file.model_ref.is_some() {
            self.model_ref = file.model_ref;
        }
        if let Some(db_path) = file.db_path {
            self.db_path = db_path;
        }
        if let Some(max_tokens) = file.max_tokens {
            self.inference = self.inference.with_max_tokens(max_tokens);
        }
        if file.temperature.is_some() {
            self.inference = self.inference.with_temperature(file.temperature);
        }
        if file.top_p.is_some() {
            self.inference = self.inference.with_top_p(file.top_p);
        }
        if file.base_url.is_some() {
            self.base_url = file.base_url;
        }
        if let Some(color) = file.color {
            self.use_color = color;
        }
        if file.retry_base_delay_ms.is_some() || file.retry_max_attempts.is_some() {
            let base = file
                .retry_base_delay_ms
                .map(std::time::Duration::from_millis)
                .unwrap_or(self.retry.base_delay);
            let attempts = file.retry_max_attempts.unwrap_or(self.retry.max_attempts);
            self.retry = RetryPolicy::new(base, attempts);
        }
        self
    }

    /// Applies every flag that was given.
    ///
    /// Fails when a sampling flag is not a number.
    pub fn merge_args(mut self, args: ChatArgs) -> Result<Self> {
        if let Some(model) = args.model {
            self.model = model;
        }
        if args.model_ref.is_some() {
            self.model_ref = args.model_ref;
        }
        if args.chat_id.is_some() {
            self.chat_id = args.chat_id;
        }
        if let Some(db_path) = args.db_path {
            self.db_path = PathBuf::from(db_path);
        }
        if let Some(max_tokens) = args.max_tokens {
            self.inference = self.inference.with_max_tokens(max_tokens);
        }
        if let Some(temperature) = args.temperature.as_deref() {
            let temperature = parse_sampling("--temperature", temperature)?;
            self.inference = self.inference.with_temperature(Some(temperature));
        }
        if let Some(top_p) = args.top_p.as_deref() {
            let top_p = parse_sampling("--top-p", top_p)?;
            self.inference = self.inference.with_top_p(Some(top_p));
        }
        if args.api_key.is_some() {
            self.api_key = args.api_key;
        }
        if args.base_url.is_some() {
            self.base_url = args.base_url;
        }
        if args.no_color {
            self.use_color = false;
        }
        self.list_chats |= args.list_chats;
        Ok(self)
    }

    /// Sets the catalog model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the opaque model reference.
    pub fn with_model_ref(mut self, model_ref: Option<String>) -> Self {
        self.model_ref = model_ref;
        self
    }

    /// Sets the conversation to resume.
    pub fn with_chat_id(mut self, chat_id: Option<String>) -> Self {
        self.chat_id = chat_id;
        self
    }

    /// Sets the history database path.
    pub fn with_db_path(mut self, db_path: impl Into<PathBuf>) -> Self {
        self.db_path = db_path.into();
        self
    }

    /// Sets the generation parameters.
    pub fn with_inference(mut self, inference: InferenceConfig) -> Self {
        self.inference = inference;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Sets the history store backoff.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_sampling(flag: &str, value: &str) -> Result<f32> {
    value
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::configuration(format!("{flag} expects a number, got {value:?}")))
}
