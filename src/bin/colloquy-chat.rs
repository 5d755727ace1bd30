//! Interactive chat with a streaming text-generation service.
//!
//! Every exchange is stored in a local SQLite database so a conversation
//! can be picked up again later.
//!
//! # Usage
//!
//! ```bash
//! # Start a new conversation with the default model
//! colloquy-chat
//!
//! # Pick a catalog model, or address an opaque model reference
//! colloquy-chat --model claude-sonnet-4-0
//! colloquy-chat --model-ref arn:aws:bedrock:us-east-1:123:inference-profile/abc
//!
//! # Resume a conversation
//! colloquy-chat --chat-id 3f0c1c2e-...
//!
//! # List recent conversations
//! colloquy-chat --list-chats
//! ```
//!
//! # Commands
//!
//! - `/models` - Browse the model catalog and switch models
//! - `/quit` or `quit` - Exit the application
//!
//! Logging goes to stderr and is controlled by `COLLOQUY_LOG`
//! (default `colloquy=warn`).

use std::process::ExitCode;
use std::sync::Arc;

use arrrg::CommandLine;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use colloquy::chat::{
    ChatArgs, ChatConfig, ChatSession, LineEditorInput, PlainTextRenderer, Renderer, SessionEvent,
    help_text,
};
use colloquy::history::{HistoryStore, RECENT_CONVERSATIONS};
use colloquy::{
    Client, CompletionService, Error, Failure, FailureKind, Interrupt, ModelCatalog, ModelSelector,
    Reporter, TracingReporter,
};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "COLLOQUY_LOG";

/// Exit status after a signal, as a shell reports SIGINT.
const INTERRUPTED_EXIT: i32 = 130;

/// How much of the latest turn `--list-chats` shows.
const PREVIEW_CHARS: usize = 60;

fn main() -> ExitCode {
    init_tracing();

    let (args, free) = ChatArgs::from_command_line_relaxed("colloquy-chat [OPTIONS]");
    let reporter: Arc<dyn Reporter> = Arc::new(TracingReporter::new());
    if !free.is_empty() {
        let err = Error::configuration(format!("unexpected arguments: {}", free.join(" ")));
        return fatal(reporter.as_ref(), &err, "parse_args");
    }
    let config = match ChatConfig::from_args(args) {
        Ok(config) => config,
        Err(err) => return fatal(reporter.as_ref(), &err, "load_config"),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => return fatal(reporter.as_ref(), &Error::from(err), "start_runtime"),
    };
    runtime.block_on(run(config, reporter))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| "colloquy=warn".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(config: ChatConfig, reporter: Arc<dyn Reporter>) -> ExitCode {
    let mut renderer = PlainTextRenderer::with_color(config.use_color);

    if config.list_chats {
        return list_chats(&config, reporter.as_ref()).await;
    }

    let client = match Client::with_options(config.api_key.clone(), config.base_url.clone(), None)
    {
        Ok(client) => Arc::new(client),
        Err(err) => return fatal(reporter.as_ref(), &err, "create_client"),
    };
    let catalog: Arc<dyn ModelCatalog> = client.clone();
    let service: Arc<dyn CompletionService> = client;

    let selector =
        match ModelSelector::resolve(catalog, &config.model, config.model_ref.as_deref()).await {
            Ok(selector) => selector,
            Err(err) => return fatal(reporter.as_ref(), &err, "resolve_model"),
        };

    let store = match HistoryStore::open(&config.db_path, config.retry).await {
        Ok(store) => Some(store),
        Err(err) => {
            let failure = Failure::warning(
                FailureKind::Persistence,
                "store_unavailable",
                format!(
                    "history database {} is unavailable ({err}); this conversation will not be saved",
                    config.db_path.display()
                ),
                "history_store",
            );
            reporter.report(&failure);
            if let Err(err) = renderer.render(SessionEvent::Warning(failure.user_message.clone())) {
                tracing::debug!(error = %err, "could not render warning");
            }
            None
        }
    };

    let interrupt = Interrupt::new();
    let mut session = ChatSession::new(service, selector, reporter.clone(), config.inference)
        .with_interrupt(interrupt.clone());
    if let Some(store) = store {
        session = session.with_store(store);
    }
    if let Some(chat_id) = config.chat_id.clone() {
        let replayed = session.resume(chat_id).await;
        renderer.info(&format!("Resumed conversation with {replayed} prior turns."));
    }

    // Ctrl-C at the prompt is handled by the line editor.  A signal while a
    // response streams abandons that response; any other signal exits.
    if let Err(err) = ctrlc::set_handler(move || {
        if interrupt.request() {
            tracing::debug!("interrupting the response in flight");
        } else {
            std::process::exit(INTERRUPTED_EXIT);
        }
    }) {
        tracing::warn!(error = %err, "could not install interrupt handler");
    }

    let mut input = match LineEditorInput::new() {
        Ok(input) => input,
        Err(err) => return fatal(reporter.as_ref(), &err, "open_input"),
    };

    renderer.info(&format!(
        "Colloquy chat (model: {}, chat: {})",
        session.active_model(),
        session.chat_id()
    ));
    for line in help_text().lines() {
        renderer.info(&format!("    {line}"));
    }
    if !session.has_store() {
        renderer.info("History is off for this session.");
    }

    session.run(&mut input, &mut renderer).await;
    println!("Goodbye!");
    ExitCode::SUCCESS
}

async fn list_chats(config: &ChatConfig, reporter: &dyn Reporter) -> ExitCode {
    let mut store = match HistoryStore::open(&config.db_path, config.retry).await {
        Ok(store) => store,
        Err(err) => return fatal(reporter, &err, "open_store"),
    };
    let summaries = match store.list(RECENT_CONVERSATIONS).await {
        Ok(summaries) => summaries,
        Err(err) => return fatal(reporter, &err, "list"),
    };
    if summaries.is_empty() {
        println!("No conversations yet.");
        return ExitCode::SUCCESS;
    }
    for summary in summaries {
        let latest = &summary.latest;
        let when = colloquy::utils::time::format_sqlite_timestamp(latest.created_at)
            .unwrap_or_else(|_| latest.created_at.to_string());
        println!(
            "{}  {} turns  {}  {}: {}",
            summary.chat_id,
            summary.turn_count,
            when,
            latest.role,
            preview(&latest.text)
        );
    }
    ExitCode::SUCCESS
}

fn preview(text: &str) -> String {
    let line = text.lines().next().unwrap_or("");
    let mut preview: String = line.chars().take(PREVIEW_CHARS).collect();
    if line.chars().count() > PREVIEW_CHARS || text.lines().nth(1).is_some() {
        preview.push_str("...");
    }
    preview
}

fn fatal(reporter: &dyn Reporter, err: &Error, operation: &str) -> ExitCode {
    let failure = Failure::from_error(err, operation, "startup");
    reporter.report(&failure);
    eprintln!("Error: {}", failure.user_message);
    ExitCode::FAILURE
}
