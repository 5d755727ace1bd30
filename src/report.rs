//! Structured failure reporting.
//!
//! The session never prints errors directly.  It builds a [`Failure`] and hands
//! it to the [`Reporter`] it was constructed with; the reporter logs it and
//! decides whether the process should keep going.

use std::collections::BTreeMap;
use std::fmt;

use crate::Error;

/// Coarse classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The completion service or the network between us and it.
    RemoteService,
    /// The local history store.
    Persistence,
    /// Bad input such as an unknown or incapable model.
    Validation,
    /// The presentation layer.
    Presentation,
    /// Unusable startup configuration.
    Critical,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::RemoteService => "remote_service",
            FailureKind::Persistence => "persistence",
            FailureKind::Validation => "validation",
            FailureKind::Presentation => "presentation",
            FailureKind::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// How loudly a failure should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Worth a log line, nothing more.
    Info,
    /// Degraded but working.
    Warning,
    /// The operation failed.
    Error,
    /// The process cannot continue.
    Critical,
}

/// What the caller should do after a failure was reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Keep running.
    Continue,
    /// Exit the process.
    Terminate,
}

/// A structured, reportable failure.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    /// Coarse classification.
    pub kind: FailureKind,
    /// Stable machine-readable code, e.g. `store_retries_exhausted`.
    pub code: &'static str,
    /// Detailed message for logs.
    pub message: String,
    /// Short message suitable for the person at the terminal.
    pub user_message: String,
    /// The operation that failed, e.g. `append`.
    pub operation: String,
    /// The component that failed, e.g. `history_store`.
    pub component: String,
    /// The conversation the failure belongs to, if any.
    pub chat_id: Option<String>,
    /// Extra key/value details such as `attempts`.
    pub metadata: BTreeMap<String, String>,
    /// How loud to be.
    pub severity: Severity,
    /// Whether the session can carry on.
    pub recoverable: bool,
}

impl Failure {
    /// Builds a failure from a crate error.
    pub fn from_error(
        err: &Error,
        operation: impl Into<String>,
        component: impl Into<String>,
    ) -> Self {
        let (kind, code, user_message) = classify(err);
        let recoverable = kind != FailureKind::Critical;
        let severity = if recoverable {
            Severity::Error
        } else {
            Severity::Critical
        };
        let mut metadata = BTreeMap::new();
        if let Some(attempts) = err.attempts() {
            metadata.insert("attempts".to_string(), attempts.to_string());
        }
        if let Some(status) = err.status_code() {
            metadata.insert("status_code".to_string(), status.to_string());
        }
        if let Some(request_id) = err.request_id() {
            metadata.insert("request_id".to_string(), request_id.to_string());
        }
        Self {
            kind,
            code,
            message: err.to_string(),
            user_message,
            operation: operation.into(),
            component: component.into(),
            chat_id: None,
            metadata,
            severity,
            recoverable,
        }
    }

    /// Builds a recoverable warning that is not tied to an error value.
    pub fn warning(
        kind: FailureKind,
        code: &'static str,
        message: impl Into<String>,
        component: impl Into<String>,
    ) -> Self {
        let message = message.into();
        Self {
            kind,
            code,
            user_message: message.clone(),
            message,
            operation: String::new(),
            component: component.into(),
            chat_id: None,
            metadata: BTreeMap::new(),
            severity: Severity::Warning,
            recoverable: true,
        }
    }

    /// Attaches the conversation id.
    pub fn with_chat_id(mut self, chat_id: impl Into<String>) -> Self {
        self.chat_id = Some(chat_id.into());
        self
    }

    /// Adds one metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.metadata.insert(key.into(), value.to_string());
        self
    }
}

fn classify(err: &Error) -> (FailureKind, &'static str, String) {
    match err {
        Error::Storage { .. } => (
            FailureKind::Persistence,
            "store_failure",
            "Conversation history could not be saved.".to_string(),
        ),
        Error::RetriesExhausted { .. } => (
            FailureKind::Persistence,
            "store_retries_exhausted",
            "Conversation history is busy; this turn was not saved.".to_string(),
        ),
        Error::Validation { message, .. } => (
            FailureKind::Validation,
            "invalid_input",
            message.clone(),
        ),
        Error::Capability { .. } => (
            FailureKind::Validation,
            "model_capability",
            err.to_string(),
        ),
        Error::Render { .. } => (
            FailureKind::Presentation,
            "render_failed",
            "Output could not be written; the response was discarded.".to_string(),
        ),
        Error::Io { .. } => (
            FailureKind::Presentation,
            "io",
            err.to_string(),
        ),
        Error::Configuration { message } => (
            FailureKind::Critical,
            "configuration",
            message.clone(),
        ),
        Error::Authentication { .. } => (
            FailureKind::RemoteService,
            "authentication",
            "The completion service rejected the credentials.".to_string(),
        ),
        Error::RateLimit { .. } => (
            FailureKind::RemoteService,
            "rate_limited",
            "The completion service is rate limiting; try again shortly.".to_string(),
        ),
        Error::Timeout { .. } | Error::Connection { .. } => (
            FailureKind::RemoteService,
            "network",
            "Could not reach the completion service; resend your message.".to_string(),
        ),
        Error::Streaming { .. } | Error::Encoding { .. } | Error::Serialization { .. } => (
            FailureKind::RemoteService,
            "stream_interrupted",
            "The response stream broke off; resend your message.".to_string(),
        ),
        _ => (
            FailureKind::RemoteService,
            "remote_service",
            format!("Request failed: {err}"),
        ),
    }
}

/// Receives failures from the session.
pub trait Reporter: Send + Sync {
    /// Records a failure and says whether the process should keep going.
    fn report(&self, failure: &Failure) -> Disposition;
}

/// Reporter that logs through `tracing`.
///
/// Terminates only on non-recoverable critical failures.
#[derive(Debug, Default, Clone)]
pub struct TracingReporter;

impl TracingReporter {
    /// Creates a new reporter.
    pub fn new() -> Self {
        Self
    }
}

impl Reporter for TracingReporter {
    fn report(&self, failure: &Failure) -> Disposition {
        let chat_id = failure.chat_id.as_deref().unwrap_or("");
        match failure.severity {
            Severity::Info => tracing::info!(
                kind = %failure.kind,
                code = failure.code,
                operation = %failure.operation,
                component = %failure.component,
                chat_id,
                metadata = ?failure.metadata,
                "{}",
                failure.message
            ),
            Severity::Warning => tracing::warn!(
                kind = %failure.kind,
                code = failure.code,
                operation = %failure.operation,
                component = %failure.component,
                chat_id,
                metadata = ?failure.metadata,
                "{}",
                failure.message
            ),
            Severity::Error | Severity::Critical => tracing::error!(
                kind = %failure.kind,
                code = failure.code,
                operation = %failure.operation,
                component = %failure.component,
                chat_id,
                metadata = ?failure.metadata,
                recoverable = failure.recoverable,
                "{}",
                failure.message
            ),
        }
        if !failure.recoverable && failure.severity == Severity::Critical {
            Disposition::Terminate
        } else {
            Disposition::Continue
        }
    }
}
