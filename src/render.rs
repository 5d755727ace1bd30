//! Presentation layer for the chat session.
//!
//! The session never writes to the terminal itself.  It emits
//! [`SessionEvent`]s to a [`Renderer`], which decides how (and whether) to
//! show them.

use std::io::{self, Write};

/// ANSI escape code for dim text (used for session notices).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the assistant label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for warnings).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Something the session wants shown.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// An assistant turn is about to stream from `model`.
    TurnStarted {
        /// The model identifier the request went to.
        model: String,
    },
    /// A piece of assistant text, in arrival order.
    Fragment(String),
    /// The assistant turn finished streaming.
    TurnFinished,
    /// Both rows of an exchange were stored.
    TurnPersisted {
        /// The conversation the rows belong to.
        chat_id: String,
        /// Surrogate id of the user row.
        user_id: i64,
        /// Surrogate id of the assistant row.
        assistant_id: i64,
    },
    /// An informational notice.
    Info(String),
    /// Something degraded but the session goes on.
    Warning(String),
    /// An operation failed.
    Error(String),
}

/// Receives session events.
///
/// A failing [`Renderer::render`] on a fragment aborts the turn in progress.
pub trait Renderer: Send {
    /// Show one event.
    fn render(&mut self, event: SessionEvent) -> io::Result<()>;

    /// Show an informational notice, ignoring output failures.
    fn info(&mut self, message: &str) {
        if let Err(err) = self.render(SessionEvent::Info(message.to_string())) {
            tracing::debug!(error = %err, "could not render notice");
        }
    }

    /// Show an error notice, ignoring output failures.
    fn error(&mut self, message: &str) {
        if let Err(err) = self.render(SessionEvent::Error(message.to_string())) {
            tracing::debug!(error = %err, "could not render error");
        }
    }
}

/// Plain text renderer with optional ANSI styling.
///
/// Fragments go to the output as they arrive and are flushed immediately.
/// Warnings and errors go to stderr.
pub struct PlainTextRenderer {
    out: Box<dyn Write + Send>,
    use_color: bool,
    mid_line: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self::with_writer(Box::new(io::stdout()), use_color)
    }

    /// Creates a renderer that writes assistant output to `out`.
    pub fn with_writer(out: Box<dyn Write + Send>, use_color: bool) -> Self {
        Self {
            out,
            use_color,
            mid_line: false,
        }
    }

    fn styled(&self, style: &str, text: &str) -> String {
        if self.use_color {
            format!("{style}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }

    fn end_line(&mut self) -> io::Result<()> {
        if self.mid_line {
            writeln!(self.out)?;
            self.mid_line = false;
        }
        Ok(())
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn render(&mut self, event: SessionEvent) -> io::Result<()> {
        match event {
            SessionEvent::TurnStarted { model } => {
                self.end_line()?;
                let label = self.styled(ANSI_CYAN, "Assistant:");
                writeln!(self.out, "{label} {}", self.styled(ANSI_DIM, &format!("({model})")))?;
            }
            SessionEvent::Fragment(text) => {
                write!(self.out, "{text}")?;
                self.mid_line = !text.ends_with('\n');
            }
            SessionEvent::TurnFinished => {
                self.end_line()?;
                writeln!(self.out)?;
            }
            SessionEvent::TurnPersisted {
                chat_id,
                user_id,
                assistant_id,
            } => {
                tracing::debug!(chat_id, user_id, assistant_id, "turn persisted");
            }
            SessionEvent::Info(message) => {
                self.end_line()?;
                writeln!(self.out, "{}", self.styled(ANSI_DIM, &message))?;
            }
            SessionEvent::Warning(message) => {
                self.end_line()?;
                let text = self.styled(ANSI_YELLOW, &format!("Warning: {message}"));
                eprintln!("{text}");
            }
            SessionEvent::Error(message) => {
                self.end_line()?;
                let text = self.styled(ANSI_RED, &format!("Error: {message}"));
                eprintln!("{text}");
            }
        }
        self.out.flush()
    }
}

/// Renderer that records every event.  Useful headless and in tests.
///
/// Can be told to start refusing fragments after a number of them were
/// accepted, to exercise output failures.
#[derive(Debug, Default, Clone)]
pub struct RecordingRenderer {
    events: Vec<SessionEvent>,
    fail_after_fragments: Option<usize>,
}

impl RecordingRenderer {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every fragment after the first `n`.
    pub fn failing_after(n: usize) -> Self {
        Self {
            events: Vec::new(),
            fail_after_fragments: Some(n),
        }
    }

    /// Every event in arrival order.
    pub fn events(&self) -> &[SessionEvent] {
        &self.events
    }

    /// The concatenation of every recorded fragment.
    pub fn text(&self) -> String {
        self.fragments().concat()
    }

    /// Every recorded fragment.
    pub fn fragments(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Fragment(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Every recorded error message.
    pub fn errors(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Error(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Every recorded warning message.
    pub fn warnings(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Warning(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, event: SessionEvent) -> io::Result<()> {
        if let (SessionEvent::Fragment(_), Some(limit)) = (&event, self.fail_after_fragments) {
            if self.fragments().len() >= limit {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "output closed"));
            }
        }
        self.events.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
    }

    #[test]
    fn renderer_without_color() {
        let renderer = PlainTextRenderer::with_color(false);
        assert!(!renderer.use_color);
    }

    #[test]
    fn fragments_are_written_verbatim() {
        let buffer = SharedBuffer::default();
        let mut renderer = PlainTextRenderer::with_writer(Box::new(buffer.clone()), false);
        renderer
            .render(SessionEvent::TurnStarted {
                model: "m".to_string(),
            })
            .unwrap();
        renderer.render(SessionEvent::Fragment("Hel".into())).unwrap();
        renderer.render(SessionEvent::Fragment("lo".into())).unwrap();
        renderer.render(SessionEvent::TurnFinished).unwrap();
        assert_eq!(buffer.contents(), "Assistant: (m)\nHello\n\n");
    }

    #[test]
    fn recording_renderer_fails_after_limit() {
        let mut renderer = RecordingRenderer::failing_after(1);
        assert!(renderer.render(SessionEvent::Fragment("a".into())).is_ok());
        assert!(renderer.render(SessionEvent::Info("note".into())).is_ok());
        assert!(renderer.render(SessionEvent::Fragment("b".into())).is_err());
        assert_eq!(renderer.text(), "a");
    }
}
