//! Control directives embedded in chat input.
//!
//! Every line the user types is either a directive for the session or an
//! ordinary turn for the model.  Matching is exact: only the trailing line
//! terminator is removed before comparing.

/// A classified input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// End the session.
    Terminate,

    /// Browse the model catalog and optionally switch models.
    BrowseModels,

    /// Send the text to the model as a user turn.
    OrdinaryTurn(String),
}

/// Classifies one raw input line.
///
/// # Examples
///
/// ```
/// # use colloquy::chat::{Command, classify};
/// assert_eq!(classify("quit\n"), Command::Terminate);
/// assert_eq!(classify("/models"), Command::BrowseModels);
/// assert_eq!(classify(" quit"), Command::OrdinaryTurn(" quit".to_string()));
/// ```
pub fn classify(raw_line: &str) -> Command {
    let line = strip_terminator(raw_line);
    match line {
        "quit" | "/quit" => Command::Terminate,
        "/models" => Command::BrowseModels,
        _ => Command::OrdinaryTurn(line.to_string()),
    }
}

fn strip_terminator(line: &str) -> &str {
    line.strip_suffix("\r\n")
        .or_else(|| line.strip_suffix('\n'))
        .unwrap_or(line)
}

/// Returns the help text for directives.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /models      - Browse the model catalog and switch models
  /quit, quit  - Exit the chat
Anything else is sent to the model."#
}
