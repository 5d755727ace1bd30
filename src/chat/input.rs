//! Line input for the chat loop.

use std::collections::VecDeque;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::error::{Error, Result};

/// Prompt shown before each user turn.
pub const USER_PROMPT: &str = "You: ";

/// A source of input lines.
///
/// `Ok(None)` means the input is exhausted and the session should end.
pub trait InputSource: Send {
    /// Reads one line, blocking until it is available.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Interactive line editor backed by rustyline.
///
/// Ctrl-C at the prompt discards the line and prompts again; Ctrl-D ends
/// the input.
pub struct LineEditorInput {
    editor: DefaultEditor,
}

impl LineEditorInput {
    /// Creates a new interactive input.
    pub fn new() -> Result<Self> {
        let editor = DefaultEditor::new()
            .map_err(|e| Error::io("could not start line editor", std::io::Error::other(e)))?;
        Ok(Self { editor })
    }
}

impl InputSource for LineEditorInput {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        loop {
            match self.editor.readline(prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = self.editor.add_history_entry(line.as_str());
                    }
                    return Ok(Some(line));
                }
                Err(ReadlineError::Interrupted) => {
                    println!();
                    continue;
                }
                Err(ReadlineError::Eof) => return Ok(None),
                Err(ReadlineError::Io(err)) => return Err(Error::io("input error", err)),
                Err(err) => {
                    return Err(Error::io("input error", std::io::Error::other(err)));
                }
            }
        }
    }
}

/// Input that replays a fixed list of lines, then reports end of input.
#[derive(Debug, Default, Clone)]
pub struct ScriptedInput {
    lines: VecDeque<String>,
    prompts: Vec<String>,
}

impl ScriptedInput {
    /// Creates input that yields `lines` in order.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
        }
    }

    /// The prompts that were shown, in order.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// Lines not yet consumed.
    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

impl InputSource for ScriptedInput {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        self.prompts.push(prompt.to_string());
        Ok(self.lines.pop_front())
    }
}

/// Reads the next non-blank line, prompting again after blank ones.
pub fn read_turn_input(input: &mut dyn InputSource) -> Result<Option<String>> {
    loop {
        match input.read_line(USER_PROMPT)? {
            Some(line) if line.trim().is_empty() => continue,
            other => return Ok(other),
        }
    }
}
