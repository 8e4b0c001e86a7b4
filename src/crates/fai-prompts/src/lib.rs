//! # fai-prompts - Structured Prompt Text
//!
//! A chainable builder for the long, sectioned prompts that pipeline
//! templates produce: numbered instruction lists, indented sub-points,
//! horizontal rules, tagged blocks, inlined files and chat transcripts.
//!
//! ## Quick Start
//!
//! ```rust
//! use fai_prompts::PromptBuilder;
//!
//! let prompt = PromptBuilder::new()
//!     .text("You are a helpful gardener.").dash()
//!     .num("Greet the user")
//!     .num("Answer plant questions only").tab()
//!     .point("Politely decline anything else").back()
//!     .prompt();
//!
//! assert!(prompt.contains("1. Greet the user"));
//! assert!(prompt.contains("2. Answer plant questions only"));
//! assert!(prompt.contains("    - Politely decline anything else"));
//! ```

use std::fs;
use std::io;
use std::path::Path;

use serde_json::Value;

const RULE_WIDTH: usize = 80;
const INDENT: &str = "    ";

/// Chainable builder producing prompt text line by line.
///
/// Every method appends one or more lines at the current indent level and
/// returns the builder, so templates read top to bottom like the prompt they
/// produce. [`PromptBuilder::prompt`] finishes the chain.
#[derive(Debug, Default, Clone)]
pub struct PromptBuilder {
    lines: Vec<String>,
    indent: usize,
    counter: usize,
    open_tags: Vec<String>,
}

impl PromptBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    fn push_line(mut self, line: impl AsRef<str>) -> Self {
        let prefix = INDENT.repeat(self.indent);
        self.lines.push(format!("{prefix}{}", line.as_ref()));
        self
    }

    /// Appends a line of plain text.
    pub fn text(self, text: impl AsRef<str>) -> Self {
        self.push_line(text)
    }

    /// Appends an empty line.
    pub fn nl(mut self) -> Self {
        self.lines.push(String::new());
        self
    }

    /// Appends a horizontal rule.
    pub fn dash(mut self) -> Self {
        self.lines.push("-".repeat(RULE_WIDTH));
        self
    }

    /// Appends an auto-numbered instruction. Numbering is global to the
    /// builder and starts at 1.
    pub fn num(mut self, text: impl AsRef<str>) -> Self {
        self.counter += 1;
        let line = format!("{}. {}", self.counter, text.as_ref());
        self.push_line(line)
    }

    /// Appends a bullet point at the current indent level.
    pub fn point(self, text: impl AsRef<str>) -> Self {
        let line = format!("- {}", text.as_ref());
        self.push_line(line)
    }

    /// Increases the indent level for subsequent lines.
    pub fn tab(mut self) -> Self {
        self.indent += 1;
        self
    }

    /// Decreases the indent level. A `back` without a matching `tab` is a
    /// no-op rather than an error.
    pub fn back(mut self) -> Self {
        self.indent = self.indent.saturating_sub(1);
        self
    }

    /// Opens a named tag block: `<name>`. Closed by [`PromptBuilder::tag_close`].
    pub fn tag_open(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let line = format!("<{name}>");
        self.open_tags.push(name);
        self.push_line(line)
    }

    /// Closes the most recently opened tag block. With no open tag this is a
    /// no-op.
    pub fn tag_close(mut self) -> Self {
        match self.open_tags.pop() {
            Some(name) => {
                let line = format!("</{name}>");
                self.push_line(line)
            }
            None => self,
        }
    }

    /// Renders a chat transcript, alternating `Assistant:` and `User:` lines
    /// starting with the assistant. Non-string utterances render as JSON.
    pub fn chat<'a, I>(mut self, history: I) -> Self
    where
        I: IntoIterator<Item = &'a Value>,
    {
        for (i, utterance) in history.into_iter().enumerate() {
            let speaker = if i % 2 == 0 { "Assistant" } else { "User" };
            let text = match utterance {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            self = self.push_line(format!("{speaker}: {text}"));
        }
        self
    }

    /// Inlines the content of a text file, one builder line per file line.
    pub fn file(mut self, path: impl AsRef<Path>) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        for line in content.lines() {
            self = self.push_line(line);
        }
        Ok(self)
    }

    /// Finishes the chain and produces the prompt text.
    pub fn prompt(self) -> String {
        self.lines.join("\n")
    }
}
