//! Interactive chat driver: `chat`
//!
//! Wraps one agent node and drives alternating agent/user turns. Each round
//! binds the transcript so far under [`CHAT_HISTORY_KEY`], invokes the agent,
//! emits its reply through the output callback, then collects the user's
//! reply through the input callback. The conversation ends when either side
//! says the stop word or the turn budget runs out; the transcript is the
//! node's result, as an array of utterances.
//!
//! The output and input callbacks are injected so the driver can run against
//! a terminal, a test script, or anything else that produces lines of text.

use std::io::BufRead;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::args::Args;
use crate::error::Result;
use crate::node::{resolve_key, Node, NodeRef};

/// Key under which the transcript so far is bound for the agent.
pub const CHAT_HISTORY_KEY: &str = "chat_history";

/// Token that ends the conversation when it appears in an utterance.
pub const DEFAULT_STOP_WORD: &str = "!done";

const DEFAULT_MAX_TURNS: usize = 100;

/// Sink for agent utterances.
pub type ChatOutput = Arc<dyn Fn(&str) + Send + Sync>;

/// Source of user utterances.
pub type ChatInput = Arc<dyn Fn() -> String + Send + Sync>;

/// Conversation driver. See [`chat`].
pub struct ChatNode {
    key: Option<String>,
    agent: NodeRef,
    output: ChatOutput,
    input: ChatInput,
    stop_word: String,
    max_turns: usize,
}

impl ChatNode {
    /// Sets the output key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Replaces the agent-utterance sink (default: stdout).
    pub fn with_output<F>(mut self, output: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.output = Arc::new(output);
        self
    }

    /// Replaces the user-utterance source (default: one stdin line per turn).
    pub fn with_input<F>(mut self, input: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.input = Arc::new(input);
        self
    }

    /// Replaces the stop word (default [`DEFAULT_STOP_WORD`]).
    pub fn with_stop_word(mut self, stop_word: impl Into<String>) -> Self {
        self.stop_word = stop_word.into();
        self
    }

    /// Caps the number of agent turns (default 100).
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }
}

fn utterance_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl Node for ChatNode {
    async fn invoke(&self, args: &Args) -> Result<Value> {
        let mut history: Vec<Value> = Vec::new();

        for turn in 0..self.max_turns {
            let mut round = args.clone();
            round.insert(CHAT_HISTORY_KEY.to_string(), Value::Array(history.clone()));

            let question = self.agent.invoke(&round).await?;
            let question_text = utterance_text(&question);
            history.push(question);
            (self.output)(&question_text);

            if question_text.contains(&self.stop_word) {
                debug!(key = self.key(), turn, "agent ended the conversation");
                break;
            }

            let reply = (self.input)();
            let reply_ends = reply.contains(&self.stop_word);
            history.push(Value::String(reply));

            if reply_ends {
                debug!(key = self.key(), turn, "user ended the conversation");
                break;
            }
        }

        Ok(Value::Array(history))
    }

    fn key(&self) -> &str {
        resolve_key(&self.key)
    }
}

/// Builds a chat driver over an agent node, with stdout/stdin callbacks.
pub fn chat(agent: NodeRef) -> ChatNode {
    ChatNode {
        key: None,
        agent,
        output: Arc::new(|line| println!("{line}")),
        input: Arc::new(|| {
            let mut line = String::new();
            let _ = std::io::stdin().lock().read_line(&mut line);
            line.trim_end().to_string()
        }),
        stop_word: DEFAULT_STOP_WORD.to_string(),
        max_turns: DEFAULT_MAX_TURNS,
    }
}
