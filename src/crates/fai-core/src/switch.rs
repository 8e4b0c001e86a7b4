//! Conditional branching: `switch`
//!
//! Wraps two children and a predicate over the current argument set. Exactly
//! one branch runs per invocation; the engine adds no memoization and no side
//! effects beyond the chosen branch's own.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::args::Args;
use crate::error::Result;
use crate::node::{resolve_key, Node, NodeRef};

/// Predicate over the full argument set.
pub type Predicate = Arc<dyn Fn(&Args) -> bool + Send + Sync>;

/// Two-way branch. See [`switch`].
pub struct SwitchNode {
    key: Option<String>,
    on_true: NodeRef,
    on_false: NodeRef,
    predicate: Predicate,
}

impl SwitchNode {
    /// Sets the output key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

#[async_trait]
impl Node for SwitchNode {
    async fn invoke(&self, args: &Args) -> Result<Value> {
        let take_if = (self.predicate)(args);
        debug!(key = self.key(), branch = if take_if { "if" } else { "else" }, "routing");
        if take_if {
            self.on_true.invoke(args).await
        } else {
            self.on_false.invoke(args).await
        }
    }

    fn key(&self) -> &str {
        resolve_key(&self.key)
    }
}

/// Builds a switch node routing to `on_true` or `on_false` by `predicate`.
pub fn switch<F>(on_true: NodeRef, on_false: NodeRef, predicate: F) -> SwitchNode
where
    F: Fn(&Args) -> bool + Send + Sync + 'static,
{
    SwitchNode { key: None, on_true, on_false, predicate: Arc::new(predicate) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::node::{value, NodeExt};
    use serde_json::json;

    fn branches() -> (NodeRef, NodeRef) {
        (
            value("This is the if branch").into_node(),
            value("This is the else branch").into_node(),
        )
    }

    #[tokio::test]
    async fn true_predicate_takes_the_if_branch() {
        let (if_branch, else_branch) = branches();
        let node = switch(if_branch, else_branch, |_| true);
        assert_eq!(node.invoke(&Args::new()).await.unwrap(), json!("This is the if branch"));
    }

    #[tokio::test]
    async fn false_predicate_takes_the_else_branch() {
        let (if_branch, else_branch) = branches();
        let node = switch(if_branch, else_branch, |_| false);
        assert_eq!(node.invoke(&Args::new()).await.unwrap(), json!("This is the else branch"));
    }

    #[tokio::test]
    async fn predicate_reads_the_argument_set() {
        let (if_branch, else_branch) = branches();
        let node = switch(if_branch, else_branch, |args| {
            args.get("mode").and_then(Value::as_str) == Some("detailed")
        });

        let detailed = node.invoke(&args! { "mode" => "detailed" }).await.unwrap();
        assert_eq!(detailed, json!("This is the if branch"));

        let terse = node.invoke(&args! { "mode" => "terse" }).await.unwrap();
        assert_eq!(terse, json!("This is the else branch"));
    }
}
