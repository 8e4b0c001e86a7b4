//! Bounded repetition: `loop_while` and `loop_n`
//!
//! Wraps one child and a termination predicate over the iteration index and
//! the current argument set. Each round binds the index under [`INDEX_KEY`],
//! invokes the child, appends the result to the accumulated list, and binds
//! the result under the child's output key so the next round can refine it.
//! The predicate is checked before every round; when it returns false the
//! reducer runs over the ordered result list.
//!
//! There is no safety bound beyond the predicate. An always-true predicate
//! loops forever; that is the caller's responsibility.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::args::Args;
use crate::error::Result;
use crate::node::{resolve_key, Node, NodeRef};

/// Key under which the 0-based iteration index is bound for each round.
pub const INDEX_KEY: &str = "idx";

/// Termination predicate over the iteration index and the current arguments.
pub type LoopPredicate = Arc<dyn Fn(usize, &Args) -> bool + Send + Sync>;

/// Reducer over an ordered list of per-round results.
pub type ListReducer = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// Repetition wrapper. See [`loop_while`] and [`loop_n`].
pub struct LoopNode {
    key: Option<String>,
    child: NodeRef,
    predicate: LoopPredicate,
    reducer: ListReducer,
}

impl LoopNode {
    /// Sets the output key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

#[async_trait]
impl Node for LoopNode {
    async fn invoke(&self, args: &Args) -> Result<Value> {
        let mut working = args.clone();
        let mut results = Vec::new();
        let mut index = 0usize;

        loop {
            working.insert(INDEX_KEY.to_string(), Value::from(index));
            if !(self.predicate)(index, &working) {
                break;
            }
            let value = self.child.invoke(&working).await?;
            // The latest round's result is visible to the next round.
            working.insert(self.child.key().to_string(), value.clone());
            results.push(value);
            index += 1;
        }

        debug!(key = self.key(), rounds = results.len(), "loop terminated");
        (self.reducer)(&results)
    }

    fn key(&self) -> &str {
        resolve_key(&self.key)
    }
}

/// Builds a loop node with an explicit predicate and reducer.
pub fn loop_while<P, R>(child: NodeRef, predicate: P, reducer: R) -> LoopNode
where
    P: Fn(usize, &Args) -> bool + Send + Sync + 'static,
    R: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
{
    LoopNode {
        key: None,
        child,
        predicate: Arc::new(predicate),
        reducer: Arc::new(reducer),
    }
}

/// Builds a loop node running exactly `count` rounds and reducing to the last
/// round's result (or null when `count` is zero).
pub fn loop_n(child: NodeRef, count: usize) -> LoopNode {
    loop_while(
        child,
        move |idx, _| idx < count,
        |results| Ok(results.last().cloned().unwrap_or(Value::Null)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{compute, NodeExt};
    use serde_json::json;

    fn iteration_echo() -> NodeRef {
        compute([INDEX_KEY], |args: &Args| {
            Ok(json!(format!("Iteration {}", args[INDEX_KEY])))
        })
        .into_node()
    }

    #[tokio::test]
    async fn runs_exactly_count_rounds_in_index_order() {
        let node = loop_while(
            iteration_echo(),
            |idx, _| idx < 5,
            |results| {
                let joined = results
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(" | ");
                Ok(json!(joined))
            },
        );

        let result = node.invoke(&Args::new()).await.unwrap();
        assert_eq!(
            result,
            json!("Iteration 0 | Iteration 1 | Iteration 2 | Iteration 3 | Iteration 4")
        );
    }

    #[tokio::test]
    async fn each_round_sees_the_previous_result() {
        let refiner = compute(["draft"], |args: &Args| {
            let prior = args["draft"].as_str().unwrap_or("seed");
            Ok(json!(format!("{prior}+")))
        })
        .with_key("draft")
        .into_node();

        let node = loop_while(
            refiner,
            |idx, _| idx < 3,
            |results| Ok(results.last().cloned().unwrap_or(Value::Null)),
        );

        assert_eq!(node.invoke(&Args::new()).await.unwrap(), json!("seed+++"));
    }

    #[tokio::test]
    async fn predicate_reads_the_argument_set() {
        // Stop as soon as the refined value grows past the threshold.
        let doubler = compute(["n"], |args: &Args| {
            Ok(json!(args["n"].as_i64().unwrap_or(1) * 2))
        })
        .with_key("n")
        .into_node();

        let node = loop_while(
            doubler,
            |_, args| args["n"].as_i64().map_or(true, |n| n < 16),
            |results| Ok(results.last().cloned().unwrap_or(Value::Null)),
        );

        assert_eq!(node.invoke(&crate::args! { "n" => 1 }).await.unwrap(), json!(16));
    }

    #[tokio::test]
    async fn loop_n_keeps_the_last_round() {
        let node = loop_n(iteration_echo(), 3);
        assert_eq!(node.invoke(&Args::new()).await.unwrap(), json!("Iteration 2"));
    }

    #[tokio::test]
    async fn zero_rounds_is_not_an_error() {
        let node = loop_n(iteration_echo(), 0);
        assert_eq!(node.invoke(&Args::new()).await.unwrap(), Value::Null);
    }
}
