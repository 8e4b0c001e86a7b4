//! Concurrent fan-out/fan-in: `parallel` and `ai_parallel`
//!
//! Wraps an unordered list of children and a reducer. All children run
//! concurrently against the *same* initial argument set: no child sees
//! another's result, which is the key semantic difference from
//! [`sequential`](crate::sequential). The join step is deterministic: results
//! are associated back to their originating child by declared order, never by
//! completion order, and keyed by each child's output key before the reducer
//! runs.
//!
//! [`ai_parallel`] is the specialization where the reducer itself is one more
//! inference call over the fanned-out results: "run N independent
//! sub-pipelines, then have one more unit synthesize them" in one line.
//!
//! A failing sibling does not cancel the others; the first failure observed
//! during collection aborts the combinator's result.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use tracing::debug;

use crate::args::{Args, ParamFn, Template};
use crate::backend::BackendRef;
use crate::error::{PipelineError, Result};
use crate::infer::infer;
use crate::node::{resolve_key, Node, NodeExt, NodeRef};

/// Dispatches every child concurrently and collects results in declared
/// order. Shared with [`fork`](crate::fork).
pub(crate) async fn fan_out(children: &[NodeRef], args: &Args) -> Result<Vec<Value>> {
    debug!(children = children.len(), "fanning out");
    let handles: Vec<_> = children
        .iter()
        .map(|child| {
            let child = Arc::clone(child);
            let args = args.clone();
            tokio::spawn(async move { child.invoke(&args).await })
        })
        .collect();

    let mut results = Vec::with_capacity(children.len());
    for joined in join_all(handles).await {
        results.push(joined.map_err(|err| PipelineError::Join(err.to_string()))??);
    }
    Ok(results)
}

enum Reduce {
    /// Host-function reducer over the keyed results.
    Fn(ParamFn<Value>),
    /// A node (in practice an inference call) invoked with the keyed results
    /// as its argument set.
    Node(NodeRef),
}

/// Fan-out/fan-in node. See [`parallel`] and [`ai_parallel`].
pub struct ParallelNode {
    key: Option<String>,
    children: Vec<NodeRef>,
    reduce: Reduce,
}

impl ParallelNode {
    /// Sets the output key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

#[async_trait]
impl Node for ParallelNode {
    async fn invoke(&self, args: &Args) -> Result<Value> {
        let values = fan_out(&self.children, args).await?;

        let mut results = Args::new();
        for (child, value) in self.children.iter().zip(values) {
            results.insert(child.key().to_string(), value);
        }

        match &self.reduce {
            Reduce::Fn(reducer) => reducer.call(&results),
            Reduce::Node(node) => node.invoke(&results).await,
        }
    }

    fn key(&self) -> &str {
        resolve_key(&self.key)
    }
}

/// Builds a parallel node with a host-function reducer.
pub fn parallel(children: Vec<NodeRef>, reducer: ParamFn<Value>) -> ParallelNode {
    ParallelNode { key: None, children, reduce: Reduce::Fn(reducer) }
}

/// Builds a parallel node whose reducer is a single inference call rendering
/// `template` over the fanned-out keyed results.
pub fn ai_parallel(
    backend: BackendRef,
    template: impl Into<Template>,
    children: Vec<NodeRef>,
) -> Result<ParallelNode> {
    let reducer = infer(backend, template).build()?;
    Ok(ParallelNode { key: None, children, reduce: Reduce::Node(reducer.into_node()) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::param_fn;
    use crate::backend::{Backend, ScriptedBackend};
    use crate::node::value;
    use serde_json::json;
    use std::time::Duration;

    /// Test child that completes after a fixed delay.
    struct SlowEcho {
        key: String,
        delay: Duration,
        value: Value,
    }

    #[async_trait]
    impl Node for SlowEcho {
        async fn invoke(&self, _args: &Args) -> Result<Value> {
            tokio::time::sleep(self.delay).await;
            Ok(self.value.clone())
        }

        fn key(&self) -> &str {
            &self.key
        }
    }

    fn slow(key: &str, delay_ms: u64, value: &str) -> NodeRef {
        Arc::new(SlowEcho {
            key: key.to_string(),
            delay: Duration::from_millis(delay_ms),
            value: json!(value),
        })
    }

    #[tokio::test]
    async fn reducer_receives_results_keyed_by_declared_order() {
        // Completion order is c, b, a; declared order must win.
        let node = parallel(
            vec![slow("a", 30, "A"), slow("b", 20, "B"), slow("c", 0, "C")],
            param_fn(["a", "b", "c"], |results: &Args| {
                assert_eq!(results["a"], json!("A"));
                assert_eq!(results["b"], json!("B"));
                assert_eq!(results["c"], json!("C"));
                Ok(json!(format!(
                    "{}{}{}",
                    results["a"].as_str().unwrap(),
                    results["b"].as_str().unwrap(),
                    results["c"].as_str().unwrap()
                )))
            }),
        );

        assert_eq!(node.invoke(&Args::new()).await.unwrap(), json!("ABC"));
    }

    #[tokio::test]
    async fn siblings_share_the_initial_argument_set() {
        let reader = crate::node::compute(["seed", "other"], |args: &Args| {
            // Sibling outputs are invisible during the fan-out.
            assert!(args["other"].is_null());
            Ok(args["seed"].clone())
        });

        let node = parallel(
            vec![
                reader.with_key("first").into_node(),
                value("x").with_key("other").into_node(),
            ],
            param_fn(["first"], |results: &Args| Ok(results["first"].clone())),
        );

        let result = node.invoke(&crate::args! { "seed" => "shared" }).await.unwrap();
        assert_eq!(result, json!("shared"));
    }

    #[tokio::test]
    async fn sibling_failure_aborts_the_combinator() {
        let failing = crate::node::compute([] as [&str; 0], |_: &Args| {
            Err::<Value, _>(PipelineError::Custom("sibling down".into()))
        })
        .with_key("bad")
        .into_node();

        let node = parallel(
            vec![failing, slow("good", 10, "fine")],
            param_fn(["good"], |_: &Args| panic!("reducer must not run")),
        );

        assert!(node.invoke(&Args::new()).await.is_err());
    }

    #[tokio::test]
    async fn ai_parallel_reduces_through_one_inference_call() {
        let backend = Arc::new(ScriptedBackend::echo());
        backend.create_session().await.unwrap();

        let node = ai_parallel(
            backend.clone(),
            param_fn(["one", "two"], |results: &Args| {
                Ok(format!(
                    "Combine these two stories: {} and {}",
                    results["one"].as_str().unwrap(),
                    results["two"].as_str().unwrap()
                ))
            }),
            vec![
                value("Cat").with_key("one").into_node(),
                value("Tree").with_key("two").into_node(),
            ],
        )
        .unwrap();

        let result = node.invoke(&Args::new()).await.unwrap();
        assert_eq!(result, json!("Combine these two stories: Cat and Tree"));
    }
}
