//! Ordered composition: `sequential`
//!
//! Wraps a non-empty ordered list of children and a reducer. Children run in
//! list order, and each child's result is bound under its output key into the
//! working argument set *before* the next child runs: this is the only
//! combinator where children observe each other's outputs. After the last
//! child, the reducer receives the accumulated keyed results (filtered to its
//! declared parameters).
//!
//! # Examples
//!
//! ```rust
//! use fai_core::{param_fn, sequential, value, Args, Node, NodeExt};
//! use serde_json::{json, Value};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> fai_core::Result<()> {
//! let seq = sequential(
//!     vec![
//!         value("One").with_key("one").into_node(),
//!         value("Two").with_key("two").into_node(),
//!     ],
//!     param_fn(["one", "two"], |results: &Args| {
//!         Ok(json!(format!("Results: {}, {}",
//!             results["one"].as_str().unwrap(),
//!             results["two"].as_str().unwrap())))
//!     }),
//! )?;
//!
//! assert_eq!(seq.invoke(&Args::new()).await?, json!("Results: One, Two"));
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::args::{Args, ParamFn};
use crate::error::{PipelineError, Result};
use crate::node::{resolve_key, Node, NodeRef};

/// Ordered composition node. See [`sequential`].
pub struct SequentialNode {
    key: Option<String>,
    children: Vec<NodeRef>,
    reducer: ParamFn<Value>,
}

impl SequentialNode {
    /// Sets the output key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

#[async_trait]
impl Node for SequentialNode {
    async fn invoke(&self, args: &Args) -> Result<Value> {
        let mut working = args.clone();
        let mut results = Args::new();

        for child in &self.children {
            let value = child.invoke(&working).await?;
            debug!(key = self.key(), child = child.key(), "bound child result");
            working.insert(child.key().to_string(), value.clone());
            results.insert(child.key().to_string(), value);
        }

        self.reducer.call(&results)
    }

    fn key(&self) -> &str {
        resolve_key(&self.key)
    }
}

/// Builds a sequential node.
///
/// Fails with [`PipelineError::Composition`] when `children` is empty.
pub fn sequential(children: Vec<NodeRef>, reducer: ParamFn<Value>) -> Result<SequentialNode> {
    if children.is_empty() {
        return Err(PipelineError::Composition(
            "sequential requires at least one child".into(),
        ));
    }
    Ok(SequentialNode { key: None, children, reducer })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::param_fn;
    use crate::node::{compute, value, NodeExt};
    use serde_json::json;

    #[tokio::test]
    async fn empty_child_list_is_a_composition_error() {
        let err = sequential(vec![], param_fn([] as [&str; 0], |_: &Args| Ok(Value::Null)))
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::Composition(_)));
    }

    #[tokio::test]
    async fn later_children_see_earlier_results() {
        let first = value("seed").with_key("one").into_node();
        let second = compute(["one"], |args: &Args| {
            // Node 2 reads node 1's exact result.
            Ok(json!(format!("{}-grown", args["one"].as_str().unwrap())))
        })
        .with_key("two")
        .into_node();
        let third = compute(["two"], |args: &Args| {
            Ok(json!(format!("{}-done", args["two"].as_str().unwrap())))
        })
        .with_key("three")
        .into_node();

        let seq = sequential(
            vec![first, second, third],
            param_fn(["one", "two", "three"], |results: &Args| {
                assert_eq!(results["one"], json!("seed"));
                assert_eq!(results["two"], json!("seed-grown"));
                assert_eq!(results["three"], json!("seed-grown-done"));
                Ok(results["three"].clone())
            }),
        )
        .unwrap();

        assert_eq!(seq.invoke(&Args::new()).await.unwrap(), json!("seed-grown-done"));
    }

    #[tokio::test]
    async fn each_child_runs_exactly_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let counted = compute([] as [&str; 0], move |_: &Args| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(json!("once"))
        })
        .with_key("counted")
        .into_node();

        let seq = sequential(
            vec![counted],
            param_fn(["counted"], |results: &Args| Ok(results["counted"].clone())),
        )
        .unwrap();

        seq.invoke(&Args::new()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn child_failure_stops_the_chain() {
        use crate::error::PipelineError;

        let first = value("fine").with_key("a").into_node();
        let second = compute([] as [&str; 0], |_: &Args| {
            Err::<Value, _>(PipelineError::Custom("broken".into()))
        })
        .with_key("b")
        .into_node();
        let third = value("unreached").with_key("c").into_node();

        let seq = sequential(
            vec![first, second, third],
            param_fn(["c"], |_: &Args| panic!("reducer must not run")),
        )
        .unwrap();

        assert!(seq.invoke(&Args::new()).await.is_err());
    }
}
