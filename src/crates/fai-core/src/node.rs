//! The node contract and plain-value leaves
//!
//! A pipeline is a tree of [`Node`]s. Invoking the root with an initial
//! argument set causes each node to invoke its children, bind each child's
//! result under its output key, and compute its own result from the
//! accumulated set. Nodes are immutable once constructed; combinators own
//! their children as [`NodeRef`]s, and the same node instance may appear in
//! several compositions.
//!
//! # Examples
//!
//! ```rust
//! use fai_core::{args, compute, value, Args, Node, NodeExt};
//! use serde_json::{json, Value};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> fai_core::Result<()> {
//! // A literal leaf.
//! let greeting = value("Hello, World!");
//! assert_eq!(greeting.invoke(&Args::new()).await?, json!("Hello, World!"));
//!
//! // A computed leaf that reads a named argument.
//! let shout = compute(["it"], |args: &Args| {
//!     Ok(Value::String(args["it"].as_str().unwrap_or_default().to_uppercase()))
//! });
//! let result = shout.invoke(&args! { "it" => "quiet" }).await?;
//! assert_eq!(result, json!("QUIET"));
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::args::{Args, ParamFn};
use crate::error::Result;

/// Sentinel output key used when a node does not declare one.
pub const DEFAULT_KEY: &str = "it";

/// The unit of composition.
///
/// Contract: callable with a named-argument set; returns exactly one value of
/// unconstrained type or fails. Given identical bindings and no external side
/// effects from the backend, invocation is deterministic.
#[async_trait]
pub trait Node: Send + Sync {
    /// Runs this node against the given argument set.
    async fn invoke(&self, args: &Args) -> Result<Value>;

    /// The name under which this node's result is published for downstream
    /// nodes. Defaults to [`DEFAULT_KEY`].
    fn key(&self) -> &str {
        DEFAULT_KEY
    }
}

/// Shared handle to a node. Children are held this way by every combinator.
pub type NodeRef = Arc<dyn Node>;

/// Convenience conversion from a concrete node into a [`NodeRef`].
pub trait NodeExt: Node {
    /// Wraps this node in an [`Arc`] for use as a child.
    fn into_node(self) -> NodeRef
    where
        Self: Sized + 'static,
    {
        Arc::new(self)
    }
}

impl<N: Node> NodeExt for N {}

pub(crate) fn resolve_key(key: &Option<String>) -> &str {
    key.as_deref().unwrap_or(DEFAULT_KEY)
}

enum Payload {
    Literal(Value),
    Computed(ParamFn<Value>),
}

/// Leaf node producing a literal or computed value without any backend call.
pub struct ValueNode {
    key: Option<String>,
    payload: Payload,
}

impl ValueNode {
    /// Leaf over a fixed value.
    pub fn literal(value: impl Into<Value>) -> Self {
        Self { key: None, payload: Payload::Literal(value.into()) }
    }

    /// Leaf over a host function with a declared parameter list.
    pub fn computed(f: ParamFn<Value>) -> Self {
        Self { key: None, payload: Payload::Computed(f) }
    }

    /// Sets the output key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

#[async_trait]
impl Node for ValueNode {
    async fn invoke(&self, args: &Args) -> Result<Value> {
        match &self.payload {
            Payload::Literal(value) => Ok(value.clone()),
            Payload::Computed(f) => f.call(args),
        }
    }

    fn key(&self) -> &str {
        resolve_key(&self.key)
    }
}

/// Builds a leaf node over a fixed value.
pub fn value(v: impl Into<Value>) -> ValueNode {
    ValueNode::literal(v)
}

/// Builds a leaf node over a host function with a declared parameter list.
///
/// The function is invoked through the binding helper: it receives exactly the
/// declared parameters, with [`Value::Null`] filled in for any that are absent
/// from the argument set.
pub fn compute<P, F>(params: P, f: F) -> ValueNode
where
    P: IntoIterator,
    P::Item: Into<String>,
    F: Fn(&Args) -> Result<Value> + Send + Sync + 'static,
{
    ValueNode::computed(ParamFn::new(params, f))
}
