//! # fai-core - Declarative LLM Pipeline Composition
//!
//! **Build call graphs out of small, named work units** - compose inference
//! calls, host functions and literal values into arbitrarily deep pipelines
//! with a handful of structural combinators.
//!
//! ## Overview
//!
//! `fai-core` is the node/combinator engine. It provides:
//!
//! - **A uniform node contract** - every unit is invoked with a named-argument
//!   set and publishes one result under its output key
//! - **Async-first design** - non-blocking execution on tokio, with true
//!   concurrency at fan-out boundaries
//! - **Memoization** - in-memory and file-backed caches, keyless or keyed by
//!   an argument fingerprint
//! - **Failure recovery** - `catch` fallbacks and `retry` with a linear
//!   backoff schedule
//! - **Structural composition** - `sequential`, `parallel`, `switch`,
//!   `loop_while`/`loop_n` and the dynamic map-reduce `fork`
//! - **Pluggable backends** - inference goes through the [`Backend`] port;
//!   a [`ScriptedBackend`] test double ships in the crate
//!
//! ## Core Concepts
//!
//! ### 1. Nodes and keys
//!
//! [`Node`] is the unit of composition: `invoke(&Args) -> Result<Value>` plus
//! an output key (default `"it"`). Combinators own their children as
//! [`NodeRef`]s, so any concrete node can appear in any position of the tree.
//!
//! ### 2. Argument binding
//!
//! An [`Args`] map is threaded through every invocation. Host functions are
//! wrapped in [`ParamFn`], which filters the map down to the function's
//! declared parameter names and fills missing ones with `Null` - leaf code
//! never sees undeclared keys.
//!
//! ### 3. Combinators
//!
//! ```text
//!                        +------------+
//!                        |  pipeline  |
//!                        +-----+------+
//!                              |
//!          +---------+---------+---------+----------+
//!          |         |         |         |          |
//!      sequential parallel   switch  loop/fork  cache/retry/catch
//!       (ordered  (fan-out  (either   (repeat/   (wrap one child)
//!       visibility) reduce)  branch)   dynamic)
//! ```
//!
//! Each combinator is itself a node, so they nest freely.
//!
//! ## Quick Start
//!
//! ```rust
//! use fai_core::{args, infer, param_fn, sequential, value, Args, Node, NodeExt};
//! use fai_core::{Backend, ScriptedBackend};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> fai_core::Result<()> {
//!     let backend = Arc::new(ScriptedBackend::echo());
//!     backend.create_session().await?;
//!
//!     let pipeline = sequential(
//!         vec![
//!             value("a walk in the rain").with_key("topic").into_node(),
//!             infer(backend, param_fn(["topic"], |args: &Args| {
//!                 Ok(format!("Write a haiku about {}", args["topic"].as_str().unwrap_or("")))
//!             }))
//!             .with_key("haiku")
//!             .build()?
//!             .into_node(),
//!         ],
//!         param_fn(["haiku"], |results: &Args| Ok(results["haiku"].clone())),
//!     )?;
//!
//!     let result = pipeline.invoke(&args! {}).await?;
//!     assert_eq!(result, json!("Write a haiku about a walk in the rain"));
//!     Ok(())
//! }
//! ```
//!
//! ## See Also
//!
//! - `fai-llm` - HTTP backend adapter implementing the [`Backend`] port
//! - `fai-prompts` - structured prompt-text builder
//! - `fai-cli` - demo binary wiring a pipeline to a real or scripted backend

pub mod args;
pub mod backend;
pub mod cache;
pub mod catch;
pub mod chat;
pub mod error;
pub mod fork;
pub mod infer;
pub mod looping;
pub mod node;
pub mod parallel;
pub mod retry;
pub mod sequential;
pub mod switch;

pub use args::{filter_args, param_fn, Args, ParamFn, Template};
pub use backend::{
    Backend, BackendRef, RunnerHandle, RunnerSpec, ScriptedBackend, Tool, ToolExecutor,
    ToolFuture, DEFAULT_MODEL,
};
pub use cache::{
    cache, fingerprint, keyed_cache, store, CacheEntry, CacheNode, CacheStorage, FileStorage,
    MemoryStorage,
};
pub use catch::{catch, CatchNode, ERROR_KEY};
pub use chat::{chat, ChatInput, ChatNode, ChatOutput, CHAT_HISTORY_KEY, DEFAULT_STOP_WORD};
pub use error::{BackendError, PipelineError, Result, ToolError};
pub use fork::{fork, ForkNode};
pub use infer::{infer, transform, Infer, InferNode, Transform, TransformNode};
pub use looping::{loop_n, loop_while, ListReducer, LoopNode, LoopPredicate, INDEX_KEY};
pub use node::{compute, value, Node, NodeExt, NodeRef, ValueNode, DEFAULT_KEY};
pub use parallel::{ai_parallel, parallel, ParallelNode};
pub use retry::{retry, retry_with, RetryNode, RetryPolicy};
pub use sequential::{sequential, SequentialNode};
pub use switch::{switch, Predicate, SwitchNode};
