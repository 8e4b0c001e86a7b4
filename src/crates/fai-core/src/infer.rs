//! Inference leaves: `infer` and `transform`
//!
//! [`infer`] builds the leaf that delegates to the backend: render the
//! template from the current argument set, hand the prompt to the runner,
//! publish the reply. [`transform`] is the one-child refinement: invoke the
//! child first, bind its result under the child's output key, then run the
//! same render-and-call step: "take that and do this to it" in one node.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use fai_core::{args, infer, param_fn, Args, Backend, Node, ScriptedBackend};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> fai_core::Result<()> {
//! let backend = Arc::new(ScriptedBackend::echo());
//! backend.create_session().await?;
//!
//! let storyteller = infer(
//!     backend.clone(),
//!     param_fn(["x"], |args: &Args| {
//!         Ok(format!("Tell a short story about {}", args["x"].as_str().unwrap_or("a tree")))
//!     }),
//! )
//! .build()?;
//!
//! let reply = storyteller.invoke(&args! { "x" => "a cat" }).await?;
//! assert_eq!(reply, serde_json::json!("Tell a short story about a cat"));
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::args::{Args, Template};
use crate::backend::{BackendRef, RunnerHandle, RunnerSpec, Tool, DEFAULT_MODEL};
use crate::error::Result;
use crate::node::{resolve_key, Node, NodeRef};

/// Builder for an [`InferNode`].
pub struct Infer {
    backend: BackendRef,
    template: Template,
    model: String,
    tools: Vec<Arc<Tool>>,
    schema: Option<Value>,
    key: Option<String>,
}

impl Infer {
    /// Starts a builder over the given backend and template.
    pub fn new(backend: BackendRef, template: impl Into<Template>) -> Self {
        Self {
            backend,
            template: template.into(),
            model: DEFAULT_MODEL.to_string(),
            tools: Vec::new(),
            schema: None,
            key: None,
        }
    }

    /// Overrides the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Binds tools the model may call.
    pub fn with_tools(mut self, tools: Vec<Arc<Tool>>) -> Self {
        self.tools = tools;
        self
    }

    /// Requests structured output matching the given JSON schema. The node
    /// then parses the reply as JSON instead of publishing raw text.
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Sets the output key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Creates the runner handle and finishes the node.
    pub fn build(self) -> Result<InferNode> {
        let structured = self.schema.is_some();
        let runner = self.backend.create_runner(RunnerSpec {
            model: self.model,
            tools: self.tools,
            output_schema: self.schema,
        })?;
        Ok(InferNode {
            key: self.key,
            template: self.template,
            backend: self.backend,
            runner,
            structured,
        })
    }
}

/// Leaf node that renders a prompt and delegates to the inference backend.
pub struct InferNode {
    key: Option<String>,
    template: Template,
    backend: BackendRef,
    runner: RunnerHandle,
    structured: bool,
}

impl InferNode {
    async fn render_and_call(&self, args: &Args) -> Result<Value> {
        let prompt = self.template.render(args)?;
        debug!(key = self.key(), model = %self.runner.spec().model, "calling inference backend");
        let reply = self.backend.call_agent(&prompt, &self.runner).await?;
        if self.structured {
            Ok(serde_json::from_str(&reply)?)
        } else {
            Ok(Value::String(reply))
        }
    }
}

#[async_trait]
impl Node for InferNode {
    async fn invoke(&self, args: &Args) -> Result<Value> {
        self.render_and_call(args).await
    }

    fn key(&self) -> &str {
        resolve_key(&self.key)
    }
}

/// Builds an inference leaf. Configure with the [`Infer`] builder methods,
/// then `build()`.
pub fn infer(backend: BackendRef, template: impl Into<Template>) -> Infer {
    Infer::new(backend, template)
}

/// Builder for a [`TransformNode`].
pub struct Transform {
    inner: Infer,
    child: NodeRef,
}

impl Transform {
    /// Overrides the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.inner = self.inner.with_model(model);
        self
    }

    /// Binds tools the model may call.
    pub fn with_tools(mut self, tools: Vec<Arc<Tool>>) -> Self {
        self.inner = self.inner.with_tools(tools);
        self
    }

    /// Sets the output key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.inner = self.inner.with_key(key);
        self
    }

    /// Creates the runner handle and finishes the node.
    pub fn build(self) -> Result<TransformNode> {
        Ok(TransformNode { child: self.child, infer: self.inner.build()? })
    }
}

/// One-child inference node: the child's result is bound under the child's
/// output key before the template renders.
pub struct TransformNode {
    child: NodeRef,
    infer: InferNode,
}

#[async_trait]
impl Node for TransformNode {
    async fn invoke(&self, args: &Args) -> Result<Value> {
        let result = self.child.invoke(args).await?;
        let mut bound = args.clone();
        bound.insert(self.child.key().to_string(), result);
        self.infer.render_and_call(&bound).await
    }

    fn key(&self) -> &str {
        self.infer.key()
    }
}

/// Builds a transform node over `child`. Configure with the [`Transform`]
/// builder methods, then `build()`.
pub fn transform(backend: BackendRef, template: impl Into<Template>, child: NodeRef) -> Transform {
    Transform { inner: Infer::new(backend, template), child }
}
