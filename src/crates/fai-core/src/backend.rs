//! The inference-backend port and its in-process test double
//!
//! The engine never talks to a model provider directly. Inference nodes hold
//! an explicit [`BackendRef`] (no process-global singleton, so backends are
//! substitutable per test) and speak this three-call protocol:
//!
//! 1. [`Backend::create_session`]: once, before any inference node runs;
//! 2. [`Backend::create_runner`]: at composition time, turning a
//!    [`RunnerSpec`] (model, tools, optional output schema) into a reusable
//!    [`RunnerHandle`];
//! 3. [`Backend::call_agent`]: per invocation, prompt in, final text out.
//!
//! `call_agent` fails with [`BackendError::NoFinalResponse`] when no terminal
//! response is produced and with [`BackendError::Escalated`] when the backend
//! reports it cannot proceed; the two are distinct so `catch`/`retry`
//! wrappers can tell them apart.
//!
//! [`ScriptedBackend`] is the in-process implementation used by tests and the
//! offline examples: it replays a queue of canned replies and records every
//! prompt it was asked.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{BackendError, ToolError};

/// Model identifier used when an inference node does not pick one.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Future type for async tool execution.
pub type ToolFuture = Pin<Box<dyn Future<Output = Result<Value, ToolError>> + Send>>;

/// Tool executor function type.
pub type ToolExecutor = Arc<dyn Fn(Value) -> ToolFuture + Send + Sync>;

/// A callable capability handed to the backend alongside a prompt.
///
/// The backend decides when to call it; the engine only supplies the
/// descriptor (name, description, JSON parameter schema) and the executor.
#[derive(Clone)]
pub struct Tool {
    name: String,
    description: String,
    parameters: Value,
    executor: ToolExecutor,
}

impl Tool {
    /// Creates a tool from its descriptor and executor.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        executor: ToolExecutor,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            executor,
        }
    }

    /// Tool name the model selects by.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human/model-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// JSON schema of the accepted arguments object.
    pub fn parameters(&self) -> &Value {
        &self.parameters
    }

    /// Runs the tool with the arguments the model supplied.
    pub async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        (self.executor)(arguments).await
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Everything needed to build a reusable invocation handle.
#[derive(Clone, Debug)]
pub struct RunnerSpec {
    /// Model identifier, e.g. `"openai/gpt-4o-mini"`.
    pub model: String,
    /// Tools the model may call during this runner's invocations.
    pub tools: Vec<Arc<Tool>>,
    /// Optional JSON schema for structured output.
    pub output_schema: Option<Value>,
}

impl RunnerSpec {
    /// Spec for a plain text runner on the given model.
    pub fn new(model: impl Into<String>) -> Self {
        Self { model: model.into(), tools: Vec::new(), output_schema: None }
    }
}

/// Reusable invocation handle returned by [`Backend::create_runner`].
///
/// Opaque to nodes; backends read the spec back out per call.
#[derive(Clone, Debug)]
pub struct RunnerHandle {
    spec: Arc<RunnerSpec>,
}

impl RunnerHandle {
    /// Wraps a validated spec.
    pub fn new(spec: RunnerSpec) -> Self {
        Self { spec: Arc::new(spec) }
    }

    /// The spec this handle was built from.
    pub fn spec(&self) -> &RunnerSpec {
        &self.spec
    }
}

/// The inference backend collaborator.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Establishes the backend session. Must complete once before any
    /// inference node is invoked.
    async fn create_session(&self) -> Result<(), BackendError>;

    /// Builds a reusable invocation handle for the given spec.
    fn create_runner(&self, spec: RunnerSpec) -> Result<RunnerHandle, BackendError>;

    /// Executes one prompt against the runner and returns the final text.
    async fn call_agent(&self, prompt: &str, runner: &RunnerHandle) -> Result<String, BackendError>;
}

/// Shared handle to a backend, held by every inference node.
pub type BackendRef = Arc<dyn Backend>;

enum Script {
    /// Echo the prompt back. Handy for wiring tests.
    Echo,
    /// Replay canned replies in order; exhaustion is `NoFinalResponse`.
    Replies(Mutex<VecDeque<String>>),
}

/// Scripted in-process backend for tests and offline demos.
///
/// Records every prompt so assertions can inspect what the pipeline actually
/// asked for. Honors the session contract: `call_agent` before
/// `create_session` fails with [`BackendError::SessionMissing`].
pub struct ScriptedBackend {
    script: Script,
    prompts: Mutex<Vec<String>>,
    session: AtomicBool,
}

impl ScriptedBackend {
    /// Backend that echoes each prompt back as the reply.
    pub fn echo() -> Self {
        Self {
            script: Script::Echo,
            prompts: Mutex::new(Vec::new()),
            session: AtomicBool::new(false),
        }
    }

    /// Backend that replays `replies` in order, then reports
    /// [`BackendError::NoFinalResponse`].
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Script::Replies(Mutex::new(replies.into_iter().map(Into::into).collect())),
            prompts: Mutex::new(Vec::new()),
            session: AtomicBool::new(false),
        }
    }

    /// Every prompt received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt log poisoned").clone()
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn create_session(&self) -> Result<(), BackendError> {
        self.session.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn create_runner(&self, spec: RunnerSpec) -> Result<RunnerHandle, BackendError> {
        if spec.model.is_empty() {
            return Err(BackendError::Configuration("empty model identifier".into()));
        }
        Ok(RunnerHandle::new(spec))
    }

    async fn call_agent(&self, prompt: &str, _runner: &RunnerHandle) -> Result<String, BackendError> {
        if !self.session.load(Ordering::SeqCst) {
            return Err(BackendError::SessionMissing);
        }
        self.prompts.lock().expect("prompt log poisoned").push(prompt.to_string());

        match &self.script {
            Script::Echo => Ok(prompt.to_string()),
            Script::Replies(queue) => queue
                .lock()
                .expect("reply queue poisoned")
                .pop_front()
                .ok_or(BackendError::NoFinalResponse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner(backend: &ScriptedBackend) -> RunnerHandle {
        backend.create_runner(RunnerSpec::new(DEFAULT_MODEL)).unwrap()
    }

    #[tokio::test]
    async fn call_before_session_fails() {
        let backend = ScriptedBackend::echo();
        let handle = runner(&backend);
        let err = backend.call_agent("hi", &handle).await.unwrap_err();
        assert!(matches!(err, BackendError::SessionMissing));
    }

    #[tokio::test]
    async fn echo_backend_replays_and_records_prompts() {
        let backend = ScriptedBackend::echo();
        backend.create_session().await.unwrap();
        let handle = runner(&backend);

        let reply = backend.call_agent("tell me a story", &handle).await.unwrap();
        assert_eq!(reply, "tell me a story");
        assert_eq!(backend.prompts(), vec!["tell me a story".to_string()]);
    }

    #[tokio::test]
    async fn exhausted_replies_are_no_final_response() {
        let backend = ScriptedBackend::with_replies(["only one"]);
        backend.create_session().await.unwrap();
        let handle = runner(&backend);

        assert_eq!(backend.call_agent("a", &handle).await.unwrap(), "only one");
        let err = backend.call_agent("b", &handle).await.unwrap_err();
        assert!(matches!(err, BackendError::NoFinalResponse));
    }

    #[tokio::test]
    async fn empty_model_is_a_configuration_error() {
        let backend = ScriptedBackend::echo();
        let err = backend.create_runner(RunnerSpec::new("")).unwrap_err();
        assert!(matches!(err, BackendError::Configuration(_)));
    }

    #[tokio::test]
    async fn tools_execute_through_their_descriptor() {
        let double = Tool::new(
            "double",
            "Doubles a number",
            serde_json::json!({"type": "object", "properties": {"n": {"type": "integer"}}}),
            Arc::new(|input: Value| {
                Box::pin(async move {
                    let n = input["n"].as_i64().ok_or_else(|| ToolError::InvalidArguments {
                        tool: "double".into(),
                        error: "missing integer field 'n'".into(),
                    })?;
                    Ok(Value::from(n * 2))
                }) as ToolFuture
            }),
        );

        let result = double.execute(serde_json::json!({"n": 21})).await.unwrap();
        assert_eq!(result, Value::from(42));
    }
}
