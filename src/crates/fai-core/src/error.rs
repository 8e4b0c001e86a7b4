//! Error types for pipeline composition and execution
//!
//! All errors implement `std::error::Error` via the `thiserror` crate.
//!
//! # Error Hierarchy
//!
//! ```text
//! PipelineError
//! ├── Composition     - Invalid pipeline structure (empty child lists, etc.)
//! ├── Binding         - Argument binding / template rendering failures
//! ├── Node            - A named node's own computation failed
//! ├── Backend         - Inference backend failures (see BackendError)
//! ├── Tool            - Tool execution failures (see ToolError)
//! ├── Join            - A fanned-out task panicked or was cancelled
//! ├── Io              - File-backed cache I/O
//! ├── Serialization   - JSON errors
//! └── Custom          - Application-defined errors
//! ```
//!
//! Failures propagate synchronously up the call chain; only
//! [`catch`](crate::catch) converts a failure into a normal value, and only
//! [`retry`](crate::retry) converts a bounded number of failures into
//! delay-and-repeat before re-raising the last one unmodified.

use thiserror::Error;

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Top-level error for pipeline composition and invocation.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The pipeline structure is invalid. Raised at composition time.
    #[error("Pipeline composition failed: {0}")]
    Composition(String),

    /// An argument could not be bound or a template could not be rendered.
    #[error("Argument binding failed: {0}")]
    Binding(String),

    /// A node's computation failed.
    #[error("Node '{key}' failed: {message}")]
    Node {
        /// Output key of the failing node.
        key: String,
        /// Description of the failure.
        message: String,
    },

    /// The inference backend reported a failure.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A tool invoked by the backend failed.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// A fanned-out child task could not be joined (panic or cancellation).
    #[error("Fan-out task failed to join: {0}")]
    Join(String),

    /// I/O failure from the file-backed cache.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Application-defined error.
    #[error("{0}")]
    Custom(String),
}

/// Errors raised by the inference backend collaborator.
///
/// `NoFinalResponse` and `Escalated` are deliberately distinct variants: the
/// first means the backend produced no terminal response at all, the second
/// means it reported that it cannot proceed.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend finished without producing a terminal response.
    #[error("no final response received from the agent")]
    NoFinalResponse,

    /// The backend reported it cannot proceed.
    #[error("agent escalated: {0}")]
    Escalated(String),

    /// `call_agent` was invoked before `create_session`.
    #[error("backend session has not been created")]
    SessionMissing,

    /// The backend was configured incorrectly (missing key, empty model, ...).
    #[error("backend configuration error: {0}")]
    Configuration(String),

    /// The underlying transport failed.
    #[error("backend request failed: {0}")]
    Request(String),

    /// The backend replied with something the adapter cannot interpret.
    #[error("backend returned an invalid response: {0}")]
    InvalidResponse(String),

    /// A tool executed on the backend's behalf failed mid-call.
    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// Errors raised while executing a tool on the backend's behalf.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The model asked for a tool that is not bound to the runner.
    #[error("tool '{tool}' not found")]
    NotFound {
        /// Requested tool name.
        tool: String,
    },

    /// The model supplied arguments the tool cannot parse.
    #[error("invalid arguments for tool '{tool}': {error}")]
    InvalidArguments {
        /// Tool name.
        tool: String,
        /// Description of the argument problem.
        error: String,
    },

    /// The tool ran and failed.
    #[error("tool '{tool}' execution failed: {error}")]
    ExecutionFailed {
        /// Tool name.
        tool: String,
        /// Description of the failure.
        error: String,
    },
}
