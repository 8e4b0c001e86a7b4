//! # fai-llm - HTTP Inference Backend
//!
//! Remote implementation of the `fai-core` [`Backend`](fai_core::Backend)
//! port over any OpenAI-compatible chat-completions endpoint.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fai_llm::{OpenAiBackend, RemoteBackendConfig};
//! use std::sync::Arc;
//!
//! let config = RemoteBackendConfig::from_env("OPENAI_API_KEY", "https://api.openai.com/v1")?;
//! let backend = Arc::new(OpenAiBackend::new(config)?);
//! backend.create_session().await?;
//!
//! let storyteller = fai_core::infer(backend, "Tell a one-line story").build()?;
//! ```

pub mod config;
pub mod openai;

pub use config::RemoteBackendConfig;
pub use openai::OpenAiBackend;
