//! Exception recovery: `catch`
//!
//! Wraps a primary child and a fallback child. The primary runs first; if it
//! fails, the fallback runs with the same argument set plus the caught
//! failure bound under [`ERROR_KEY`]. The primary is never retried here (that
//! is [`retry`](crate::retry)'s job), and a failure raised by the fallback
//! itself propagates.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::args::Args;
use crate::error::Result;
use crate::node::{resolve_key, Node, NodeRef};

/// Key under which the caught failure is bound for the fallback.
pub const ERROR_KEY: &str = "error";

/// Failure-recovery wrapper. See [`catch`].
pub struct CatchNode {
    key: Option<String>,
    primary: NodeRef,
    fallback: NodeRef,
}

impl CatchNode {
    /// Sets the output key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

#[async_trait]
impl Node for CatchNode {
    async fn invoke(&self, args: &Args) -> Result<Value> {
        match self.primary.invoke(args).await {
            Ok(value) => Ok(value),
            Err(err) => {
                debug!(key = self.key(), error = %err, "primary failed, delegating to fallback");
                let mut recovery = args.clone();
                recovery.insert(ERROR_KEY.to_string(), Value::String(err.to_string()));
                self.fallback.invoke(&recovery).await
            }
        }
    }

    fn key(&self) -> &str {
        resolve_key(&self.key)
    }
}

/// Builds a catch node over a primary and a fallback child.
pub fn catch(primary: NodeRef, fallback: NodeRef) -> CatchNode {
    CatchNode { key: None, primary, fallback }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::error::PipelineError;
    use crate::node::{compute, value, NodeExt};
    use serde_json::json;

    fn failing(message: &str) -> NodeRef {
        let message = message.to_string();
        compute([] as [&str; 0], move |_: &Args| {
            Err(PipelineError::Custom(message.clone()))
        })
        .into_node()
    }

    #[tokio::test]
    async fn primary_success_skips_the_fallback() {
        let node = catch(value("fine").into_node(), failing("never runs"));
        assert_eq!(node.invoke(&Args::new()).await.unwrap(), json!("fine"));
    }

    #[tokio::test]
    async fn fallback_sees_the_error_binding() {
        let handler = compute([ERROR_KEY], |args: &Args| {
            Ok(json!(format!("Handled error! {}", args[ERROR_KEY].as_str().unwrap())))
        });

        let node = catch(failing("An error occurred"), handler.into_node());
        let result = node.invoke(&Args::new()).await.unwrap();
        assert_eq!(result, json!("Handled error! An error occurred"));
    }

    #[tokio::test]
    async fn fallback_keeps_the_original_arguments() {
        let handler = compute(["request", ERROR_KEY], |args: &Args| {
            assert_eq!(args["request"], json!("original"));
            assert!(args[ERROR_KEY].is_string());
            Ok(json!("ok"))
        });

        let node = catch(failing("boom"), handler.into_node());
        node.invoke(&args! { "request" => "original" }).await.unwrap();
    }

    #[tokio::test]
    async fn fallback_failure_propagates() {
        let node = catch(failing("first"), failing("second"));
        let err = node.invoke(&Args::new()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Custom(msg) if msg == "second"));
    }
}
