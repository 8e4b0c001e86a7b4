//! Dynamic map-reduce: `fork`
//!
//! Wraps a seed child, a mapper, and a reducer. The seed runs first; its
//! result, bound under the seed's output key, goes to the mapper, which
//! returns a *dynamically constructed* list of child nodes not known at
//! composition time. The generated children run concurrently with the same
//! fan-out discipline as [`parallel`](crate::parallel), against the original
//! argument set, and the reducer runs over the results in generation order.
//!
//! This is the mechanism for "one inference call decides how many follow-up
//! calls to make": the mapper typically parses the seed's answer into a count
//! or a list and builds one child per item.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::args::{Args, ParamFn};
use crate::error::Result;
use crate::looping::ListReducer;
use crate::node::{resolve_key, Node, NodeRef};
use crate::parallel::fan_out;

/// Dynamic fan-out wrapper. See [`fork`].
pub struct ForkNode {
    key: Option<String>,
    seed: NodeRef,
    mapper: ParamFn<Vec<NodeRef>>,
    reducer: ListReducer,
}

impl ForkNode {
    /// Sets the output key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

#[async_trait]
impl Node for ForkNode {
    async fn invoke(&self, args: &Args) -> Result<Value> {
        let seeded = self.seed.invoke(args).await?;

        let mut mapper_args = Args::new();
        mapper_args.insert(self.seed.key().to_string(), seeded);
        let children = self.mapper.call(&mapper_args)?;
        debug!(key = self.key(), children = children.len(), "mapper generated children");

        // Generated children see the original arguments, not the seed result.
        let results = fan_out(&children, args).await?;
        (self.reducer)(&results)
    }

    fn key(&self) -> &str {
        resolve_key(&self.key)
    }
}

/// Builds a fork node over a seed child, a mapper producing the dynamic child
/// list, and a reducer over the generated results.
pub fn fork<R>(seed: NodeRef, mapper: ParamFn<Vec<NodeRef>>, reducer: R) -> ForkNode
where
    R: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
{
    ForkNode { key: None, seed, mapper, reducer: std::sync::Arc::new(reducer) }
}
