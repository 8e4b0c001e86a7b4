//! Argument sets and the binding discipline between nodes
//!
//! Every pipeline invocation threads an [`Args`] map through the node tree:
//! nodes publish their result under their output key, downstream nodes consume
//! whichever keys they declare. Host functions never see the raw map: they go
//! through [`ParamFn`], which filters the set down to the function's declared
//! parameter list and fills every declared-but-missing name with
//! [`Value::Null`] rather than omitting it.
//!
//! That fill-with-null policy is load-bearing: leaf functions are allowed to
//! branch on receiving an explicit "no value" marker, so a declared parameter
//! is always present when the function runs.
//!
//! # Examples
//!
//! ```rust
//! use fai_core::{args, param_fn, Args};
//! use serde_json::Value;
//!
//! let greet = param_fn(["name", "title"], |args: &Args| {
//!     let name = args["name"].as_str().unwrap_or("stranger");
//!     // "title" was never supplied, but it is still present as Null.
//!     assert!(args["title"].is_null());
//!     Ok(Value::String(format!("Hello, {name}")))
//! });
//!
//! let result = greet.call(&args! { "name" => "Ada", "unrelated" => 42 }).unwrap();
//! assert_eq!(result, Value::String("Hello, Ada".into()));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;

/// The argument set threaded through a pipeline call.
///
/// Keys are unique; later inserts shadow earlier ones. A `BTreeMap` keeps
/// iteration order sorted, which makes the keyed cache's fingerprint of the
/// "sorted argument-set items" a structural property rather than a sort step.
pub type Args = BTreeMap<String, Value>;

/// Builds an [`Args`] map from `key => value` pairs.
///
/// Values go through `serde_json::Value::from`, so literals, strings and
/// pre-built `Value`s all work.
#[macro_export]
macro_rules! args {
    () => { $crate::Args::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::Args::new();
        $( map.insert(($key).to_string(), ::serde_json::Value::from($value)); )+
        map
    }};
}

/// Filters `args` down to exactly the declared parameter names.
///
/// Every name in `params` appears in the output: taken from `args` when
/// present, [`Value::Null`] otherwise. Names outside `params` never pass
/// through. This is the single integration point between the loosely-typed
/// argument set and strongly-typed leaf computations.
pub fn filter_args(params: &[String], args: &Args) -> Args {
    params
        .iter()
        .map(|name| {
            let value = args.get(name).cloned().unwrap_or(Value::Null);
            (name.clone(), value)
        })
        .collect()
}

/// A host closure together with the parameter names it accepts.
///
/// Rust has no runtime parameter introspection, so each wrapped computation
/// declares its accepted parameter set explicitly; [`ParamFn::call`] performs
/// the filter/fill step against that descriptor before invoking the closure.
pub struct ParamFn<T> {
    params: Vec<String>,
    f: Arc<dyn Fn(&Args) -> Result<T> + Send + Sync>,
}

impl<T> ParamFn<T> {
    /// Wraps `f` with its declared parameter list.
    pub fn new<P, F>(params: P, f: F) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        F: Fn(&Args) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            params: params.into_iter().map(Into::into).collect(),
            f: Arc::new(f),
        }
    }

    /// The declared parameter names, in declaration order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Filters `args` to the declared parameters and invokes the closure.
    pub fn call(&self, args: &Args) -> Result<T> {
        let bound = filter_args(&self.params, args);
        (self.f)(&bound)
    }
}

impl<T> Clone for ParamFn<T> {
    fn clone(&self) -> Self {
        Self {
            params: self.params.clone(),
            f: Arc::clone(&self.f),
        }
    }
}

impl<T> fmt::Debug for ParamFn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamFn").field("params", &self.params).finish_non_exhaustive()
    }
}

/// Shorthand for [`ParamFn::new`].
pub fn param_fn<T, P, F>(params: P, f: F) -> ParamFn<T>
where
    P: IntoIterator,
    P::Item: Into<String>,
    F: Fn(&Args) -> Result<T> + Send + Sync + 'static,
{
    ParamFn::new(params, f)
}

/// A prompt template: literal text, or a renderer over the argument set.
///
/// Renderers are [`ParamFn`]s, so a template only sees the parameters it
/// declares and may branch on explicit nulls like any other leaf function.
#[derive(Clone, Debug)]
pub enum Template {
    /// Fixed prompt text.
    Text(String),
    /// Prompt text computed from the argument set.
    Render(ParamFn<String>),
}

impl Template {
    /// Produces the prompt text for the given argument set.
    pub fn render(&self, args: &Args) -> Result<String> {
        match self {
            Template::Text(text) => Ok(text.clone()),
            Template::Render(f) => f.call(args),
        }
    }
}

impl From<&str> for Template {
    fn from(text: &str) -> Self {
        Template::Text(text.to_string())
    }
}

impl From<String> for Template {
    fn from(text: String) -> Self {
        Template::Text(text)
    }
}

impl From<ParamFn<String>> for Template {
    fn from(f: ParamFn<String>) -> Self {
        Template::Render(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_passes_exactly_declared_params() {
        let args = args! { "a" => 1, "b" => 2, "c" => 3 };
        let params = vec!["a".to_string(), "z".to_string()];

        let bound = filter_args(&params, &args);

        assert_eq!(bound.len(), 2);
        assert_eq!(bound["a"], json!(1));
        assert_eq!(bound["z"], Value::Null);
        assert!(!bound.contains_key("b"));
        assert!(!bound.contains_key("c"));
    }

    #[test]
    fn filter_never_fails_on_missing_keys() {
        let params = vec!["missing".to_string()];
        let bound = filter_args(&params, &Args::new());
        assert_eq!(bound["missing"], Value::Null);
    }

    #[test]
    fn param_fn_sees_filled_nulls() {
        let f = param_fn(["present", "absent"], |args: &Args| {
            assert_eq!(args.len(), 2);
            assert!(args["absent"].is_null());
            Ok(args["present"].clone())
        });

        let result = f.call(&args! { "present" => "yes", "extra" => true }).unwrap();
        assert_eq!(result, json!("yes"));
    }

    #[test]
    fn template_renders_literal_and_dynamic() {
        let literal = Template::from("fixed prompt");
        assert_eq!(literal.render(&Args::new()).unwrap(), "fixed prompt");

        let dynamic = Template::from(param_fn(["topic"], |args: &Args| {
            Ok(format!("Tell a story about {}", args["topic"].as_str().unwrap_or("nothing")))
        }));
        let rendered = dynamic.render(&args! { "topic" => "a tree" }).unwrap();
        assert_eq!(rendered, "Tell a story about a tree");
    }

    #[test]
    fn later_inserts_shadow_earlier_ones() {
        let mut args = args! { "it" => "first" };
        args.insert("it".to_string(), json!("second"));
        assert_eq!(args["it"], json!("second"));
    }
}
