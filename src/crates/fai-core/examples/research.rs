//! A research-report pipeline, runnable offline.
//!
//! Collect context for a request, refine it over two critic passes, derive a
//! diagram and pseudocode from the cached context concurrently, then merge
//! both into one report with a final synthesis call. Runs on the scripted
//! echo backend, so the printed report is the fully rendered prompt chain.
//!
//! ```sh
//! cargo run -p fai-core --example research
//! ```

use std::sync::Arc;

use fai_core::{
    ai_parallel, args, cache, infer, loop_n, param_fn, sequential, transform, Args, BackendRef,
    Node, NodeExt, ScriptedBackend,
};

#[tokio::main]
async fn main() -> fai_core::Result<()> {
    let backend: BackendRef = Arc::new(ScriptedBackend::echo());
    backend.create_session().await?;

    let collector = infer(
        backend.clone(),
        param_fn(["request"], |args: &Args| {
            Ok(format!(
                "Collect relevant context for: {}",
                args["request"].as_str().unwrap_or_default()
            ))
        }),
    )
    .with_key("context")
    .build()?
    .into_node();

    let critic = infer(
        backend.clone(),
        param_fn(["context", "idx"], |args: &Args| {
            Ok(format!(
                "Keep only the essentials (pass {}): {}",
                args["idx"],
                args["context"].as_str().unwrap_or_default()
            ))
        }),
    )
    .with_key("context")
    .build()?
    .into_node();

    let context_full = cache(
        sequential(
            vec![collector, loop_n(critic, 2).with_key("context").into_node()],
            param_fn(["context"], |results: &Args| Ok(results["context"].clone())),
        )?
        .with_key("context")
        .into_node(),
    )
    .with_key("context")
    .into_node();

    let diagram = transform(
        backend.clone(),
        param_fn(["context"], |args: &Args| {
            Ok(format!("Draw a diagram of: {}", args["context"].as_str().unwrap_or_default()))
        }),
        Arc::clone(&context_full),
    )
    .with_key("diagram")
    .build()?
    .into_node();

    let pseudocode = transform(
        backend.clone(),
        param_fn(["context"], |args: &Args| {
            Ok(format!("Write pseudocode for: {}", args["context"].as_str().unwrap_or_default()))
        }),
        context_full,
    )
    .with_key("pseudo")
    .build()?
    .into_node();

    let report = ai_parallel(
        backend,
        param_fn(["diagram", "pseudo"], |results: &Args| {
            Ok(format!(
                "Merge into one report:\n\n{}\n\n{}",
                results["diagram"].as_str().unwrap_or_default(),
                results["pseudo"].as_str().unwrap_or_default()
            ))
        }),
        vec![diagram, pseudocode],
    )?;

    let result = report.invoke(&args! { "request" => "the billing module" }).await?;
    println!("{}", result.as_str().unwrap_or_default());
    Ok(())
}
