//! # fai
//!
//! Demo binary for fai pipelines: runs a small map-reduce pipeline or an
//! interactive chat against either the scripted offline backend or a real
//! OpenAI-compatible endpoint.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use fai_core::{
    chat, fork, infer, param_fn, retry, transform, Args, BackendRef, Node, NodeExt,
    ScriptedBackend,
};
use fai_llm::{OpenAiBackend, RemoteBackendConfig};
use fai_prompts::PromptBuilder;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "fai")]
#[command(about = "fai - Declarative LLM pipeline demos", long_about = None)]
#[command(version)]
struct Cli {
    /// Run against the scripted offline backend instead of a real endpoint
    #[arg(long, global = true)]
    offline: bool,

    /// Base URL of the chat-completions endpoint
    #[arg(long, global = true, env = "FAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    base_url: String,

    /// Environment variable holding the API key
    #[arg(long, global = true, env = "FAI_API_KEY_ENV", default_value = "OPENAI_API_KEY")]
    api_key_env: String,

    /// Model identifier
    #[arg(long, global = true, env = "FAI_MODEL", default_value = "openai/gpt-4o-mini")]
    model: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a fictional universe: one call invents it, a dynamic fan-out
    /// reports on each aspect, one more call merges the reports
    Universe {
        /// Seed topic for the universe
        #[arg(default_value = "a water world with floating cities")]
        topic: String,

        /// Number of aspects to expand
        #[arg(short, long, default_value_t = 3)]
        aspects: usize,
    },

    /// Chat with an assistant; say "!done" to finish
    Chat,
}

async fn build_backend(cli: &Cli) -> anyhow::Result<BackendRef> {
    let backend: BackendRef = if cli.offline {
        Arc::new(ScriptedBackend::echo())
    } else {
        let config = RemoteBackendConfig::from_env(&cli.api_key_env, cli.base_url.clone())
            .context("remote backend configuration")?;
        Arc::new(OpenAiBackend::new(config)?)
    };
    backend.create_session().await?;
    Ok(backend)
}

async fn run_universe(
    backend: BackendRef,
    model: &str,
    topic: &str,
    aspects: usize,
) -> anyhow::Result<Value> {
    let inventor = infer(
        backend.clone(),
        param_fn(["topic"], |args: &Args| {
            Ok(PromptBuilder::new()
                .text("Invent a science-fiction universe for the given topic.")
                .text("Describe it in one paragraph.")
                .dash()
                .text(args["topic"].as_str().unwrap_or("an empty void"))
                .prompt())
        }),
    )
    .with_model(model)
    .with_key("universe")
    .build()?
    .into_node();

    let report_backend = backend.clone();
    let report_model = model.to_string();
    let reporter = fork(
        inventor,
        param_fn(["universe"], move |args: &Args| {
            let universe = args["universe"].as_str().unwrap_or_default().to_string();
            (0..aspects)
                .map(|i| {
                    let prompt = PromptBuilder::new()
                        .text(format!("Write a short report on aspect {i} of this universe."))
                        .dash()
                        .text(&universe)
                        .prompt();
                    Ok(infer(report_backend.clone(), prompt)
                        .with_model(&report_model)
                        .with_key(format!("report_{i}"))
                        .build()?
                        .into_node())
                })
                .collect()
        }),
        |reports| {
            let joined = reports
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("\n\n");
            Ok(Value::String(joined))
        },
    )
    .with_key("reports")
    .into_node();

    let summary = transform(
        backend.clone(),
        param_fn(["reports"], |args: &Args| {
            Ok(PromptBuilder::new()
                .text("Merge the reports into one comprehensive overview.")
                .dash()
                .text(args["reports"].as_str().unwrap_or_default())
                .prompt())
        }),
        reporter,
    )
    .with_model(model)
    .with_key("overview")
    .build()?
    .into_node();

    let pipeline = retry(summary);
    let result = pipeline
        .invoke(&fai_core::args! { "topic" => topic })
        .await?;
    Ok(result)
}

async fn run_chat(backend: BackendRef, model: &str) -> anyhow::Result<Value> {
    let agent = infer(
        backend,
        param_fn(["chat_history"], |args: &Args| {
            let history = args["chat_history"].as_array().cloned().unwrap_or_default();
            Ok(PromptBuilder::new()
                .text("You are a friendly assistant. Keep replies short.")
                .text("When the conversation is complete, print the stop word: !done")
                .dash()
                .chat(&history)
                .prompt())
        }),
    )
    .with_model(model)
    .build()?
    .into_node();

    let driver = chat(retry(agent).into_node()).with_output(|line| println!("assistant> {line}"));
    let transcript = driver.invoke(&Args::new()).await?;
    Ok(transcript)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(rust_log).init();

    let cli = Cli::parse();
    let backend = build_backend(&cli).await?;

    match &cli.command {
        Commands::Universe { topic, aspects } => {
            tracing::info!(topic = %topic, aspects = *aspects, "running universe pipeline");
            let overview = run_universe(backend, &cli.model, topic, *aspects).await?;
            println!("{}", overview.as_str().unwrap_or_default());
        }
        Commands::Chat => {
            let transcript = run_chat(backend, &cli.model).await?;
            tracing::info!(
                utterances = transcript.as_array().map_or(0, Vec::len),
                "conversation finished"
            );
        }
    }

    Ok(())
}
