use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use futures::StreamExt;
use ponder_agent::{AgentEvent, AgentExecutor};
use ponder_core::{CompletionLlm, FunctionTool, ToolError, TracingCallbackHandler};
use ponder_llm::{OllamaClient, OpenAiCompatibleClient};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Provider {
    Ollama,
    Openai,
}

/// Answers a question with a ReAct agent that can measure text.
#[derive(Debug, Parser)]
#[command(name = "react_agent", version)]
struct Args {
    /// Question for the agent.
    #[arg(default_value = "What is the length of the text: 'Hello, Leo!'?")]
    task: String,

    #[arg(long, env = "PONDER_PROVIDER", value_enum, default_value = "ollama")]
    provider: Provider,

    /// Defaults to the provider's usual endpoint.
    #[arg(long, env = "PONDER_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "PONDER_MODEL")]
    model: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "PONDER_MAX_ITERATIONS", default_value_t = 5)]
    max_iterations: usize,
}

fn get_text_length(text: &str) -> Result<String, ToolError> {
    let text = text.trim_matches(|c| c == '\'' || c == '\n').trim_matches('"');
    if text.is_empty() {
        return Err(ToolError::InvalidInput("expected some text to measure".to_string()));
    }
    Ok(text.chars().count().to_string())
}

fn completion_client(args: &Args) -> anyhow::Result<Arc<dyn CompletionLlm>> {
    let client: Arc<dyn CompletionLlm> = match args.provider {
        Provider::Ollama => Arc::new(OllamaClient::new(
            args.base_url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            args.model.clone().unwrap_or_else(|| "llama3.1".to_string()),
        )?),
        Provider::Openai => {
            let api_key = args
                .api_key
                .clone()
                .context("OPENAI_API_KEY must be set for the openai provider")?;
            let mut builder = OpenAiCompatibleClient::builder()
                .api_key(api_key)
                .model(args.model.clone().unwrap_or_else(|| "gpt-4o-mini".to_string()));
            if let Some(base_url) = &args.base_url {
                builder = builder.base_url(base_url.clone());
            }
            Arc::new(builder.build()?)
        }
    };
    Ok(client)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let agent = AgentExecutor::builder()
        .shared_llm(completion_client(&args)?)
        .tool(FunctionTool::new(
            "get_text_length",
            "Returns the length of a text by characters",
            get_text_length,
        ))
        .max_iterations(Some(args.max_iterations))
        .callback(Arc::new(TracingCallbackHandler))
        .build()?;

    let mut events = agent.run_stream(args.task.as_str());
    while let Some(event) = events.next().await {
        match event? {
            AgentEvent::ModelResponded { step, text } => println!("[{step}] {text}"),
            AgentEvent::ToolCompleted {
                step,
                tool,
                observation,
                ..
            } => println!("[{step}] {tool} -> {observation}"),
            AgentEvent::Finished(output) => {
                println!("{}", output.output().unwrap_or_default());
            }
            AgentEvent::StepStarted { .. } | AgentEvent::ToolDispatched { .. } => {}
        }
    }
    Ok(())
}
