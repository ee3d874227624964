use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use scriptor_core::config::StructuredOutput;
use scriptor_core::{Assistant, Config, QueryResponse, StructuredGenerator};
use scriptor_gateway::GatewayServer;
use scriptor_llm::openai::OpenAiProvider;
use scriptor_llm::provider::JsonMode;
use tokio::sync::watch;

type PaperAssistant = Assistant<OpenAiProvider, OpenAiProvider>;

#[derive(Debug, Parser)]
#[command(name = "scriptor", version, about = "Ask grounded questions about LaTeX papers")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API (default).
    Serve,
    /// Answer one question and print the response as JSON.
    Ask { question: String },
    /// Extract paper metadata from a directory of `.tex` files.
    Extract {
        #[arg(long, default_value = "input")]
        input: PathBuf,
        #[arg(long, default_value = "output")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Extract { input, output } => {
            let written = scriptor_extract::extract_dir(&input, &output).await?;
            tracing::info!(count = written.len(), output = %output.display(), "extraction complete");
            Ok(())
        }
        command => {
            let config_path = resolve_config_path(cli.config.as_deref());
            let config = Config::load(&config_path)
                .with_context(|| format!("loading {}", config_path.display()))?;
            config.validate()?;

            let assistant = build_assistant(&config)?;
            match command {
                Command::Ask { question } => ask(&assistant, &question).await,
                _ => serve(config, assistant).await,
            }
        }
    }
}

async fn ask(assistant: &PaperAssistant, question: &str) -> anyhow::Result<()> {
    let response: QueryResponse = assistant.ask(non_blank(question)?).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn serve(config: Config, assistant: PaperAssistant) -> anyhow::Result<()> {
    if config.gateway.eager_build {
        match assistant.warm_up().await {
            Ok(chunks) => tracing::info!(chunks, "knowledge base ready"),
            Err(e) => tracing::warn!("knowledge base build failed, retrying on first query: {e}"),
        }
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e:#}");
            return;
        }
        tracing::info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    GatewayServer::new(
        &config.gateway.bind,
        config.gateway.port,
        Arc::new(assistant),
        shutdown_rx,
    )
    .with_max_body_size(config.gateway.max_body_size)
    .serve()
    .await?;
    Ok(())
}

fn non_blank(question: &str) -> anyhow::Result<&str> {
    if question.trim().is_empty() {
        anyhow::bail!("question must not be empty");
    }
    Ok(question)
}

fn build_assistant(config: &Config) -> anyhow::Result<PaperAssistant> {
    let generator = StructuredGenerator::new(
        create_generation_provider(config),
        Duration::from_secs(config.llm.timeout_secs),
    )
    .with_json_mode(json_mode(config.llm.structured_output)?);

    Ok(Assistant::new(
        generator,
        Arc::new(create_embedding_provider(config)),
        config.knowledge_base_config(),
        config.corpus.top_k,
    ))
}

fn create_generation_provider(config: &Config) -> OpenAiProvider {
    OpenAiProvider::new(
        config.secrets.api_key.expose().to_owned(),
        config.llm.base_url.clone(),
        config.llm.model.clone(),
        config.llm.max_tokens,
        None,
    )
    .with_temperature(config.llm.temperature)
    .with_timeout(Duration::from_secs(config.llm.timeout_secs))
}

fn create_embedding_provider(config: &Config) -> OpenAiProvider {
    OpenAiProvider::new(
        config.secrets.api_key.expose().to_owned(),
        config.embedding_base_url().to_owned(),
        config.embedding.model.clone(),
        config.llm.max_tokens,
        Some(config.embedding.model.clone()),
    )
    .with_timeout(Duration::from_secs(config.llm.timeout_secs))
    .with_embedding_batch_size(config.embedding.batch_size)
}

fn json_mode(structured_output: StructuredOutput) -> anyhow::Result<JsonMode> {
    Ok(match structured_output {
        StructuredOutput::JsonObject => JsonMode::Object,
        StructuredOutput::JsonSchema => JsonMode::schema_for::<QueryResponse>()
            .context("generating response schema")?,
    })
}

fn resolve_config_path(flag: Option<&Path>) -> PathBuf {
    if let Some(path) = flag {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var("SCRIPTOR_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

fn init_subscriber() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
