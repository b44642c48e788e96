use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use flashmind::generation::{GenerationProvider, GenerationService, MockProvider, OpenRouterProvider};
use flashmind::server::{start_server, AppState};
use flashmind::storage::JsonFileGateway;

#[derive(Parser)]
#[command(name = "flashmind", about = "AI-assisted flashcard generation service", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8788")]
        addr: SocketAddr,

        /// Data directory for collections (default: platform data dir)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// OpenRouter API key; without it the canned mock provider is used
        #[arg(long, env = "OPENROUTER_API_KEY")]
        openrouter_api_key: Option<String>,

        /// OpenRouter base URL
        #[arg(long, default_value = "https://openrouter.ai/api/v1")]
        openrouter_base_url: String,

        /// Model to request from OpenRouter
        #[arg(long, default_value = "openai/gpt-4o-mini")]
        model: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            addr,
            data_dir,
            openrouter_api_key,
            openrouter_base_url,
            model,
        } => {
            let data_dir = match data_dir {
                Some(dir) => dir,
                None => JsonFileGateway::default_data_dir()
                    .context("Failed to determine data directory")?,
            };
            let gateway = JsonFileGateway::new(data_dir.clone());
            gateway
                .init()
                .with_context(|| format!("Failed to initialize storage at {:?}", data_dir))?;

            let provider: Arc<dyn GenerationProvider> = match openrouter_api_key {
                Some(api_key) => {
                    log::info!("Using OpenRouter backend (model {})", model);
                    Arc::new(OpenRouterProvider::new(openrouter_base_url, api_key, model)?)
                }
                None => {
                    log::info!("No API key configured, using the mock generation backend");
                    Arc::new(MockProvider)
                }
            };

            let state = Arc::new(AppState::new(
                GenerationService::new(provider),
                Box::new(gateway),
            ));

            let handle = start_server(addr, state).await?;

            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for shutdown signal")?;
            handle.shutdown().await;
        }
    }

    Ok(())
}
