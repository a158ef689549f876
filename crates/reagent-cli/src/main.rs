use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use dotenv::dotenv;
use reagent::agent::Agent;
use reagent::config::Settings;
use reagent::providers::factory::{get_provider, ProviderType};
use reagent::registry::ToolRegistry;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

mod commands;
mod render;

use reagent::tools::stocks::{self, StockClient, YAHOO_FINANCE_HOST};

/// Round budget when neither the environment nor the command line sets one
const DEFAULT_MAX_ITERATIONS: i64 = 10;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Maximum number of model calls per query
    #[arg(long, global = true)]
    max_iterations: Option<usize>,

    /// Provider option (openai, anthropic, ollama or google)
    #[arg(short, long, global = true, value_parser = parse_provider)]
    provider: Option<ProviderType>,

    /// Run the tool calls of one round concurrently
    #[arg(long, global = true)]
    parallel: bool,

    /// Print every tool request and response
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a single query and exit
    Run {
        /// The question to answer
        query: String,
    },

    /// Ask questions interactively
    Chat,

    /// List the tools the agent can call
    Tools,
}

fn parse_provider(value: &str) -> Result<ProviderType, String> {
    ProviderType::from_str(value).map_err(|_| format!("unknown provider: {}", value))
}

fn load_config(cli: &Cli) -> Result<Config> {
    let config = reagent::config::builder()
        .set_default("agent.max_iterations", DEFAULT_MAX_ITERATIONS)?
        .set_default("stocks.host", YAHOO_FINANCE_HOST)?
        .set_override_option("provider.type", cli.provider.map(|p| p.to_string()))?
        .set_override_option(
            "agent.max_iterations",
            cli.max_iterations.map(|n| n as i64),
        )?
        .set_override_option("agent.parallel_tool_calls", cli.parallel.then_some(true))?
        .build()?;
    Ok(config)
}

fn build_registry(config: &Config) -> Result<ToolRegistry> {
    let host = config
        .get_string("stocks.host")
        .unwrap_or_else(|_| YAHOO_FINANCE_HOST.to_string());
    let mut registry = ToolRegistry::new();
    stocks::register(&mut registry, StockClient::new(host)?)?;
    Ok(registry)
}

fn build_agent(config: &Config, registry: ToolRegistry) -> Result<Agent> {
    let settings = Settings::from_config(config).context("Failed to load settings")?;
    tracing::info!(
        provider = %settings.provider.provider_type(),
        max_iterations = settings.agent.max_iterations,
        "configured agent"
    );
    let provider = get_provider(settings.provider.into_config())?;
    Ok(Agent::new(provider, registry, settings.agent.into_config()))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // Logs go to stderr so answers can be piped
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let registry = build_registry(&config)?;

    match &cli.command {
        Command::Run { query } => {
            let agent = build_agent(&config, registry)?;
            commands::run::execute(&agent, query, cli.verbose).await
        }
        Command::Chat => {
            let agent = build_agent(&config, registry)?;
            commands::chat::execute(&agent, cli.verbose).await
        }
        Command::Tools => commands::tools::execute(&registry),
    }
}
