use anyhow::Result;
use dotenv::dotenv;
use reagent::agent::Agent;
use reagent::providers::factory::get_provider;
use reagent::registry::ToolRegistry;
use reagent::tools::stocks::{self, StockClient};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod configuration;
mod routes;
mod state;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let settings = configuration::Settings::new()?;

    let mut registry = ToolRegistry::new();
    stocks::register(&mut registry, StockClient::new(settings.stocks.host.clone())?)?;

    let provider_type = settings.service.provider.provider_type();
    let provider = get_provider(settings.service.provider.into_config())?;
    let agent = Agent::new(provider, registry, settings.service.agent.into_config());
    let state = state::AppState::new(agent);

    // Create router with CORS support
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::configure(state).layer(cors);

    // Run server
    let addr = settings.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%provider_type, "listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
