use reagent::config::{builder, load, ConfigError, Settings as AgentServiceSettings};
use reagent::tools::stocks::YAHOO_FINANCE_HOST;
use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[derive(Debug, Deserialize)]
pub struct StockSettings {
    #[serde(default = "default_stocks_host")]
    pub host: String,
}

#[derive(Debug)]
pub struct Settings {
    pub server: ServerSettings,
    pub stocks: StockSettings,
    pub service: AgentServiceSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = builder()
            // Server defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .set_default("stocks.host", default_stocks_host())?
            .build()?;

        Ok(Self {
            server: load(&config, "server")?,
            stocks: load(&config, "stocks")?,
            service: AgentServiceSettings::from_config(&config)?,
        })
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_stocks_host() -> String {
    YAHOO_FINANCE_HOST.to_string()
}
