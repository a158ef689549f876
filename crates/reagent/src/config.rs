//! Settings loaded from `REAGENT_*` environment variables.
//!
//! Sections are nested with a double underscore, so the provider type is read
//! from `REAGENT_PROVIDER__TYPE` and the round budget from
//! `REAGENT_AGENT__MAX_ITERATIONS`. Binaries layer their own sections and
//! command line overrides on top of [`builder`].
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::agent::AgentConfig;
use crate::providers::configs::{
    AnthropicProviderConfig, GoogleProviderConfig, OllamaProviderConfig, OpenAiProviderConfig,
    ProviderConfig, ANTHROPIC_HOST, ANTHROPIC_MODEL, GOOGLE_HOST, GOOGLE_MODEL, OLLAMA_HOST,
    OLLAMA_MODEL, OPENAI_HOST, OPENAI_MODEL,
};
use crate::providers::factory::ProviderType;

pub const ENV_PREFIX: &str = "REAGENT";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// The environment variable that sets a dotted config key
pub fn to_env_var(key: &str) -> String {
    let path: Vec<String> = key
        .split('.')
        .filter(|part| !part.is_empty())
        .map(|part| part.to_uppercase())
        .collect();
    format!("{}_{}", ENV_PREFIX, path.join("__"))
}

/// A config builder reading the `REAGENT_` environment
pub fn builder() -> ConfigBuilder<DefaultState> {
    Config::builder().add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    )
}

/// Deserialize one section, reporting missing fields by their environment variable
pub fn load<T: DeserializeOwned>(config: &Config, section: &str) -> Result<T, ConfigError> {
    match config.get::<T>(section) {
        Ok(value) => Ok(value),
        Err(err) => {
            tracing::debug!("Configuration error: {:?}", &err);

            // Extract field name from error message "missing field `type`"
            let message = err.to_string();
            if let Some(rest) = message.split("missing field `").nth(1) {
                let field = rest.split('`').next().unwrap_or_default();
                let env_var = to_env_var(&format!("{}.{}", section, field));
                Err(ConfigError::MissingEnvVar { env_var })
            } else if let config::ConfigError::NotFound(_) = &err {
                // The whole section is absent, point at its first required key
                let env_var = to_env_var(&format!("{}.{}", section, required_key(section)));
                Err(ConfigError::MissingEnvVar { env_var })
            } else {
                Err(ConfigError::Other(err))
            }
        }
    }
}

fn required_key(section: &str) -> &'static str {
    match section {
        "provider" => "type",
        "agent" => "max_iterations",
        _ => "",
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum ProviderSettings {
    OpenAi {
        #[serde(default = "default_openai_host")]
        host: String,
        api_key: String,
        #[serde(default = "default_openai_model")]
        model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
    Anthropic {
        #[serde(default = "default_anthropic_host")]
        host: String,
        api_key: String,
        #[serde(default = "default_anthropic_model")]
        model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
    Ollama {
        #[serde(default = "default_ollama_host")]
        host: String,
        #[serde(default = "default_ollama_model")]
        model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
    Google {
        #[serde(default = "default_google_host")]
        host: String,
        api_key: String,
        #[serde(default = "default_google_model")]
        model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
}

impl ProviderSettings {
    pub fn provider_type(&self) -> ProviderType {
        match self {
            ProviderSettings::OpenAi { .. } => ProviderType::OpenAi,
            ProviderSettings::Anthropic { .. } => ProviderType::Anthropic,
            ProviderSettings::Ollama { .. } => ProviderType::Ollama,
            ProviderSettings::Google { .. } => ProviderType::Google,
        }
    }

    pub fn into_config(self) -> ProviderConfig {
        match self {
            ProviderSettings::OpenAi {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
            } => ProviderConfig::OpenAi(OpenAiProviderConfig {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
            }),
            ProviderSettings::Anthropic {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
            } => ProviderConfig::Anthropic(AnthropicProviderConfig {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
            }),
            ProviderSettings::Ollama {
                host,
                model,
                temperature,
                max_tokens,
            } => ProviderConfig::Ollama(OllamaProviderConfig {
                host,
                model,
                temperature,
                max_tokens,
            }),
            ProviderSettings::Google {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
            } => ProviderConfig::Google(GoogleProviderConfig {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentSettings {
    pub max_iterations: usize,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub parallel_tool_calls: bool,
    #[serde(default)]
    pub model_timeout_secs: Option<u64>,
    #[serde(default)]
    pub tool_timeout_secs: Option<u64>,
}

impl AgentSettings {
    pub fn into_config(self) -> AgentConfig {
        AgentConfig {
            max_iterations: self.max_iterations,
            system_prompt: self.system_prompt,
            parallel_tool_calls: self.parallel_tool_calls,
            model_timeout: self.model_timeout_secs.map(Duration::from_secs),
            tool_timeout: self.tool_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// The provider and agent sections every binary needs
#[derive(Debug, Clone)]
pub struct Settings {
    pub provider: ProviderSettings,
    pub agent: AgentSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_config(&builder().build()?)
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            provider: load(config, "provider")?,
            agent: load(config, "agent")?,
        })
    }
}

fn default_openai_host() -> String {
    OPENAI_HOST.to_string()
}

fn default_openai_model() -> String {
    OPENAI_MODEL.to_string()
}

fn default_anthropic_host() -> String {
    ANTHROPIC_HOST.to_string()
}

fn default_anthropic_model() -> String {
    ANTHROPIC_MODEL.to_string()
}

fn default_ollama_host() -> String {
    OLLAMA_HOST.to_string()
}

fn default_ollama_model() -> String {
    OLLAMA_MODEL.to_string()
}

fn default_google_host() -> String {
    GOOGLE_HOST.to_string()
}

fn default_google_model() -> String {
    GOOGLE_MODEL.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("REAGENT_") {
                env::remove_var(&key);
            }
        }
    }

    #[test]
    fn test_to_env_var() {
        assert_eq!(to_env_var("provider.api_key"), "REAGENT_PROVIDER__API_KEY");
        assert_eq!(to_env_var("agent.max_iterations"), "REAGENT_AGENT__MAX_ITERATIONS");
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();
        env::set_var("REAGENT_PROVIDER__TYPE", "openai");
        env::set_var("REAGENT_PROVIDER__API_KEY", "test-key");
        env::set_var("REAGENT_AGENT__MAX_ITERATIONS", "10");

        let settings = Settings::new().unwrap();

        if let ProviderSettings::OpenAi {
            host,
            api_key,
            model,
            temperature,
            max_tokens,
        } = settings.provider
        {
            assert_eq!(host, "https://api.openai.com");
            assert_eq!(api_key, "test-key");
            assert_eq!(model, "gpt-4o");
            assert_eq!(temperature, None);
            assert_eq!(max_tokens, None);
        } else {
            panic!("Expected OpenAI provider");
        }

        let agent = settings.agent.into_config();
        assert_eq!(agent, AgentConfig::new(10));

        clean_env();
    }

    #[test]
    #[serial]
    fn test_ollama_settings() {
        clean_env();
        env::set_var("REAGENT_PROVIDER__TYPE", "ollama");
        env::set_var("REAGENT_PROVIDER__MODEL", "qwen2.5");
        env::set_var("REAGENT_PROVIDER__TEMPERATURE", "0.7");
        env::set_var("REAGENT_PROVIDER__MAX_TOKENS", "2000");
        env::set_var("REAGENT_AGENT__MAX_ITERATIONS", "4");
        env::set_var("REAGENT_AGENT__PARALLEL_TOOL_CALLS", "true");
        env::set_var("REAGENT_AGENT__TOOL_TIMEOUT_SECS", "30");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.provider.provider_type(), ProviderType::Ollama);

        match settings.provider.into_config() {
            ProviderConfig::Ollama(config) => {
                assert_eq!(config.host, "http://localhost:11434");
                assert_eq!(config.model, "qwen2.5");
                assert_eq!(config.temperature, Some(0.7));
                assert_eq!(config.max_tokens, Some(2000));
            }
            other => panic!("Expected Ollama provider, got {:?}", other),
        }

        let agent = settings.agent.into_config();
        assert_eq!(agent.max_iterations, 4);
        assert!(agent.parallel_tool_calls);
        assert_eq!(agent.tool_timeout, Some(Duration::from_secs(30)));

        clean_env();
    }

    #[test]
    #[serial]
    fn test_missing_api_key() {
        clean_env();
        env::set_var("REAGENT_PROVIDER__TYPE", "anthropic");
        env::set_var("REAGENT_AGENT__MAX_ITERATIONS", "10");

        match Settings::new() {
            Err(ConfigError::MissingEnvVar { env_var }) => {
                assert_eq!(env_var, "REAGENT_PROVIDER__API_KEY");
            }
            other => panic!("Expected missing env var, got {:?}", other),
        }

        clean_env();
    }

    #[test]
    #[serial]
    fn test_missing_sections() {
        clean_env();

        match Settings::new() {
            Err(ConfigError::MissingEnvVar { env_var }) => {
                assert_eq!(env_var, "REAGENT_PROVIDER__TYPE");
            }
            other => panic!("Expected missing env var, got {:?}", other),
        }

        env::set_var("REAGENT_PROVIDER__TYPE", "ollama");
        match Settings::new() {
            Err(ConfigError::MissingEnvVar { env_var }) => {
                assert_eq!(env_var, "REAGENT_AGENT__MAX_ITERATIONS");
            }
            other => panic!("Expected missing env var, got {:?}", other),
        }

        clean_env();
    }

    #[test]
    #[serial]
    fn test_overrides_beat_environment() {
        clean_env();
        env::set_var("REAGENT_PROVIDER__TYPE", "google");
        env::set_var("REAGENT_PROVIDER__API_KEY", "test-key");
        env::set_var("REAGENT_AGENT__MAX_ITERATIONS", "10");

        let config = builder()
            .set_override("agent.max_iterations", 3)
            .unwrap()
            .build()
            .unwrap();
        let settings = Settings::from_config(&config).unwrap();

        assert_eq!(settings.agent.max_iterations, 3);
        assert_eq!(settings.provider.provider_type(), ProviderType::Google);

        clean_env();
    }
}
