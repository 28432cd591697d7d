//! Configuration management for OpenRelay
//!
//! Loads configuration from environment variables, with a `.env` file
//! picked up when present.

use crate::{Error, Result};

/// Identity advertised on the agent card
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Human-readable agent name
    pub name: String,
    /// What this agent does
    pub description: String,
    /// Version reported on the card and health endpoint
    pub version: String,
}

/// HTTP listener configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address
    pub bind: String,
    /// Port to listen on
    pub port: u16,
    /// Base URL for the agent card; auto-generated from the port if unset
    pub base_url: Option<String>,
}

impl ServerConfig {
    /// The base URL advertised on the agent card
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.port))
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level filter
    pub level: String,
    /// Log format (pretty, json)
    pub format: String,
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Agent identity
    pub agent: AgentConfig,
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Logging settings
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            agent: AgentConfig {
                name: "openrelay".to_string(),
                description: "Task-based agent-to-agent delegation server".to_string(),
                version: crate::VERSION.to_string(),
            },
            server: ServerConfig {
                bind: "127.0.0.1".to_string(),
                port: 8080,
                base_url: None,
            },
            log: LogConfig {
                level: "info,openrelay=debug".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        Ok(Config {
            agent: AgentConfig {
                name: std::env::var("RELAY_AGENT_NAME").unwrap_or(defaults.agent.name),
                description: std::env::var("RELAY_AGENT_DESCRIPTION")
                    .unwrap_or(defaults.agent.description),
                version: defaults.agent.version,
            },
            server: ServerConfig {
                bind: std::env::var("RELAY_BIND").unwrap_or(defaults.server.bind),
                port: match std::env::var("RELAY_PORT") {
                    Ok(raw) => raw.parse().map_err(|_| {
                        Error::Config(format!("Invalid RELAY_PORT value: {}", raw))
                    })?,
                    Err(_) => defaults.server.port,
                },
                base_url: std::env::var("RELAY_BASE_URL").ok(),
            },
            log: LogConfig {
                level: std::env::var("RUST_LOG").unwrap_or(defaults.log.level),
                format: std::env::var("LOG_FORMAT").unwrap_or(defaults.log.format),
            },
        })
    }

    /// Validate that the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.agent.name.is_empty() {
            return Err(Error::Config("agent name must not be empty".to_string()));
        }
        if self.server.port == 0 {
            return Err(Error::Config("server port must not be zero".to_string()));
        }
        Ok(())
    }
}
