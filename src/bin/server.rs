//! OpenRelay agent server
//!
//! Serves the agent card, health endpoint, and JSON-RPC dispatch over
//! HTTP. Ships a small built-in skillset (`echo`, `sleep`) so the server
//! can be exercised end-to-end without a hosting application; real
//! deployments embed [`openrelay::AgentServer`] and register their own
//! skills.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use openrelay::config::Config;
use openrelay::skill::{handler_fn, InputSchema, Property, Skill, SkillRegistry};
use openrelay::task::{ContentPart, SkillOutput};
use openrelay::AgentServer;
use tracing::info;

#[derive(Parser)]
#[command(name = "openrelay-server", about = "OpenRelay agent-to-agent delegation server")]
struct Args {
    /// Bind address
    #[arg(long, env = "RELAY_BIND", default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, short, env = "RELAY_PORT", default_value_t = 8080)]
    port: u16,

    /// Agent name advertised on the card
    #[arg(long, env = "RELAY_AGENT_NAME")]
    name: Option<String>,

    /// Agent description advertised on the card
    #[arg(long, env = "RELAY_AGENT_DESCRIPTION")]
    description: Option<String>,

    /// Base URL for the agent card (auto-generated if empty)
    #[arg(long, env = "RELAY_BASE_URL")]
    base_url: Option<String>,
}

/// Built-in smoke-test skills
fn builtin_registry() -> SkillRegistry {
    let mut registry = SkillRegistry::new();

    registry.register_with(
        Skill {
            id: "echo".to_string(),
            name: "Echo".to_string(),
            description: "Echo the provided text back as an agent message".to_string(),
            input_schema: InputSchema {
                schema_type: "object".to_string(),
                properties: HashMap::from([(
                    "text".to_string(),
                    Property {
                        property_type: "string".to_string(),
                        description: "Text to echo back".to_string(),
                        enum_values: vec![],
                        default: None,
                    },
                )]),
                required: vec!["text".to_string()],
            },
            output_schema: None,
            tags: vec!["diagnostics".to_string()],
            examples: vec![],
        },
        handler_fn(|_cancel, input| async move {
            let text = input
                .get("text")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            Ok(SkillOutput::text(text))
        }),
    );

    registry.register_with(
        Skill {
            id: "sleep".to_string(),
            name: "Sleep".to_string(),
            description: "Sleep for the given number of seconds, observing cancellation"
                .to_string(),
            input_schema: InputSchema {
                schema_type: "object".to_string(),
                properties: HashMap::from([(
                    "seconds".to_string(),
                    Property {
                        property_type: "integer".to_string(),
                        description: "How long to sleep".to_string(),
                        enum_values: vec![],
                        default: Some("1".to_string()),
                    },
                )]),
                required: vec![],
            },
            output_schema: None,
            tags: vec!["diagnostics".to_string()],
            examples: vec![],
        },
        handler_fn(|cancel, input| async move {
            let seconds = input.get("seconds").and_then(|v| v.as_u64()).unwrap_or(1);
            tokio::select! {
                _ = cancel.cancelled() => Ok(SkillOutput::empty()),
                _ = tokio::time::sleep(Duration::from_secs(seconds)) => {
                    Ok(SkillOutput::default()
                        .push(ContentPart::text(format!("slept {}s", seconds))))
                }
            }
        }),
    );

    registry
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,openrelay=debug".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = Config::default();
    config.server.bind = args.bind;
    config.server.port = args.port;
    config.server.base_url = args.base_url;
    if let Some(name) = args.name {
        config.agent.name = name;
    }
    if let Some(description) = args.description {
        config.agent.description = description;
    }
    config.validate()?;

    let registry = Arc::new(builtin_registry());
    let server = AgentServer::new(&config, registry);

    let card = server.agent_card();
    info!(
        name = %card.name,
        version = %card.version,
        url = %card.url,
        skills = card.skills.len(),
        "agent card ready"
    );
    for skill in &card.skills {
        info!(id = %skill.id, name = %skill.name, "skill available");
    }

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    server.serve(addr).await?;

    Ok(())
}
