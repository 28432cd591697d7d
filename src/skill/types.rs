//! Skill descriptors and the agent card
//!
//! A skill is a named, schema-described capability an agent advertises.
//! The agent card aggregates the full catalog into the discovery document
//! served at `/.well-known/agent.json`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A capability an agent exposes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    /// Stable identifier (kebab-case)
    pub id: String,
    /// Human-readable name
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub input_schema: InputSchema,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<OutputSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<SkillExample>,
}

/// JSON Schema for skill inputs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub properties: HashMap<String, Property>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl InputSchema {
    /// An object schema with no declared properties
    pub fn object() -> Self {
        InputSchema {
            schema_type: "object".to_string(),
            properties: HashMap::new(),
            required: Vec::new(),
        }
    }
}

/// A single schema property
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "type")]
    pub property_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// Expected output format of a skill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Example invocation shipped with a skill descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillExample {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub input: Map<String, Value>,
}

/// Protocol features an agent supports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    pub streaming: bool,
    pub push_notifications: bool,
    pub state_transition_history: bool,
}

/// Authentication requirements advertised on the card.
///
/// Descriptive only; enforcement is up to the hosting application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationInfo {
    /// "none", "bearer", "oauth2", or "api_key"
    #[serde(rename = "type")]
    pub auth_type: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schemes: Vec<String>,
}

impl AuthenticationInfo {
    /// The open, unauthenticated default
    pub fn none() -> Self {
        AuthenticationInfo {
            auth_type: "none".to_string(),
            required: false,
            schemes: Vec::new(),
        }
    }
}

/// Who operates the agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    pub organization: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// The discovery document describing an agent's capabilities.
///
/// Built once at startup from the registered skills and immutable for the
/// server's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    pub version: String,
    /// Base URL where this agent can be reached
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
    pub capabilities: AgentCapabilities,
    pub skills: Vec<Skill>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<AuthenticationInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderInfo>,
}

impl AgentCard {
    /// Look up a skill by ID
    pub fn skill(&self, id: &str) -> Option<&Skill> {
        self.skills.iter().find(|s| s.id == id)
    }

    /// Whether the card advertises the given skill
    pub fn has_skill(&self, id: &str) -> bool {
        self.skill(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_wire_names() {
        let schema = InputSchema {
            schema_type: "object".to_string(),
            properties: HashMap::from([(
                "namespace".to_string(),
                Property {
                    property_type: "string".to_string(),
                    description: "Target namespace".to_string(),
                    enum_values: vec![],
                    default: Some("default".to_string()),
                },
            )]),
            required: vec!["namespace".to_string()],
        };

        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["type"], "object");
        assert_eq!(json["properties"]["namespace"]["type"], "string");
    }

    #[test]
    fn test_card_skill_lookup() {
        let card = AgentCard {
            name: "demo".to_string(),
            description: String::new(),
            version: "0.1.0".to_string(),
            url: "http://localhost:8080".to_string(),
            documentation_url: None,
            capabilities: AgentCapabilities::default(),
            skills: vec![Skill {
                id: "get-status".to_string(),
                name: "Get Status".to_string(),
                description: String::new(),
                input_schema: InputSchema::object(),
                output_schema: None,
                tags: vec![],
                examples: vec![],
            }],
            authentication: Some(AuthenticationInfo::none()),
            provider: None,
        };

        assert!(card.has_skill("get-status"));
        assert!(!card.has_skill("missing"));
        assert_eq!(card.skill("get-status").unwrap().name, "Get Status");
    }
}
