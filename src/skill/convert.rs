//! Tool ↔ skill conversion
//!
//! Bridges a generic "tool" description format (snake_case names, direct
//! invocation) to the skill format (kebab-case IDs, task-based execution),
//! and turns raw handler output into task messages and artifacts.
//!
//! Everything here is pure and stateless, safe to call concurrently
//! without synchronization.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::task::types::{Artifact, ContentPart, Message, Role, SkillOutput};

use super::types::{
    AgentCapabilities, AgentCard, AuthenticationInfo, InputSchema, Skill, SkillExample,
};

/// An externally supplied tool description, as produced by catalogs that
/// predate the task model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDef {
    /// Tool name (snake_case)
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: InputSchema,
}

/// Convert snake_case to kebab-case.
///
/// The inverse of [`to_snake_case`]; `get_status` → `get-status`.
pub fn to_kebab_case(name: &str) -> String {
    name.replace('_', "-")
}

/// Convert kebab-case back to snake_case
pub fn to_snake_case(id: &str) -> String {
    id.replace('-', "_")
}

/// Convert snake_case to a Title Case display name.
///
/// `get_status` → `Get Status`.
pub fn to_display_name(name: &str) -> String {
    name.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Infer category tags from the first two tokens of a tool name.
///
/// The first token is usually the verb, the second the resource kind.
pub fn infer_tags(tool_name: &str) -> Vec<String> {
    let mut tags = Vec::new();
    let mut parts = tool_name.split('_');

    if let Some(verb) = parts.next() {
        match verb {
            "get" | "list" | "check" | "read" => tags.push("read-only".to_string()),
            "create" | "update" | "delete" | "set" | "write" => tags.push("mutating".to_string()),
            "debug" | "diagnose" => tags.push("debugging".to_string()),
            _ => {}
        }
    }

    if let Some(resource) = parts.next() {
        match resource {
            "status" | "health" | "events" => tags.push("monitoring".to_string()),
            "file" | "files" => tags.push("filesystem".to_string()),
            "task" | "tasks" => tags.push("tasks".to_string()),
            "config" | "contexts" => tags.push("configuration".to_string()),
            "search" | "query" => tags.push("search".to_string()),
            _ => {}
        }
    }

    tags
}

/// Generate example invocations for a converted skill.
///
/// Always includes a bare invocation; adds a parameterized one when the
/// schema declares properties with usable defaults or enums.
pub fn example_invocations(tool: &ToolDef) -> Vec<SkillExample> {
    let mut examples = vec![SkillExample {
        name: "Basic usage".to_string(),
        description: "Invoke with default parameters".to_string(),
        input: serde_json::Map::new(),
    }];

    let mut input = serde_json::Map::new();
    for (name, prop) in &tool.input_schema.properties {
        if let Some(default) = &prop.default {
            input.insert(name.clone(), serde_json::Value::String(default.clone()));
        } else if let Some(first) = prop.enum_values.first() {
            input.insert(name.clone(), serde_json::Value::String(first.clone()));
        }
    }
    if !input.is_empty() {
        examples.push(SkillExample {
            name: "With parameters".to_string(),
            description: "Invoke with specific parameters".to_string(),
            input,
        });
    }

    examples
}

/// Convert a tool description into a skill descriptor.
///
/// The ID transform is reversible; `extra_tags` are prepended before the
/// inferred ones.
pub fn tool_to_skill(tool: &ToolDef, extra_tags: &[String]) -> Skill {
    let mut tags = extra_tags.to_vec();
    tags.extend(infer_tags(&tool.name));

    Skill {
        id: to_kebab_case(&tool.name),
        name: to_display_name(&tool.name),
        description: tool.description.clone(),
        input_schema: tool.input_schema.clone(),
        output_schema: None,
        tags,
        examples: example_invocations(tool),
    }
}

/// Convert a skill descriptor back into a tool description
pub fn skill_to_tool(skill: &Skill) -> ToolDef {
    ToolDef {
        name: to_snake_case(&skill.id),
        description: skill.description.clone(),
        input_schema: skill.input_schema.clone(),
    }
}

/// Convert handler output into task messages and artifacts.
///
/// Content parts are walked in their original order: text parts become
/// agent-authored messages, everything else becomes an artifact that keeps
/// its ordinal index, so the end-to-end order is reconstructible.
pub fn output_to_parts(output: &SkillOutput, skill_id: &str) -> (Vec<Message>, Vec<Artifact>) {
    let mut messages = Vec::new();
    let mut artifacts = Vec::new();
    let now = Utc::now();

    for (index, part) in output.content.iter().enumerate() {
        match part {
            ContentPart::Text { text } => messages.push(Message {
                role: Role::Agent,
                content: vec![ContentPart::text(text.clone())],
                metadata: None,
                timestamp: now,
            }),
            ContentPart::Data { mime_type, data } => artifacts.push(Artifact {
                name: format!("{}-output", skill_id),
                description: None,
                mime_type: mime_type.clone(),
                data: serde_json::Value::String(data.clone()),
                index,
                metadata: None,
                timestamp: now,
            }),
            ContentPart::File { file } => artifacts.push(Artifact {
                name: file.name.clone(),
                description: None,
                mime_type: file.mime_type.clone(),
                data: serde_json::json!({
                    "name": file.name,
                    "mimeType": file.mime_type,
                    "size": file.size,
                    "data": file.data,
                }),
                index,
                metadata: None,
                timestamp: now,
            }),
        }
    }

    (messages, artifacts)
}

/// Assemble an agent card from the registered skills
pub fn agent_card(
    name: impl Into<String>,
    version: impl Into<String>,
    description: impl Into<String>,
    base_url: impl Into<String>,
    skills: Vec<Skill>,
) -> AgentCard {
    AgentCard {
        name: name.into(),
        description: description.into(),
        version: version.into(),
        url: base_url.into(),
        documentation_url: None,
        capabilities: AgentCapabilities {
            streaming: false,
            push_notifications: false,
            state_transition_history: true,
        },
        skills,
        authentication: Some(AuthenticationInfo::none()),
        provider: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::types::FileContent;

    #[test]
    fn test_name_transform_round_trip() {
        for name in ["get_status", "list_open_tasks", "echo", "a_b_c_d"] {
            assert_eq!(to_snake_case(&to_kebab_case(name)), name);
        }
    }

    #[test]
    fn test_display_name() {
        assert_eq!(to_display_name("get_status"), "Get Status");
        assert_eq!(to_display_name("echo"), "Echo");
    }

    #[test]
    fn test_tag_inference_uses_first_two_tokens() {
        assert_eq!(infer_tags("get_status"), vec!["read-only", "monitoring"]);
        assert_eq!(infer_tags("delete_file"), vec!["mutating", "filesystem"]);
        assert_eq!(infer_tags("debug_events"), vec!["debugging", "monitoring"]);
        assert!(infer_tags("frobnicate").is_empty());
    }

    #[test]
    fn test_tool_to_skill() {
        let tool = ToolDef {
            name: "get_status".to_string(),
            description: "Report current status".to_string(),
            input_schema: InputSchema::object(),
        };

        let skill = tool_to_skill(&tool, &["demo".to_string()]);
        assert_eq!(skill.id, "get-status");
        assert_eq!(skill.name, "Get Status");
        assert_eq!(skill.tags, vec!["demo", "read-only", "monitoring"]);
        assert!(!skill.examples.is_empty());

        let back = skill_to_tool(&skill);
        assert_eq!(back.name, tool.name);
        assert_eq!(back.input_schema, tool.input_schema);
    }

    #[test]
    fn test_output_to_parts_preserves_order() {
        let output = SkillOutput::default()
            .push(ContentPart::text("first"))
            .push(ContentPart::data("application/json", "{\"x\":1}"))
            .push(ContentPart::text("second"))
            .push(ContentPart::File {
                file: FileContent {
                    name: "report.txt".to_string(),
                    mime_type: "text/plain".to_string(),
                    size: 4,
                    data: None,
                },
            });

        let (messages, artifacts) = output_to_parts(&output, "demo");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content[0], ContentPart::text("first"));
        assert_eq!(messages[1].content[0], ContentPart::text("second"));
        assert!(messages.iter().all(|m| m.role == Role::Agent));

        // non-text parts keep their source ordinals
        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].index, 1);
        assert_eq!(artifacts[0].name, "demo-output");
        assert_eq!(artifacts[1].index, 3);
        assert_eq!(artifacts[1].name, "report.txt");
    }

    #[test]
    fn test_agent_card_assembly() {
        let card = agent_card("relay", "1.0.0", "demo agent", "http://localhost:9000", vec![]);
        assert_eq!(card.name, "relay");
        assert!(card.capabilities.state_transition_history);
        assert!(!card.capabilities.streaming);
        assert_eq!(card.authentication.unwrap().auth_type, "none");
    }
}
