//! Task data model
//!
//! A task is a unit of delegated work bound to a skill. Unlike a direct
//! tool call, tasks are stateful and can be long-running: they carry a
//! lifecycle status, a message transcript, and structured artifacts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle state of a task.
///
/// Transitions are monotonic: `Pending → Running → {Completed, Failed,
/// Cancelled}`. The three terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Created but not started
    Pending,
    /// Currently executing
    Running,
    /// Finished successfully
    Completed,
    /// Finished with error
    Failed,
    /// Cancelled by the caller
    Cancelled,
}

impl TaskStatus {
    /// Whether this status is terminal (absorbing)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
    System,
}

/// A piece of content in a message or handler output.
///
/// Each kind is a distinct variant so the converter can match
/// exhaustively instead of inspecting type strings at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentPart {
    /// Plain text
    Text { text: String },
    /// Binary or structured payload with an explicit MIME type
    Data {
        #[serde(rename = "mimeType")]
        mime_type: String,
        data: String,
    },
    /// File reference with metadata
    File { file: FileContent },
}

impl ContentPart {
    /// Create a text part
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    /// Create a data part with a MIME type
    pub fn data(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        ContentPart::Data {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }
}

/// File carried inside a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    /// Base64-encoded content, omitted for reference-only files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// A message exchanged during task execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentPart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a message with a single text part
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Message {
            role,
            content: vec![ContentPart::text(text)],
            metadata: None,
            timestamp: Utc::now(),
        }
    }

    /// Create an agent-authored text message
    pub fn agent(text: impl Into<String>) -> Self {
        Self::text(Role::Agent, text)
    }

    /// Create a user-authored text message
    pub fn user(text: impl Into<String>) -> Self {
        Self::text(Role::User, text)
    }
}

/// A structured output produced by a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub mime_type: String,
    pub data: Value,
    /// Position of the source content part in the handler output
    #[serde(default)]
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    pub timestamp: DateTime<Utc>,
}

/// Additional context attached to a task by its requester
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMetadata {
    /// Identity of the agent that created this task
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requesting_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    /// Advisory execution timeout; the manager itself never enforces it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub custom: Map<String, Value>,
}

/// Structured error recorded on a failed task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// A unit of work assigned to an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier, never reassigned
    pub id: String,
    /// Groups related tasks together
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// ID of the skill this task executes
    pub skill: String,
    /// Opaque parameters for the skill handler
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub input: Map<String, Value>,
    pub status: TaskStatus,
    /// Conversation history, append-only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
    /// Outputs produced by the task, append-only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
    #[serde(default)]
    pub metadata: TaskMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Concatenate all text-typed message content, in message order
    pub fn text(&self) -> String {
        let mut out = String::new();
        for message in &self.messages {
            for part in &message.content {
                if let ContentPart::Text { text } = part {
                    out.push_str(text);
                }
            }
        }
        out
    }
}

/// Request to create a new task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreateRequest {
    /// Caller-supplied ID; the manager generates one when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub skill: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub input: Map<String, Value>,
    #[serde(default)]
    pub metadata: TaskMetadata,
}

impl TaskCreateRequest {
    /// Create a request for the given skill with empty input
    pub fn new(skill: impl Into<String>) -> Self {
        TaskCreateRequest {
            skill: skill.into(),
            ..Default::default()
        }
    }

    /// Set the input mapping
    pub fn with_input(mut self, input: Map<String, Value>) -> Self {
        self.input = input;
        self
    }

    /// Set the session ID
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Set a caller-supplied task ID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// The opaque structured result a skill handler returns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillOutput {
    pub content: Vec<ContentPart>,
}

impl SkillOutput {
    /// Output with a single text part
    pub fn text(text: impl Into<String>) -> Self {
        SkillOutput {
            content: vec![ContentPart::text(text)],
        }
    }

    /// Output with no content
    pub fn empty() -> Self {
        SkillOutput::default()
    }

    /// Append a content part
    pub fn push(mut self, part: ContentPart) -> Self {
        self.content.push(part);
        self
    }
}
