//! Wire protocol types
//!
//! JSON-RPC 2.0 envelope, the fixed error-code table, and the
//! request/response shapes for every dispatch method.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;
use crate::skill::types::AgentCard;
use crate::task::manager::TaskStats;
use crate::task::types::{Message, Task, TaskStatus};

/// JSON-RPC version string carried on every envelope
pub const JSONRPC_VERSION: &str = "2.0";

/// Version of the agent delegation protocol itself
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Method names accepted by the dispatch endpoint
pub mod methods {
    pub const AGENT_INFO: &str = "agent/info";
    pub const TASK_CREATE: &str = "tasks/create";
    pub const TASK_GET: &str = "tasks/get";
    pub const TASK_CANCEL: &str = "tasks/cancel";
    pub const TASK_MESSAGE: &str = "tasks/message";
    pub const TASK_LIST: &str = "tasks/list";
}

/// Fixed error-code table
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    pub const TASK_NOT_FOUND: i64 = -32000;
    pub const SKILL_NOT_FOUND: i64 = -32001;
    pub const TASK_CANCELLED: i64 = -32002;
    pub const UNAUTHORIZED: i64 = -32003;
}

/// A JSON-RPC request envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    /// Correlation ID echoed back in the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RpcRequest {
    /// Create a new request
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        RpcRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(Value::from(id)),
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC response envelope.
///
/// Carries exactly one of `result` or `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    /// A successful response echoing the request ID
    pub fn success(id: Option<Value>, result: Value) -> Self {
        RpcResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// An error response echoing the request ID
    pub fn error(id: Option<Value>, error: RpcError) -> Self {
        RpcResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// A JSON-RPC error object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// Create an error with the given code and message
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        RpcError {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl From<Error> for RpcError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::SkillNotFound(_) => codes::SKILL_NOT_FOUND,
            Error::TaskNotFound(_) => codes::TASK_NOT_FOUND,
            Error::TaskExists(_) => codes::INVALID_REQUEST,
            Error::InvalidInput(_) => codes::INVALID_PARAMS,
            Error::Rpc { code, .. } => *code,
            _ => codes::INTERNAL_ERROR,
        };
        RpcError::new(code, err.to_string())
    }
}

/// Params for `tasks/get`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskGetParams {
    pub task_id: String,
}

/// Params for `tasks/cancel`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCancelParams {
    pub task_id: String,
}

/// Params for `tasks/message`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMessageParams {
    pub task_id: String,
    pub message: Message,
}

/// Params for `tasks/list`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}

/// Result wrapper for the task-returning methods
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task: Task,
}

/// Result for `tasks/list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskListResult {
    pub tasks: Vec<Task>,
}

/// Result for `agent/info`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInfoResult {
    pub agent: AgentCard,
}

/// Document served at `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Liveness flag, `"healthy"` while the server answers
    pub status: String,
    pub version: String,
    #[serde(flatten)]
    pub stats: TaskStats,
}
