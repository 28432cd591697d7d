//! Agent delegation wire protocol
//!
//! A single JSON-RPC 2.0 dispatch endpoint carries every method; discovery
//! lives on a separate well-known read path.
//!
//! ## Endpoints
//!
//! - `GET /.well-known/agent.json` - agent card (discovery)
//! - `GET /health` - task statistics plus a liveness flag
//! - `POST /` - JSON-RPC dispatch
//!
//! ## Methods
//!
//! - `agent/info` - agent card over RPC
//! - `tasks/create` - create a task and start executing it
//! - `tasks/get` - task snapshot
//! - `tasks/cancel` - cooperative cancellation
//! - `tasks/message` - append a message
//! - `tasks/list` - task snapshots, optionally filtered by status

pub mod types;

pub use types::{
    codes, methods, AgentInfoResult, HealthResponse, RpcError, RpcRequest, RpcResponse,
    TaskCancelParams, TaskGetParams, TaskListParams, TaskListResult, TaskMessageParams,
    TaskResult, JSONRPC_VERSION, PROTOCOL_VERSION,
};
