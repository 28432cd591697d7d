//! Client for remote agents
//!
//! This is how one agent calls another agent's skills: fetch the card to
//! discover capabilities, create a task, then poll until it reaches a
//! terminal state.
//!
//! ```no_run
//! # use openrelay::client::AgentClient;
//! # use std::time::Duration;
//! # async fn example() -> openrelay::Result<()> {
//! let client = AgentClient::new("http://other-agent:8080")?;
//!
//! let card = client.agent_card().await?;
//! println!("remote skills: {}", card.skills.len());
//!
//! let task = client
//!     .execute_skill("get-status", serde_json::Map::new(), Duration::from_secs(30))
//!     .await?;
//! println!("{}", task.text());
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::protocol::types::{
    methods, AgentInfoResult, HealthResponse, RpcRequest, RpcResponse, TaskCancelParams,
    TaskGetParams, TaskListParams, TaskListResult, TaskMessageParams, TaskResult,
};
use crate::skill::types::{AgentCard, Skill};
use crate::task::types::{Message, Task, TaskCreateRequest, TaskStatus};

/// First poll delay in [`AgentClient::wait_for_task`]
const INITIAL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Poll delay ceiling for the exponential backoff
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default HTTP request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for a remote task-delegation agent
#[derive(Clone)]
pub struct AgentClient {
    /// Base URL of the target agent, without trailing slash
    base_url: String,
    http: reqwest::Client,
    /// Cached discovery document; fetched once, re-fetched only when absent
    card: Arc<RwLock<Option<AgentCard>>>,
    /// Correlation ID counter
    next_id: Arc<AtomicU64>,
}

impl AgentClient {
    /// Create a client for the agent at the given base URL
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_http_client(base_url, http))
    }

    /// Create a client using a preconfigured HTTP client
    pub fn with_http_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        AgentClient {
            base_url,
            http,
            card: Arc::new(RwLock::new(None)),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    // ---- Discovery ----

    /// The remote agent's card, from cache when available
    pub async fn agent_card(&self) -> Result<AgentCard> {
        if let Some(card) = self.card.read().await.clone() {
            return Ok(card);
        }
        self.fetch_agent_card().await
    }

    /// Fetch the agent card from the well-known path, refreshing the cache
    pub async fn fetch_agent_card(&self) -> Result<AgentCard> {
        let url = format!("{}/.well-known/agent.json", self.base_url);
        debug!(url = %url, "fetching agent card");

        let card: AgentCard = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        *self.card.write().await = Some(card.clone());
        Ok(card)
    }

    /// Fetch the agent card over RPC instead of the well-known path
    pub async fn agent_info(&self) -> Result<AgentCard> {
        let result: AgentInfoResult = self.call(methods::AGENT_INFO, None).await?;
        Ok(result.agent)
    }

    /// Whether the remote agent advertises the given skill
    pub async fn has_skill(&self, skill_id: &str) -> Result<bool> {
        Ok(self.agent_card().await?.has_skill(skill_id))
    }

    /// Descriptor of a remote skill
    pub async fn get_skill(&self, skill_id: &str) -> Result<Skill> {
        self.agent_card()
            .await?
            .skill(skill_id)
            .cloned()
            .ok_or_else(|| Error::SkillNotFound(skill_id.to_string()))
    }

    // ---- Task operations ----

    /// Create a task on the remote agent
    pub async fn create_task(&self, skill_id: &str, input: Map<String, Value>) -> Result<Task> {
        self.create_task_with_request(TaskCreateRequest::new(skill_id).with_input(input))
            .await
    }

    /// Create a task with full control over the request
    pub async fn create_task_with_request(&self, req: TaskCreateRequest) -> Result<Task> {
        let params = serde_json::to_value(req)?;
        let result: TaskResult = self.call(methods::TASK_CREATE, Some(params)).await?;
        Ok(result.task)
    }

    /// Current snapshot of a remote task
    pub async fn get_task(&self, task_id: &str) -> Result<Task> {
        let params = serde_json::to_value(TaskGetParams {
            task_id: task_id.to_string(),
        })?;
        let result: TaskResult = self.call(methods::TASK_GET, Some(params)).await?;
        Ok(result.task)
    }

    /// Request cancellation of a remote task
    pub async fn cancel_task(&self, task_id: &str) -> Result<Task> {
        let params = serde_json::to_value(TaskCancelParams {
            task_id: task_id.to_string(),
        })?;
        let result: TaskResult = self.call(methods::TASK_CANCEL, Some(params)).await?;
        Ok(result.task)
    }

    /// Append a message to a remote task
    pub async fn send_message(&self, task_id: &str, message: Message) -> Result<Task> {
        let params = serde_json::to_value(TaskMessageParams {
            task_id: task_id.to_string(),
            message,
        })?;
        let result: TaskResult = self.call(methods::TASK_MESSAGE, Some(params)).await?;
        Ok(result.task)
    }

    /// List remote tasks, optionally filtered by status
    pub async fn list_tasks(&self, status: Option<TaskStatus>) -> Result<Vec<Task>> {
        let params = serde_json::to_value(TaskListParams { status })?;
        let result: TaskListResult = self.call(methods::TASK_LIST, Some(params)).await?;
        Ok(result.tasks)
    }

    // ---- Convenience ----

    /// Create a task and wait for it to complete.
    ///
    /// The simplest way to call a skill synchronously.
    pub async fn execute_skill(
        &self,
        skill_id: &str,
        input: Map<String, Value>,
        timeout: Duration,
    ) -> Result<Task> {
        let task = self.create_task(skill_id, input).await?;
        self.wait_for_task(&task.id, timeout).await
    }

    /// Poll a task until it reaches a terminal state or the deadline.
    ///
    /// Polls on exponential backoff, 100ms doubling up to 2s. On deadline
    /// a best-effort cancel is issued; the remote handler may ignore it,
    /// so the final snapshot is whatever the server reports afterwards.
    pub async fn wait_for_task(&self, task_id: &str, timeout: Duration) -> Result<Task> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut interval = INITIAL_POLL_INTERVAL;

        loop {
            let task = self.get_task(task_id).await?;
            if task.status.is_terminal() {
                return Ok(task);
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                break;
            }
            tokio::time::sleep(interval.min(deadline - now)).await;
            interval = (interval * 2).min(MAX_POLL_INTERVAL);
        }

        warn!(task_id = %task_id, "wait deadline elapsed, requesting cancellation");
        if let Err(e) = self.cancel_task(task_id).await {
            warn!(task_id = %task_id, error = %e, "best-effort cancel failed");
        }
        self.get_task(task_id).await
    }

    /// Execute a skill and return its concatenated text output.
    ///
    /// Fails when the task ends `failed` or `cancelled`.
    pub async fn execute_skill_text(
        &self,
        skill_id: &str,
        input: Map<String, Value>,
        timeout: Duration,
    ) -> Result<String> {
        let task = self.execute_skill(skill_id, input, timeout).await?;

        match task.status {
            TaskStatus::Failed => {
                let message = task
                    .error
                    .map(|e| e.message)
                    .unwrap_or_else(|| "unknown error".to_string());
                Err(Error::Internal(format!("task failed: {}", message)))
            }
            TaskStatus::Cancelled => Err(Error::Internal("task was cancelled".to_string())),
            _ => Ok(task.text()),
        }
    }

    /// Check the remote agent's health endpoint
    pub async fn health(&self) -> Result<HealthResponse> {
        let url = format!("{}/health", self.base_url);
        let health = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(health)
    }

    // ---- JSON-RPC plumbing ----

    /// Make a JSON-RPC call to the remote agent
    async fn call<R: DeserializeOwned>(&self, method: &str, params: Option<Value>) -> Result<R> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = RpcRequest::new(id, method, params);

        debug!(method = %method, id, "rpc call");

        let response: RpcResponse = self
            .http
            .post(format!("{}/", self.base_url))
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(Error::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        let result = response
            .result
            .ok_or_else(|| Error::InvalidInput("rpc response carried no result".to_string()))?;
        Ok(serde_json::from_value(result)?)
    }
}
