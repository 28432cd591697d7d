//! Task manager - the task lifecycle and concurrency core
//!
//! Owns the task store and the cancellation-token table behind a single
//! reader/writer lock. Handlers always run on spawned tasks outside the
//! lock, so a slow handler never blocks unrelated reads or creates.
//!
//! Cancellation is cooperative: `cancel_task` signals the token and marks
//! the task `cancelled` immediately, but the handler keeps running until
//! it observes the signal or finishes. A late successful completion never
//! overwrites the `cancelled` mark.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::skill::convert;
use crate::skill::registry::{SkillHandler, SkillRegistry};

use super::types::{Message, Task, TaskCreateRequest, TaskError, TaskStatus};

/// Default capacity of the terminal-task history ring
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Interval between store polls in [`TaskManager::create_and_execute_sync`]
const SYNC_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Point-in-time task manager statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total_tasks: usize,
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Tasks that currently hold a cancellation token
    pub active_tasks: usize,
    pub history_size: usize,
    pub registered_skills: usize,
}

/// Mutable state guarded by the manager's lock
#[derive(Default)]
struct ManagerState {
    tasks: HashMap<String, Task>,
    /// Cancellation tokens for running tasks, 1:1 by task ID. An entry is
    /// removed exactly once, by completion or cancellation, whichever
    /// happens first.
    active: HashMap<String, CancellationToken>,
    history: VecDeque<Task>,
}

impl ManagerState {
    fn archive(&mut self, task: Task, limit: usize) {
        self.history.push_back(task);
        while self.history.len() > limit {
            self.history.pop_front();
        }
    }
}

/// Manages the lifecycle of tasks
#[derive(Clone)]
pub struct TaskManager {
    registry: Arc<SkillRegistry>,
    state: Arc<RwLock<ManagerState>>,
    history_limit: usize,
}

impl TaskManager {
    /// Create a manager over the given skill registry
    pub fn new(registry: Arc<SkillRegistry>) -> Self {
        TaskManager {
            registry,
            state: Arc::new(RwLock::new(ManagerState::default())),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Override the history ring capacity
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// The registry this manager executes against
    pub fn registry(&self) -> &SkillRegistry {
        &self.registry
    }

    /// Create a new pending task.
    ///
    /// Fails before anything is stored when the skill is unregistered or a
    /// caller-supplied ID collides with an existing task.
    pub async fn create_task(&self, req: TaskCreateRequest) -> Result<Task> {
        if !self.registry.contains(&req.skill) {
            return Err(Error::SkillNotFound(req.skill));
        }

        let mut state = self.state.write().await;

        let task_id = match req.id {
            Some(id) => {
                if state.tasks.contains_key(&id) {
                    return Err(Error::TaskExists(id));
                }
                id
            }
            None => Uuid::new_v4().to_string(),
        };

        let now = Utc::now();
        let task = Task {
            id: task_id.clone(),
            session_id: req.session_id,
            skill: req.skill,
            input: req.input,
            status: TaskStatus::Pending,
            messages: Vec::new(),
            artifacts: Vec::new(),
            metadata: req.metadata,
            error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        state.tasks.insert(task_id.clone(), task.clone());
        info!(task_id = %task_id, skill = %task.skill, "task created");

        Ok(task)
    }

    /// Start executing a pending task.
    ///
    /// Dispatches the bound handler on a spawned tokio task tied to a
    /// fresh cancellation token and returns immediately. Fails if the
    /// task is missing, not pending, or its handler binding is missing.
    pub async fn execute_task(&self, task_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let st = &mut *state;

        let task = st
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;

        if task.status != TaskStatus::Pending {
            return Err(Error::InvalidInput(format!(
                "task {} is not pending (status: {})",
                task_id, task.status
            )));
        }

        let handler = self
            .registry
            .handler(&task.skill)
            .ok_or_else(|| Error::SkillNotFound(format!("no handler bound for skill: {}", task.skill)))?;

        let token = CancellationToken::new();
        st.active.insert(task_id.to_string(), token.clone());

        task.status = TaskStatus::Running;
        task.updated_at = Utc::now();

        let id = task.id.clone();
        let input = task.input.clone();
        drop(state);

        let manager = self.clone();
        tokio::spawn(async move {
            manager.run_handler(id, handler, token, input).await;
        });

        Ok(())
    }

    /// Runs the handler and records the outcome. The handler itself
    /// executes outside the lock; only the bookkeeping re-acquires it.
    async fn run_handler(
        &self,
        task_id: String,
        handler: Arc<dyn SkillHandler>,
        token: CancellationToken,
        input: Map<String, Value>,
    ) {
        debug!(task_id = %task_id, "executing task handler");

        let result = handler.execute(token.clone(), input).await;

        let mut state = self.state.write().await;
        let st = &mut *state;
        st.active.remove(&task_id);

        let task = match st.tasks.get_mut(&task_id) {
            Some(task) => task,
            None => return,
        };

        let now = Utc::now();
        task.updated_at = now;
        task.completed_at = Some(now);

        if task.status == TaskStatus::Cancelled {
            // The cancelled mark is final even when the handler returned a
            // successful result after the fact.
            info!(task_id = %task_id, "task finished after cancellation");
        } else {
            match result {
                Ok(output) => {
                    let (messages, artifacts) = convert::output_to_parts(&output, &task.skill);
                    info!(
                        task_id = %task_id,
                        messages = messages.len(),
                        artifacts = artifacts.len(),
                        "task completed"
                    );
                    task.messages.extend(messages);
                    task.artifacts.extend(artifacts);
                    task.status = TaskStatus::Completed;
                }
                Err(e) => {
                    error!(task_id = %task_id, error = %e, "task failed");
                    task.error = Some(TaskError {
                        code: "EXECUTION_ERROR".to_string(),
                        message: e.to_string(),
                        details: None,
                    });
                    task.status = TaskStatus::Failed;
                }
            }
        }

        let snapshot = task.clone();
        st.archive(snapshot, self.history_limit);
    }

    /// Create a task and start executing it in one call
    pub async fn create_and_execute(&self, req: TaskCreateRequest) -> Result<Task> {
        let task = self.create_task(req).await?;
        self.execute_task(&task.id).await?;
        self.get_task(&task.id).await
    }

    /// Create, execute, and wait for a terminal state.
    ///
    /// Polls the store at a short fixed interval until the task reaches a
    /// terminal state or the deadline elapses. On timeout the task is
    /// cancelled and the resulting snapshot returned.
    pub async fn create_and_execute_sync(
        &self,
        req: TaskCreateRequest,
        timeout: Duration,
    ) -> Result<Task> {
        let task = self.create_and_execute(req).await?;
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let current = self.get_task(&task.id).await?;
            if current.status.is_terminal() {
                return Ok(current);
            }
            if tokio::time::Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(SYNC_POLL_INTERVAL).await;
        }

        self.cancel_task(&task.id).await?;
        self.get_task(&task.id).await
    }

    /// Get a defensive copy of a task by ID
    pub async fn get_task(&self, task_id: &str) -> Result<Task> {
        let state = self.state.read().await;
        state
            .tasks
            .get(task_id)
            .cloned()
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))
    }

    /// Cancel a task.
    ///
    /// Running tasks get their token signalled and are marked `cancelled`
    /// immediately; the mark is final. Terminal tasks are a no-op
    /// returning the unchanged snapshot. A still-pending task is marked
    /// `cancelled` and will never run.
    pub async fn cancel_task(&self, task_id: &str) -> Result<Task> {
        let mut state = self.state.write().await;
        let st = &mut *state;

        let task = st
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;

        if task.status.is_terminal() {
            return Ok(task.clone());
        }

        let now = Utc::now();
        if task.status == TaskStatus::Running {
            if let Some(token) = st.active.remove(task_id) {
                token.cancel();
            }
            task.status = TaskStatus::Cancelled;
            task.updated_at = now;
            info!(task_id = %task_id, "task cancellation requested");
            Ok(task.clone())
        } else {
            // Still pending: never dispatched, so there is no handler to
            // signal. It becomes terminal here and never runs.
            task.status = TaskStatus::Cancelled;
            task.updated_at = now;
            task.completed_at = Some(now);
            let snapshot = task.clone();
            st.archive(snapshot.clone(), self.history_limit);
            info!(task_id = %task_id, "pending task cancelled");
            Ok(snapshot)
        }
    }

    /// Append a server-timestamped message to a task.
    ///
    /// Valid regardless of status, including terminal ones.
    pub async fn add_message(&self, task_id: &str, mut message: Message) -> Result<Task> {
        let mut state = self.state.write().await;

        let task = state
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;

        let now = Utc::now();
        message.timestamp = now;
        task.messages.push(message);
        task.updated_at = now;

        Ok(task.clone())
    }

    /// Snapshot of all tasks, optionally filtered by exact status
    pub async fn list_tasks(&self, status_filter: Option<TaskStatus>) -> Vec<Task> {
        let state = self.state.read().await;
        state
            .tasks
            .values()
            .filter(|task| status_filter.map_or(true, |status| task.status == status))
            .cloned()
            .collect()
    }

    /// Up to `limit` most recent archived terminal tasks, oldest first.
    ///
    /// A limit of zero returns the whole ring.
    pub async fn history(&self, limit: usize) -> Vec<Task> {
        let state = self.state.read().await;
        let len = state.history.len();
        let n = if limit == 0 || limit > len { len } else { limit };
        state.history.iter().skip(len - n).cloned().collect()
    }

    /// Point-in-time statistics under one consistent read
    pub async fn stats(&self) -> TaskStats {
        let state = self.state.read().await;

        let mut stats = TaskStats {
            total_tasks: state.tasks.len(),
            active_tasks: state.active.len(),
            history_size: state.history.len(),
            registered_skills: self.registry.len(),
            ..Default::default()
        };

        for task in state.tasks.values() {
            match task.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::Running => stats.running += 1,
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Failed => stats.failed += 1,
                TaskStatus::Cancelled => stats.cancelled += 1,
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skill::registry::handler_fn;
    use crate::skill::types::{InputSchema, Skill};
    use crate::task::types::SkillOutput;

    fn skill(id: &str) -> Skill {
        Skill {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            input_schema: InputSchema::object(),
            output_schema: None,
            tags: vec![],
            examples: vec![],
        }
    }

    /// Registry with an immediate `echo`, a 50ms `get-status`, and a
    /// `slow` skill that blocks until cancelled
    fn test_registry() -> Arc<SkillRegistry> {
        let mut registry = SkillRegistry::new();

        registry.register_with(
            skill("echo"),
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
            skill("get-status"),
            handler_fn(|_cancel, _input| async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(SkillOutput::text("OK"))
            }),
        );

        registry.register_with(
            skill("slow"),
            handler_fn(|cancel: CancellationToken, _input| async move {
                cancel.cancelled().await;
                Ok(SkillOutput::text("late result"))
            }),
        );

        registry.register_with(
            skill("fails"),
            handler_fn(|_cancel, _input| async move {
                Err(Error::Internal("handler exploded".to_string()))
            }),
        );

        Arc::new(registry)
    }

    async fn wait_terminal(manager: &TaskManager, task_id: &str) -> Task {
        loop {
            let task = manager.get_task(task_id).await.unwrap();
            if task.status.is_terminal() {
                return task;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    #[tokio::test]
    async fn test_sync_execution_completes() {
        let manager = TaskManager::new(test_registry());

        let task = manager
            .create_and_execute_sync(
                TaskCreateRequest::new("get-status"),
                Duration::from_secs(1),
            )
            .await
            .unwrap();

        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.messages.len(), 1);
        assert_eq!(task.messages[0].role, crate::task::types::Role::Agent);
        assert_eq!(task.text(), "OK");
        assert!(task.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_cancelled_mark_survives_late_completion() {
        let manager = TaskManager::new(test_registry());

        let task = manager
            .create_and_execute_sync(TaskCreateRequest::new("slow"), Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Cancelled);

        // Give the handler time to observe the token, exit, and run the
        // completion bookkeeping.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let after = manager.get_task(&task.id).await.unwrap();
        assert_eq!(after.status, TaskStatus::Cancelled);
        assert!(after.messages.is_empty(), "late result must not be recorded");

        // Token entry is gone: nothing is cancellable anymore.
        assert_eq!(manager.stats().await.active_tasks, 0);
    }

    #[tokio::test]
    async fn test_unknown_skill_leaves_no_task_behind() {
        let manager = TaskManager::new(test_registry());

        let result = manager
            .create_task(TaskCreateRequest::new("does-not-exist"))
            .await;
        assert!(matches!(result, Err(Error::SkillNotFound(_))));

        assert!(manager.list_tasks(None).await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_handler_records_task_error() {
        let manager = TaskManager::new(test_registry());

        let task = manager
            .create_and_execute_sync(TaskCreateRequest::new("fails"), Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(task.status, TaskStatus::Failed);
        let err = task.error.expect("structured error recorded");
        assert_eq!(err.code, "EXECUTION_ERROR");
        assert!(err.message.contains("handler exploded"));
    }

    #[tokio::test]
    async fn test_cancel_terminal_task_is_noop() {
        let manager = TaskManager::new(test_registry());

        let task = manager
            .create_and_execute_sync(TaskCreateRequest::new("echo"), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Completed);

        let snapshot = manager.cancel_task(&task.id).await.unwrap();
        assert_eq!(snapshot, manager.get_task(&task.id).await.unwrap());
        assert_eq!(snapshot.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_duplicate_caller_id_rejected() {
        let manager = TaskManager::new(test_registry());

        manager
            .create_task(TaskCreateRequest::new("echo").with_id("fixed-id"))
            .await
            .unwrap();

        let result = manager
            .create_task(TaskCreateRequest::new("echo").with_id("fixed-id"))
            .await;
        assert!(matches!(result, Err(Error::TaskExists(_))));
    }

    #[tokio::test]
    async fn test_cancel_pending_task_prevents_execution() {
        let manager = TaskManager::new(test_registry());

        let task = manager
            .create_task(TaskCreateRequest::new("echo"))
            .await
            .unwrap();
        let cancelled = manager.cancel_task(&task.id).await.unwrap();
        assert_eq!(cancelled.status, TaskStatus::Cancelled);

        let result = manager.execute_task(&task.id).await;
        assert!(result.is_err());
        assert_eq!(
            manager.get_task(&task.id).await.unwrap().status,
            TaskStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_message_order_preserved() {
        let manager = TaskManager::new(test_registry());
        let task = manager
            .create_task(TaskCreateRequest::new("echo"))
            .await
            .unwrap();

        for i in 0..5 {
            manager
                .add_message(&task.id, Message::user(format!("message {}", i)))
                .await
                .unwrap();
        }

        let task = manager.get_task(&task.id).await.unwrap();
        let texts: Vec<String> = task.messages.iter().map(|m| {
            match &m.content[0] {
                crate::task::types::ContentPart::Text { text } => text.clone(),
                other => panic!("unexpected part: {:?}", other),
            }
        }).collect();
        assert_eq!(
            texts,
            (0..5).map(|i| format!("message {}", i)).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_messages_appendable_on_terminal_task() {
        let manager = TaskManager::new(test_registry());
        let task = manager
            .create_and_execute_sync(TaskCreateRequest::new("echo"), Duration::from_secs(1))
            .await
            .unwrap();

        let updated = manager
            .add_message(&task.id, Message::user("post-hoc note"))
            .await
            .unwrap();
        assert_eq!(updated.status, TaskStatus::Completed);
        assert!(updated.text().contains("post-hoc note"));
    }

    #[tokio::test]
    async fn test_history_ring_evicts_oldest() {
        let manager = TaskManager::new(test_registry());

        for i in 0..=DEFAULT_HISTORY_LIMIT {
            let task = manager
                .create_and_execute(
                    TaskCreateRequest::new("echo").with_id(format!("task-{}", i)),
                )
                .await
                .unwrap();
            wait_terminal(&manager, &task.id).await;
        }

        let history = manager.history(DEFAULT_HISTORY_LIMIT).await;
        assert_eq!(history.len(), DEFAULT_HISTORY_LIMIT);
        assert!(!history.iter().any(|t| t.id == "task-0"));
        assert!(history
            .iter()
            .any(|t| t.id == format!("task-{}", DEFAULT_HISTORY_LIMIT)));
    }

    #[tokio::test]
    async fn test_history_limit_subset_is_most_recent() {
        let manager = TaskManager::new(test_registry());

        for i in 0..5 {
            let task = manager
                .create_and_execute(TaskCreateRequest::new("echo").with_id(format!("t-{}", i)))
                .await
                .unwrap();
            wait_terminal(&manager, &task.id).await;
        }

        let recent = manager.history(2).await;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, "t-3");
        assert_eq!(recent[1].id, "t-4");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_independent_tasks_complete_concurrently() {
        let manager = TaskManager::new(test_registry());

        let mut ids = Vec::new();
        for i in 0..10 {
            let mut input = Map::new();
            input.insert("text".to_string(), Value::String(format!("task {}", i)));
            let task = manager
                .create_and_execute(TaskCreateRequest::new("echo").with_input(input))
                .await
                .unwrap();
            ids.push(task.id);
        }

        let tasks = futures::future::join_all(
            ids.iter().map(|id| wait_terminal(&manager, id)),
        )
        .await;

        assert!(tasks.iter().all(|t| t.status == TaskStatus::Completed));

        let stats = manager.stats().await;
        assert_eq!(stats.completed, 10);
        assert_eq!(stats.active_tasks, 0);
        assert_eq!(stats.registered_skills, 4);
    }

    #[tokio::test]
    async fn test_status_filter() {
        let manager = TaskManager::new(test_registry());

        manager
            .create_task(TaskCreateRequest::new("echo"))
            .await
            .unwrap();
        let done = manager
            .create_and_execute_sync(TaskCreateRequest::new("echo"), Duration::from_secs(1))
            .await
            .unwrap();

        let pending = manager.list_tasks(Some(TaskStatus::Pending)).await;
        assert_eq!(pending.len(), 1);

        let completed = manager.list_tasks(Some(TaskStatus::Completed)).await;
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, done.id);

        assert_eq!(manager.list_tasks(None).await.len(), 2);
    }
}
