//! Task lifecycle
//!
//! Tasks are the stateful unit of delegated work: created against a
//! registered skill, executed asynchronously by the manager, and queryable
//! until long after they finish.

pub mod manager;
pub mod types;

pub use manager::{TaskManager, TaskStats, DEFAULT_HISTORY_LIMIT};
pub use types::{
    Artifact, ContentPart, FileContent, Message, Role, SkillOutput, Task, TaskCreateRequest,
    TaskError, TaskMetadata, TaskStatus,
};
