//! Skill registry - catalog of descriptors and their bound handlers
//!
//! Built once at startup and read-only afterwards, so lookups need no
//! locking. The host application supplies the handlers; the registry only
//! stores the binding.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::task::types::SkillOutput;

use super::convert::{self, ToolDef};
use super::types::Skill;

/// A host-supplied function that executes a skill.
///
/// Handlers receive a cancellation token and must observe it themselves;
/// the task manager never preempts a running handler.
#[async_trait]
pub trait SkillHandler: Send + Sync {
    /// Execute the skill with the given opaque input
    async fn execute(
        &self,
        cancel: CancellationToken,
        input: Map<String, Value>,
    ) -> Result<SkillOutput>;
}

/// Adapter that lets plain async closures act as skill handlers
struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> SkillHandler for FnHandler<F>
where
    F: Fn(CancellationToken, Map<String, Value>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<SkillOutput>> + Send + 'static,
{
    async fn execute(
        &self,
        cancel: CancellationToken,
        input: Map<String, Value>,
    ) -> Result<SkillOutput> {
        (self.0)(cancel, input).await
    }
}

/// Wrap an async closure as a [`SkillHandler`]
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn SkillHandler>
where
    F: Fn(CancellationToken, Map<String, Value>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<SkillOutput>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// Catalog of skills and handler bindings
#[derive(Default)]
pub struct SkillRegistry {
    skills: HashMap<String, Skill>,
    handlers: HashMap<String, Arc<dyn SkillHandler>>,
}

impl SkillRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        SkillRegistry::default()
    }

    /// Register a skill descriptor (idempotent upsert by ID)
    pub fn register(&mut self, skill: Skill) {
        self.skills.insert(skill.id.clone(), skill);
    }

    /// Bind a handler to a skill ID
    pub fn bind(&mut self, skill_id: impl Into<String>, handler: Arc<dyn SkillHandler>) {
        self.handlers.insert(skill_id.into(), handler);
    }

    /// Register a skill and bind its handler in one step
    pub fn register_with(&mut self, skill: Skill, handler: Arc<dyn SkillHandler>) {
        self.handlers.insert(skill.id.clone(), handler);
        self.register(skill);
    }

    /// Bulk-adapt an external tool catalog into skills.
    ///
    /// Converted skills carry no handler binding; the host binds them
    /// separately under the transformed (kebab-case) IDs.
    pub fn import_catalog(&mut self, tools: &[ToolDef], default_tags: &[String]) {
        for tool in tools {
            self.register(convert::tool_to_skill(tool, default_tags));
        }
    }

    /// Get a skill descriptor by ID
    pub fn get(&self, skill_id: &str) -> Option<&Skill> {
        self.skills.get(skill_id)
    }

    /// Whether a skill is registered
    pub fn contains(&self, skill_id: &str) -> bool {
        self.skills.contains_key(skill_id)
    }

    /// Get the handler bound to a skill ID
    pub fn handler(&self, skill_id: &str) -> Option<Arc<dyn SkillHandler>> {
        self.handlers.get(skill_id).cloned()
    }

    /// All registered skills, ordered by ID
    pub fn skills(&self) -> Vec<Skill> {
        let mut skills: Vec<Skill> = self.skills.values().cloned().collect();
        skills.sort_by(|a, b| a.id.cmp(&b.id));
        skills
    }

    /// Number of registered skills
    pub fn len(&self) -> usize {
        self.skills.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}
