//! Skill catalog and conversion
//!
//! A skill is what an agent can do: a stable ID, a schema, and a
//! host-supplied handler. The converter bridges plain tool catalogs into
//! the skill format and handler output into task content.

pub mod convert;
pub mod registry;
pub mod types;

pub use convert::ToolDef;
pub use registry::{handler_fn, SkillHandler, SkillRegistry};
pub use types::{
    AgentCapabilities, AgentCard, AuthenticationInfo, InputSchema, OutputSchema, Property,
    ProviderInfo, Skill, SkillExample,
};
