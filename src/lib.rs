//! BC Telemetry Buddy: autonomous monitoring agents over Business Central
//! application telemetry.
//!
//! An agent is a named, on-disk unit of configuration and state (see
//! [`context`]) driven by an LLM-backed ReAct loop (see [`runtime`]) that
//! calls telemetry and housekeeping tools (see [`tools`]) and, on its final
//! turn, dispatches zero or more notification/automation actions (see
//! [`actions`]).

pub mod actions;
pub mod config;
pub mod context;
pub mod errors;
pub mod event_bus;
pub mod llm;
#[cfg(feature = "mcp-server")]
pub mod mcp;
pub mod prompt;
pub mod runtime;
pub mod tools;
pub mod types;

/// Convenience re-exports for the most commonly used traits and types.
pub mod prelude {
    pub use crate::actions::dispatch;
    pub use crate::config::{
        ActionsConfig, AgentDefaults, AgentsConfig, CacheConfig, LlmConfig, ProfileConfig,
        SanitizeConfig, WorkspaceConfig,
    };
    pub use crate::context::{create_agent, list_agents, load_state, update_state};
    pub use crate::errors::{BctbError, Result};
    pub use crate::event_bus::{AppEvent, EventBus, NullBus, TokioBroadcastBus};
    pub use crate::llm::{build_provider, LLMProvider};
    pub use crate::runtime::AgentRuntime;
    pub use crate::tools::ToolHandlers;
    pub use crate::types::{AgentOutput, AgentRunLog, AgentState, AgentStatus};
}
