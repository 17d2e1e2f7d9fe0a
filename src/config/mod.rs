pub mod loader;
pub mod schema;

pub use loader::{
    atomic_write, initial_profile_name, load_default_workspace_config, load_workspace_config,
    resolve_profile, resolve_workspace_root, visible_profile_names, CONFIG_FILE_NAME,
};
pub use schema::{
    ActionsConfig, AgentDefaults, AgentsConfig, CacheConfig, ExternalReference, LlmConfig,
    ProfileConfig, SanitizeConfig, WorkspaceConfig,
};
