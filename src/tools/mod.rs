//! Tool Handlers: a single `execute(toolName, args) -> Value` dispatch
//! surface (§4.2), shared identically by the agent runtime's tool-calling
//! loop, the CLI, and the MCP server.

pub mod auth;
pub mod cache;
pub mod catalog;
pub mod definitions;
pub mod external_queries;
pub mod profiles;
pub mod query;
pub mod recommendations;
pub mod saved_queries;
pub mod tenant;

pub use cache::QueryCache;
pub use definitions::{all_tool_descriptors, read_only_tool_names, to_tool_def, ToolDescriptor};
pub use query::QueryClient;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::config::{resolve_profile, ProfileConfig, WorkspaceConfig};
use crate::errors::{BctbError, Result};
use crate::event_bus::{profile_hash, AppEvent, EventBus};

/// Owns everything scoped to the *active* connection profile: its query
/// cache, HTTP client, and the workspace root saved queries live under.
/// `switch_profile` replaces this wholesale rather than mutating it
/// piecemeal (§4.2.3: "replaces ... all owned services").
pub struct ProfileServices {
    pub name: String,
    pub profile: ProfileConfig,
    pub cache: QueryCache,
    pub query_client: QueryClient,
    pub http_client: reqwest::Client,
}

impl ProfileServices {
    fn new(name: String, profile: ProfileConfig) -> Self {
        let ttl = profile.cache.clone().unwrap_or_default().ttl_seconds;
        Self {
            name,
            profile,
            cache: QueryCache::new(ttl),
            query_client: QueryClient::new(),
            http_client: reqwest::Client::new(),
        }
    }
}

pub struct ToolHandlers {
    pub workspace_root: PathBuf,
    pub config: WorkspaceConfig,
    pub active: ProfileServices,
    pub events: Arc<dyn EventBus>,
}

impl ToolHandlers {
    pub fn new(
        workspace_root: PathBuf,
        config: WorkspaceConfig,
        initial_profile_name: String,
        events: Arc<dyn EventBus>,
    ) -> Result<Self> {
        let profile = resolve_profile(&config, &initial_profile_name)?;
        Ok(Self {
            workspace_root,
            config,
            active: ProfileServices::new(initial_profile_name, profile),
            events,
        })
    }

    /// The single dispatch surface. Every call emits exactly one
    /// `ToolCompleted`/`ToolFailed` event carrying the elapsed time and a
    /// truncated hash of the active profile's name (§4.2.4); emission
    /// failures never propagate.
    #[tracing::instrument(name = "agent.tool", skip(self, args), fields(tool = %tool_name))]
    pub async fn execute(&mut self, tool_name: &str, args: Value) -> Result<Value> {
        let started = Instant::now();
        let result = self.dispatch(tool_name, args).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        let hash = profile_hash(&self.active.name);

        match &result {
            Ok(_) => self.events.publish(AppEvent::ToolCompleted {
                tool: tool_name.to_string(),
                duration_ms,
                profile_hash: hash,
            }),
            Err(e) => {
                self.events.publish(AppEvent::ToolFailed {
                    tool: tool_name.to_string(),
                    duration_ms,
                    profile_hash: hash,
                    error: e.to_string(),
                });
                self.events.publish(AppEvent::Error {
                    message: e.to_string(),
                });
            }
        }

        result
    }

    async fn dispatch(&mut self, tool_name: &str, args: Value) -> Result<Value> {
        match tool_name {
            "get_event_catalog" => {
                let catalog_args = catalog::CatalogArgs {
                    days: args.get("days").and_then(Value::as_u64).unwrap_or(10) as u32,
                    status: args
                        .get("status")
                        .and_then(Value::as_str)
                        .unwrap_or("all")
                        .to_string(),
                    include_common_fields: args
                        .get("includeCommonFields")
                        .and_then(Value::as_bool)
                        .unwrap_or(true),
                };
                catalog::get_event_catalog(&self.active.profile, &self.active.query_client, &catalog_args).await
            }
            "get_event_field_samples" => {
                let event_id = required_str(&args, "eventId")?;
                let sample_size = args.get("sampleSize").and_then(Value::as_u64).unwrap_or(20) as u32;
                catalog::get_event_field_samples(&self.active.profile, &self.active.query_client, event_id, sample_size).await
            }
            "get_event_schema" => {
                let event_id = required_str(&args, "eventId")?;
                catalog::get_event_schema(&self.active.profile, &self.active.query_client, event_id).await
            }
            "get_tenant_mapping" => {
                let filter = args.get("filter").and_then(Value::as_str);
                tenant::get_tenant_mapping(&self.active.profile, &self.active.query_client, filter).await
            }
            "query_telemetry" => {
                let kql = required_str(&args, "kql")?;
                let cache_config = self.active.profile.cache.clone().unwrap_or_default();
                let sanitize = self.active.profile.sanitize.clone().unwrap_or_default();
                let ctx = query::QueryContext {
                    profile: &self.active.profile,
                    cache_config: &cache_config,
                    sanitize: &sanitize,
                };
                query::query_telemetry(ctx, &self.active.query_client, &mut self.active.cache, kql).await
            }
            "get_saved_queries" => {
                let category = args.get("category").and_then(Value::as_str);
                saved_queries::get_saved_queries(&self.workspace_root, &self.active.profile, category)
            }
            "search_queries" => {
                let term = required_str(&args, "term")?;
                saved_queries::search_queries(&self.workspace_root, &self.active.profile, term)
            }
            "save_query" => {
                let name = required_str(&args, "name")?;
                let category = args.get("category").and_then(Value::as_str).unwrap_or("uncategorized");
                let kql = required_str(&args, "kql")?;
                let description = args.get("description").and_then(Value::as_str).unwrap_or("");
                saved_queries::save_query(&self.workspace_root, &self.active.profile, name, category, kql, description)
            }
            "get_categories" => saved_queries::get_categories(&self.workspace_root, &self.active.profile),
            "get_recommendations" => {
                let kql = required_str(&args, "kql")?;
                let row_count = args.get("rowCount").and_then(Value::as_u64).map(|n| n as usize);
                Ok(recommendations::get_recommendations(kql, row_count))
            }
            "get_external_queries" => external_queries::get_external_queries(&self.active.profile, &self.active.http_client).await,
            "get_cache_stats" => Ok(serde_json::to_value(self.active.cache.stats())?),
            "clear_cache" => {
                self.active.cache.clear();
                Ok(serde_json::json!({"cleared": true}))
            }
            "cleanup_cache" => {
                let evicted = self.active.cache.cleanup();
                Ok(serde_json::json!({"evicted": evicted}))
            }
            "get_auth_status" => Ok(auth::auth_status(&self.active.profile)),
            "list_profiles" => Ok(profiles::list_profiles(&self.config, &self.active.name)),
            "switch_profile" => {
                let name = required_str(&args, "name")?;
                self.switch_profile(name)
            }
            other => Err(BctbError::config(format!("unknown tool '{other}'"))),
        }
    }

    fn switch_profile(&mut self, name: &str) -> Result<Value> {
        let resolved = profiles::resolve_switch(&self.config, name)?;
        let previous = self.active.name.clone();
        self.active = ProfileServices::new(name.to_string(), resolved);
        Ok(serde_json::json!({
            "success": true,
            "previousProfile": previous,
            "currentProfile": {"name": name},
        }))
    }
}

fn required_str<'a>(args: &'a Value, field: &str) -> Result<&'a str> {
    args.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| BctbError::config(format!("missing required argument '{field}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::NullBus;
    use serde_json::json;

    fn handlers() -> ToolHandlers {
        ToolHandlers::new(
            PathBuf::from("."),
            WorkspaceConfig::default(),
            "default".to_string(),
            Arc::new(NullBus::new()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn unknown_tool_name_errors() {
        let mut h = handlers();
        let err = h.execute("not_a_tool", json!({})).await.unwrap_err();
        assert!(err.to_string().contains("not_a_tool"));
    }

    #[tokio::test]
    async fn missing_required_argument_errors() {
        let mut h = handlers();
        let err = h.execute("query_telemetry", json!({})).await.unwrap_err();
        assert!(err.to_string().contains("kql"));
    }

    #[tokio::test]
    async fn get_recommendations_does_not_require_cluster_access() {
        let mut h = handlers();
        let result = h
            .execute("get_recommendations", json!({"kql": "traces | project *"}))
            .await
            .unwrap();
        assert!(!result["recommendations"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn switch_profile_fails_when_none_defined() {
        let mut h = handlers();
        let err = h.execute("switch_profile", json!({"name": "alpha"})).await.unwrap_err();
        assert!(err.to_string().contains("no profiles"));
    }
}
