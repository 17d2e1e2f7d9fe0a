//! JSON configuration schema for `.bctb-config.json`.
//!
//! All fields have `#[serde(default)]` so a partially-filled config file
//! works correctly. Missing sections fall back to their `Default` impl.
//!
//! Example `.bctb-config.json` (multi-profile):
//! ```json
//! {
//!   "defaultProfile": "alpha",
//!   "profiles": {
//!     "_base": { "clusterUrl": "https://ade.loganalytics.io/v1" },
//!     "alpha": { "extends": "_base", "workspaceId": "alpha-ws", "tenantId": "t-alpha" },
//!     "beta": { "extends": "_base", "workspaceId": "beta-ws", "tenantId": "t-beta" }
//!   },
//!   "cache": { "enabled": true, "ttlSeconds": 300 },
//!   "agents": { "llm": { "provider": "azure-openai" } }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,
}

fn default_cache_ttl() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: default_cache_ttl(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SanitizeConfig {
    #[serde(default)]
    pub remove_pii: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExternalReference {
    pub name: String,
    pub url: String,
}

/// Connection credentials targeting one tenant/environment. May declare
/// `extends` to inherit from a base profile; profile names starting with
/// `_` are bases and never surfaced by `list_profiles`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sanitize: Option<SanitizeConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queries_folder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<ExternalReference>>,
}

impl ProfileConfig {
    /// Resolve one level of `extends`: fields unset on `self` are filled
    /// from `base`. The caller walks the chain depth-first.
    pub fn merge_over(mut self, base: &ProfileConfig) -> ProfileConfig {
        if self.cluster_url.is_none() {
            self.cluster_url = base.cluster_url.clone();
        }
        if self.workspace_id.is_none() {
            self.workspace_id = base.workspace_id.clone();
        }
        if self.tenant_id.is_none() {
            self.tenant_id = base.tenant_id.clone();
        }
        if self.client_id.is_none() {
            self.client_id = base.client_id.clone();
        }
        if self.cache.is_none() {
            self.cache = base.cache.clone();
        }
        if self.sanitize.is_none() {
            self.sanitize = base.sanitize.clone();
        }
        if self.queries_folder.is_none() {
            self.queries_folder = base.queries_folder.clone();
        }
        if self.references.is_none() {
            self.references = base.references.clone();
        }
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LlmConfig {
    /// `"azure-openai"` or `"anthropic"`.
    #[serde(default)]
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentDefaults {
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls: u32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_context_window_runs")]
    pub context_window_runs: usize,
    #[serde(default = "default_resolved_issue_ttl_days")]
    pub resolved_issue_ttl_days: i64,
    #[serde(default = "default_tool_scope")]
    pub tool_scope: String,
}

fn default_max_tool_calls() -> u32 {
    20
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_context_window_runs() -> usize {
    5
}
fn default_resolved_issue_ttl_days() -> i64 {
    30
}
fn default_tool_scope() -> String {
    "read-only".to_string()
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            max_tool_calls: default_max_tool_calls(),
            max_tokens: default_max_tokens(),
            context_window_runs: default_context_window_runs(),
            resolved_issue_ttl_days: default_resolved_issue_ttl_days(),
            tool_scope: default_tool_scope(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatWebhookActionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmailSmtpActionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default)]
    pub default_recipients: Vec<String>,
    /// Fallback when `SMTP_PASSWORD` is unset. Env var takes precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmailGraphActionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default)]
    pub default_recipients: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenericWebhookActionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineTriggerActionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_id: Option<u64>,
    /// Fallback when `DEVOPS_PAT` is unset. Env var takes precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pat: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionsConfig {
    #[serde(default)]
    pub teams_webhook: ChatWebhookActionConfig,
    #[serde(default)]
    pub email_smtp: EmailSmtpActionConfig,
    #[serde(default)]
    pub email_graph: EmailGraphActionConfig,
    #[serde(default)]
    pub generic_webhook: GenericWebhookActionConfig,
    #[serde(default)]
    pub pipeline_trigger: PipelineTriggerActionConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentsConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub defaults: AgentDefaults,
    #[serde(default)]
    pub actions: ActionsConfig,
}

/// Top-level `.bctb-config.json` shape. Either flat-profile (`flat_profile`
/// populated, `profiles` empty) or multi-profile (`default_profile` +
/// `profiles`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConfig {
    #[serde(flatten)]
    pub flat_profile: ProfileConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileConfig>,
    #[serde(default)]
    pub agents: AgentsConfig,
}

impl WorkspaceConfig {
    pub fn is_multi_profile(&self) -> bool {
        !self.profiles.is_empty()
    }
}
