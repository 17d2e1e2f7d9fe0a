//! Shape of agent state, run logs, actions, and tool definitions.
//!
//! All timestamps in this module are ISO-8601 UTC strings, produced with
//! `chrono::Utc::now().to_rfc3339()`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Paused,
}

/// Trend direction for a tracked issue's counts series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Stable,
    Decreasing,
}

/// A dispatch attempt record, owned by an `AgentIssue.actionsTaken` list and
/// by an `AgentRunLog.actions` list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentAction {
    /// The run number in which this action was executed. The Action
    /// Dispatcher always stamps `0`; only `Context::update_state` assigns
    /// the real run id.
    pub run: u64,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub timestamp: String,
    pub status: ActionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ActionDetails>,
    /// The issue (`id` or `fingerprint`) this action was dispatched for, if
    /// any. Carried through from the requesting `RequestedAction.issueId` so
    /// `Context::update_state` can attribute it to the right issue's
    /// `actionsTaken` instead of every active issue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionType {
    TeamsWebhook,
    EmailSmtp,
    EmailGraph,
    GenericWebhook,
    PipelineTrigger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Sent,
    Failed,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A requested action as emitted by the LLM's structured output, before
/// dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestedAction {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipients: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub investigation_id: Option<String>,
    /// The `id` or `fingerprint` of the `AgentIssue` this action targets, so
    /// `Context::update_state` can attribute the resulting `AgentAction` to
    /// that issue's `actionsTaken` only. Absent for actions that don't
    /// target a tracked issue (e.g. a one-off notification).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    #[default]
    Medium,
    Low,
}

/// A tracked anomaly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentIssue {
    pub id: String,
    pub fingerprint: String,
    pub first_seen: String,
    pub last_seen: String,
    #[serde(default)]
    pub consecutive_detections: u32,
    #[serde(default = "default_trend")]
    pub trend: Trend,
    #[serde(default)]
    pub counts: Vec<f64>,
    #[serde(default)]
    pub actions_taken: Vec<AgentAction>,
}

fn default_trend() -> Trend {
    Trend::Stable
}

impl AgentIssue {
    /// Does this issue match the given output issue by id or fingerprint?
    pub fn matches(&self, id: &str, fingerprint: &str) -> bool {
        self.id == id || self.fingerprint == fingerprint
    }
}

/// One entry in `AgentState.recentRuns`: a compact sliding-window summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRunSummary {
    pub run_id: u64,
    pub timestamp: String,
    pub duration_ms: u64,
    pub tool_calls: Vec<String>,
    pub findings: String,
    pub actions: Vec<AgentAction>,
}

/// Persistent per-agent state, one `state.json` file per agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentState {
    pub agent_name: String,
    pub created: String,
    #[serde(default)]
    pub last_run: String,
    #[serde(default)]
    pub run_count: u64,
    pub status: AgentStatus,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub active_issues: Vec<AgentIssue>,
    #[serde(default)]
    pub resolved_issues: Vec<AgentIssue>,
    #[serde(default)]
    pub recent_runs: Vec<AgentRunSummary>,
}

impl AgentState {
    /// Fresh state for a newly created agent, or as a fallback when
    /// `state.json` is missing (directory created outside the core).
    pub fn initial(agent_name: impl Into<String>, created: String) -> Self {
        Self {
            agent_name: agent_name.into(),
            created,
            last_run: String::new(),
            run_count: 0,
            status: AgentStatus::Active,
            summary: String::new(),
            active_issues: Vec::new(),
            resolved_issues: Vec::new(),
            recent_runs: Vec::new(),
        }
    }
}

/// A single tool-call record within a run log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallLogEntry {
    pub sequence: u32,
    pub tool: String,
    pub args: Value,
    pub result_summary: String,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmUsageSummary {
    pub model: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub tool_call_count: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateAtStart {
    pub summary: String,
    pub active_issue_count: usize,
    pub run_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChanges {
    #[serde(default)]
    pub summary_updated: bool,
}

/// The audit-trail record for one run, persisted as `.json` and rendered as
/// `.md`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRunLog {
    pub run_id: u64,
    pub agent_name: String,
    pub timestamp: String,
    pub duration_ms: u64,
    pub instruction: String,
    pub state_at_start: StateAtStart,
    pub llm: LlmUsageSummary,
    pub tool_calls: Vec<ToolCallLogEntry>,
    pub assessment: String,
    pub findings: String,
    pub actions: Vec<AgentAction>,
    pub state_changes: StateChanges,
}

/// Structured output the LLM is required to produce on its final turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentOutput {
    pub summary: String,
    pub findings: String,
    pub assessment: String,
    #[serde(default)]
    pub active_issues: Vec<AgentIssue>,
    /// Ids (or fingerprints) of issues the LLM considers resolved this run.
    #[serde(default)]
    pub resolved_issues: Vec<String>,
    #[serde(default)]
    pub actions: Vec<RequestedAction>,
    #[serde(default)]
    pub state_changes: StateChanges,
}

/// Summary row returned by `Context::list_agents`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummary {
    pub name: String,
    pub status: AgentStatus,
    pub run_count: u64,
    pub last_run: String,
    pub active_issue_count: usize,
}

/// `[a-z0-9][a-z0-9-]*[a-z0-9]`, also accepting a single-character name.
pub fn is_valid_agent_name(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    let bytes = name.as_bytes();
    let is_alnum = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    if !is_alnum(bytes[0]) || !is_alnum(bytes[bytes.len() - 1]) {
        return false;
    }
    bytes.iter().all(|&b| is_alnum(b) || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_name_validation() {
        assert!(is_valid_agent_name("perf"));
        assert!(is_valid_agent_name("perf-monitor-1"));
        assert!(is_valid_agent_name("a"));
        assert!(!is_valid_agent_name(""));
        assert!(!is_valid_agent_name("-perf"));
        assert!(!is_valid_agent_name("perf-"));
        assert!(!is_valid_agent_name("Perf"));
        assert!(!is_valid_agent_name("perf_monitor"));
    }

    #[test]
    fn issue_matches_by_id_or_fingerprint() {
        let issue = AgentIssue {
            id: "old".into(),
            fingerprint: "fp1".into(),
            first_seen: "t0".into(),
            last_seen: "t0".into(),
            consecutive_detections: 1,
            trend: Trend::Stable,
            counts: vec![1.0],
            actions_taken: vec![],
        };
        assert!(issue.matches("old", "anything"));
        assert!(issue.matches("anything", "fp1"));
        assert!(!issue.matches("new", "fp2"));
    }

    #[test]
    fn initial_state_defaults() {
        let state = AgentState::initial("perf", "2026-08-01T00:00:00Z".to_string());
        assert_eq!(state.run_count, 0);
        assert_eq!(state.status, AgentStatus::Active);
        assert_eq!(state.summary, "");
        assert_eq!(state.last_run, "");
        assert!(state.active_issues.is_empty());
    }
}
