//! Per-agent directory layout and state lifecycle (§4.3).
//!
//! `<workspace>/agents/<name>/{instruction.md, state.json, runs/*.json,
//! runs/*.md}`. State is written atomically via
//! [`crate::config::atomic_write`], the same primitive the config loader
//! uses for its own writes.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::config::atomic_write;
use crate::errors::{BctbError, Result};
use crate::types::{
    is_valid_agent_name, AgentAction, AgentIssue, AgentOutput, AgentRunSummary, AgentState,
    AgentStatus, AgentSummary, StateAtStart, StateChanges,
};

const INSTRUCTION_FILE: &str = "instruction.md";
const STATE_FILE: &str = "state.json";
const RUNS_DIR: &str = "runs";

pub fn agent_dir(workspace_root: &Path, name: &str) -> PathBuf {
    workspace_root.join("agents").join(name)
}

fn instruction_path(workspace_root: &Path, name: &str) -> PathBuf {
    agent_dir(workspace_root, name).join(INSTRUCTION_FILE)
}

fn state_path(workspace_root: &Path, name: &str) -> PathBuf {
    agent_dir(workspace_root, name).join(STATE_FILE)
}

pub fn runs_dir(workspace_root: &Path, name: &str) -> PathBuf {
    agent_dir(workspace_root, name).join(RUNS_DIR)
}

/// Create a new agent directory tree and write its instruction and
/// initial state. Fails if `instruction.md` already exists — an agent
/// name is claimed permanently once created.
pub fn create_agent(workspace_root: &Path, name: &str, instruction: &str) -> Result<AgentState> {
    if !is_valid_agent_name(name) {
        return Err(BctbError::state(format!("invalid agent name '{name}'")));
    }
    let instr_path = instruction_path(workspace_root, name);
    if instr_path.exists() {
        return Err(BctbError::state(format!("agent '{name}' already exists")));
    }

    std::fs::create_dir_all(runs_dir(workspace_root, name))?;
    std::fs::write(&instr_path, instruction)?;

    let state = AgentState::initial(name, Utc::now().to_rfc3339());
    atomic_write(&state_path(workspace_root, name), &serde_json::to_string_pretty(&state)?)?;
    Ok(state)
}

/// Load `state.json`. A directory created outside the core (instruction
/// present, no state file yet) yields a fresh initial state rather than
/// an error.
pub fn load_state(workspace_root: &Path, name: &str) -> Result<AgentState> {
    let path = state_path(workspace_root, name);
    match std::fs::read_to_string(&path) {
        Ok(content) => serde_json::from_str(&content).map_err(BctbError::from),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Ok(AgentState::initial(name, Utc::now().to_rfc3339()))
        }
        Err(e) => Err(BctbError::from(e)),
    }
}

fn save_state(workspace_root: &Path, name: &str, state: &AgentState) -> Result<()> {
    atomic_write(&state_path(workspace_root, name), &serde_json::to_string_pretty(state)?)
}

/// Enumerate immediate subdirectories of `agents/` that contain an
/// `instruction.md`.
pub fn list_agents(workspace_root: &Path) -> Result<Vec<AgentSummary>> {
    let agents_root = workspace_root.join("agents");
    if !agents_root.exists() {
        return Ok(Vec::new());
    }

    let mut summaries = Vec::new();
    for entry in std::fs::read_dir(&agents_root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if !instruction_path(workspace_root, &name).exists() {
            continue;
        }
        let state = load_state(workspace_root, &name)?;
        summaries.push(AgentSummary {
            name,
            status: state.status,
            run_count: state.run_count,
            last_run: state.last_run,
            active_issue_count: state.active_issues.len(),
        });
    }
    summaries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(summaries)
}

/// List `.json` run-log filenames under `runs/`, newest first.
pub fn get_run_history(workspace_root: &Path, name: &str, limit: Option<usize>) -> Result<Vec<String>> {
    let dir = runs_dir(workspace_root, name);
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names: Vec<String> = std::fs::read_dir(&dir)?
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .filter(|n| n.ends_with(".json"))
        .collect();
    names.sort();
    names.reverse();
    if let Some(limit) = limit {
        names.truncate(limit);
    }
    Ok(names)
}

pub fn set_agent_status(workspace_root: &Path, name: &str, status: AgentStatus) -> Result<AgentState> {
    let mut state = load_state(workspace_root, name)?;
    state.status = status;
    save_state(workspace_root, name, &state)?;
    Ok(state)
}

/// Pure transition function: `prev` + this run's output → the next
/// persisted `AgentState`. No I/O — the caller persists the result.
pub fn update_state(
    prev: &AgentState,
    output: &AgentOutput,
    mut executed_actions: Vec<AgentAction>,
    duration_ms: u64,
    tool_call_names: Vec<String>,
    context_window_runs: usize,
    resolved_issue_ttl_days: i64,
) -> AgentState {
    let now = Utc::now().to_rfc3339();
    let new_run_id = prev.run_count + 1;

    for action in executed_actions.iter_mut() {
        action.run = new_run_id;
    }

    let new_active_issues: Vec<AgentIssue> = output
        .active_issues
        .iter()
        .map(|out_issue| {
            let prior = prev
                .active_issues
                .iter()
                .find(|p| p.matches(&out_issue.id, &out_issue.fingerprint));
            let mut issue = out_issue.clone();
            issue.first_seen = prior.map(|p| p.first_seen.clone()).unwrap_or_else(|| now.clone());
            issue.actions_taken = prior
                .map(|p| p.actions_taken.clone())
                .unwrap_or_default();
            let matching_actions: Vec<_> = executed_actions
                .iter()
                .filter(|action| {
                    action
                        .issue_id
                        .as_deref()
                        .is_some_and(|id| issue.matches(id, id))
                })
                .cloned()
                .collect();
            issue.actions_taken.extend(matching_actions);
            issue
        })
        .collect();

    let mut new_resolved_issues = prev.resolved_issues.clone();
    new_resolved_issues.extend(
        prev.active_issues
            .iter()
            .filter(|issue| output.resolved_issues.iter().any(|id| id == &issue.id))
            .cloned(),
    );
    new_resolved_issues.retain(|issue| {
        !new_active_issues
            .iter()
            .any(|active| active.matches(&issue.id, &issue.fingerprint))
    });
    let cutoff = DateTime::parse_from_rfc3339(&now)
        .map(|dt| dt.with_timezone(&Utc) - chrono::Duration::days(resolved_issue_ttl_days))
        .unwrap_or_else(|_| Utc::now() - chrono::Duration::days(resolved_issue_ttl_days));
    new_resolved_issues.retain(|issue| {
        DateTime::parse_from_rfc3339(&issue.last_seen)
            .map(|dt| dt.with_timezone(&Utc) >= cutoff)
            .unwrap_or(true)
    });

    let run_summary = AgentRunSummary {
        run_id: new_run_id,
        timestamp: now.clone(),
        duration_ms,
        tool_calls: tool_call_names,
        findings: output.findings.clone(),
        actions: executed_actions,
    };
    let mut recent_runs = prev.recent_runs.clone();
    recent_runs.push(run_summary);
    if recent_runs.len() > context_window_runs {
        let drop = recent_runs.len() - context_window_runs;
        recent_runs.drain(0..drop);
    }

    AgentState {
        agent_name: prev.agent_name.clone(),
        created: prev.created.clone(),
        last_run: now,
        run_count: new_run_id,
        status: prev.status,
        summary: output.summary.clone(),
        active_issues: new_active_issues,
        resolved_issues: new_resolved_issues,
        recent_runs,
    }
}

pub fn state_at_start(prev: &AgentState) -> StateAtStart {
    StateAtStart {
        summary: prev.summary.clone(),
        active_issue_count: prev.active_issues.len(),
        run_count: prev.run_count,
    }
}

pub fn save_state_external(workspace_root: &Path, name: &str, state: &AgentState) -> Result<()> {
    save_state(workspace_root, name, state)
}
