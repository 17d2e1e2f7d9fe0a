//! Agent Runtime: the ReAct loop (§4.6). Alternates LLM turns with tool
//! calls, bounded by `maxToolCalls`, then parses the model's final
//! structured output, dispatches any requested actions, and persists the
//! updated state and run log.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use crate::actions::dispatch;
use crate::config::{ActionsConfig, AgentDefaults};
use crate::context::{
    create_agent as context_create_agent, get_run_history, load_state, save_run_log,
    save_state_external, set_agent_status, state_at_start, update_state,
};
use crate::errors::{BctbError, Result};
use crate::llm::{ChatMessage, ChatOptions, LLMProvider};
use crate::prompt::{build_agent_prompt, filter_tools_by_scope, parse_agent_output, SYSTEM_PROMPT};
use crate::tools::ToolHandlers;
use crate::types::{
    AgentRunLog, AgentState, AgentStatus, LlmUsageSummary, ToolCallLogEntry,
};

pub struct AgentRuntime<'a> {
    pub workspace_root: std::path::PathBuf,
    pub defaults: AgentDefaults,
    pub actions_config: ActionsConfig,
    pub provider: &'a dyn LLMProvider,
    pub tools: &'a mut ToolHandlers,
}

fn result_summary(value: &serde_json::Value) -> String {
    let text = value.to_string();
    if text.chars().count() <= 500 {
        text
    } else {
        format!("{}...", text.chars().take(500).collect::<String>())
    }
}

impl<'a> AgentRuntime<'a> {
    pub fn new(
        workspace_root: std::path::PathBuf,
        defaults: AgentDefaults,
        actions_config: ActionsConfig,
        provider: &'a dyn LLMProvider,
        tools: &'a mut ToolHandlers,
    ) -> Self {
        Self {
            workspace_root,
            defaults,
            actions_config,
            provider,
            tools,
        }
    }

    pub fn create_agent(&self, name: &str, instruction: &str) -> Result<AgentState> {
        context_create_agent(&self.workspace_root, name, instruction)
    }

    pub fn list_agents(&self) -> Result<Vec<crate::types::AgentSummary>> {
        crate::context::list_agents(&self.workspace_root)
    }

    pub fn history(&self, name: &str, limit: Option<usize>) -> Result<Vec<String>> {
        get_run_history(&self.workspace_root, name, limit)
    }

    pub fn pause(&self, name: &str) -> Result<AgentState> {
        set_agent_status(&self.workspace_root, name, AgentStatus::Paused)
    }

    pub fn resume(&self, name: &str) -> Result<AgentState> {
        set_agent_status(&self.workspace_root, name, AgentStatus::Active)
    }

    /// Run one ReAct cycle for `name`, persist the outcome, and return the
    /// audit log. `cancelled` is checked at the top of every loop
    /// iteration and before the provider call; `None` means never
    /// cancelled (§5.1).
    #[tracing::instrument(name = "agent.run", skip(self, cancelled), fields(agent = %name))]
    pub async fn run(&mut self, name: &str, cancelled: Option<Arc<AtomicBool>>) -> Result<AgentRunLog> {
        let started = Instant::now();
        let instruction_path = self.workspace_root.join("agents").join(name).join("instruction.md");
        let instruction = std::fs::read_to_string(&instruction_path)
            .map_err(|_| BctbError::state(format!("Agent '{name}' does not exist")))?;

        let prev_state = load_state(&self.workspace_root, name)?;
        if prev_state.status == AgentStatus::Paused {
            return Err(BctbError::state(format!("Agent '{name}' is paused")));
        }

        let tool_defs = filter_tools_by_scope(&self.defaults.tool_scope);
        let prompt = build_agent_prompt(&instruction, &prev_state);

        let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(&prompt)];
        let options = ChatOptions {
            max_tokens: self.defaults.max_tokens,
            temperature: None,
        };

        let mut total_tool_calls: u32 = 0;
        let mut prompt_tokens: u64 = 0;
        let mut completion_tokens: u64 = 0;
        let mut tool_call_logs = Vec::new();
        let mut sequence: u32 = 0;

        loop {
            if is_cancelled(&cancelled) {
                return Err(BctbError::runtime_safety(format!("Agent '{name}' run was cancelled")));
            }
            if total_tool_calls >= self.defaults.max_tool_calls {
                return Err(BctbError::runtime_safety(format!(
                    "Agent '{name}' exceeded max tool calls ({})",
                    self.defaults.max_tool_calls
                )));
            }

            let response = self.provider.chat(&messages, &tool_defs, &options).await?;
            prompt_tokens += response.usage.prompt_tokens;
            completion_tokens += response.usage.completion_tokens;

            if !response.has_tool_calls() {
                let output = parse_agent_output(&response.content)?;

                if is_cancelled(&cancelled) {
                    return Err(BctbError::runtime_safety(format!("Agent '{name}' run was cancelled")));
                }

                let executed_actions = dispatch(
                    &output.actions,
                    name,
                    &self.actions_config,
                    &self.tools.active.http_client,
                )
                .await;

                let duration_ms = started.elapsed().as_millis() as u64;
                let tool_call_names: Vec<String> = tool_call_logs
                    .iter()
                    .map(|e: &ToolCallLogEntry| e.tool.clone())
                    .collect();

                let new_state = update_state(
                    &prev_state,
                    &output,
                    executed_actions.clone(),
                    duration_ms,
                    tool_call_names.clone(),
                    self.defaults.context_window_runs,
                    self.defaults.resolved_issue_ttl_days,
                );
                save_state_external(&self.workspace_root, name, &new_state)?;

                let run_log = AgentRunLog {
                    run_id: new_state.run_count,
                    agent_name: name.to_string(),
                    timestamp: Utc::now().to_rfc3339(),
                    duration_ms,
                    instruction: instruction.clone(),
                    state_at_start: state_at_start(&prev_state),
                    llm: LlmUsageSummary {
                        model: self.provider.model_name().to_string(),
                        prompt_tokens,
                        completion_tokens,
                        total_tokens: prompt_tokens + completion_tokens,
                        tool_call_count: total_tool_calls,
                    },
                    tool_calls: tool_call_logs,
                    assessment: output.assessment.clone(),
                    findings: output.findings.clone(),
                    actions: executed_actions.iter().cloned().map(|mut a| {
                        a.run = new_state.run_count;
                        a
                    }).collect(),
                    state_changes: output.state_changes.clone(),
                };
                save_run_log(&self.workspace_root, &run_log)?;

                return Ok(run_log);
            }

            messages.push(response.assistant_message.clone());

            for call in &response.tool_calls {
                if is_cancelled(&cancelled) {
                    return Err(BctbError::runtime_safety(format!("Agent '{name}' run was cancelled")));
                }
                let args: serde_json::Value =
                    serde_json::from_str(&call.arguments).unwrap_or(serde_json::json!({}));
                let call_started = Instant::now();
                let result = self.tools.execute(&call.name, args.clone()).await;
                let call_duration = call_started.elapsed().as_millis() as u64;

                let (message_content, summary) = match &result {
                    Ok(value) => (value.to_string(), result_summary(value)),
                    Err(e) => {
                        let envelope = serde_json::json!({ "error": e.to_string() });
                        (envelope.to_string(), result_summary(&envelope))
                    }
                };

                messages.push(ChatMessage::tool_result(&call.id, message_content));
                sequence += 1;
                tool_call_logs.push(ToolCallLogEntry {
                    sequence,
                    tool: call.name.clone(),
                    args,
                    result_summary: summary,
                    duration_ms: call_duration,
                });
                total_tool_calls += 1;
            }
        }
    }
}

fn is_cancelled(flag: &Option<Arc<AtomicBool>>) -> bool {
    flag.as_ref().map(|f| f.load(Ordering::SeqCst)).unwrap_or(false)
}

pub async fn run_all(
    workspace_root: std::path::PathBuf,
    defaults: &AgentDefaults,
    actions_config: &ActionsConfig,
    provider: &dyn LLMProvider,
    tools: &mut ToolHandlers,
) -> Vec<(String, Result<AgentRunLog>)> {
    let agents = match crate::context::list_agents(&workspace_root) {
        Ok(agents) => agents,
        Err(e) => return vec![("*".to_string(), Err(e))],
    };

    let mut results = Vec::new();
    for agent in agents {
        let mut runtime = AgentRuntime::new(
            workspace_root.clone(),
            defaults.clone(),
            actions_config.clone(),
            provider,
            tools,
        );
        let result = runtime.run(&agent.name, None).await;
        results.push((agent.name, result));
    }
    results
}
