//! Black-box end-to-end coverage of the ReAct loop against the public
//! `bctb` API: agent creation, state transitions, the sliding run window,
//! pause enforcement, and the max-tool-calls safety bound.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bctb::config::{ActionsConfig, AgentDefaults};
use bctb::context::{create_agent, load_state, set_agent_status};
use bctb::errors::Result;
use bctb::event_bus::NullBus;
use bctb::llm::{ChatMessage, ChatOptions, ChatResponse, LLMProvider, ToolCall, ToolDef, TokenUsage};
use bctb::runtime::AgentRuntime;
use bctb::tools::ToolHandlers;
use bctb::types::AgentStatus;
use tempfile::TempDir;

struct ScriptedProvider {
    responses: Mutex<Vec<ChatResponse>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn finishing(json: &str) -> Self {
        Self {
            responses: Mutex::new(vec![ChatResponse {
                content: json.to_string(),
                tool_calls: Vec::new(),
                assistant_message: ChatMessage::assistant(Some(json.to_string()), Vec::new()),
                usage: TokenUsage::default(),
            }]),
            calls: AtomicUsize::new(0),
        }
    }

    fn always_calling_tool() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn chat(
        &self,
        _messages: &[ChatMessage],
        _tools: &[ToolDef],
        _options: &ChatOptions,
    ) -> Result<ChatResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().unwrap();
        if let Some(response) = responses.pop() {
            return Ok(response);
        }
        let call = ToolCall {
            id: "call-1".to_string(),
            name: "get_event_catalog".to_string(),
            arguments: "{}".to_string(),
        };
        Ok(ChatResponse {
            content: String::new(),
            tool_calls: vec![call.clone()],
            assistant_message: ChatMessage::assistant(None, vec![call]),
            usage: TokenUsage::default(),
        })
    }

    fn model_name(&self) -> &str {
        "scripted-test-model"
    }
}

fn handlers(workspace_root: &std::path::Path) -> ToolHandlers {
    ToolHandlers::new(
        workspace_root.to_path_buf(),
        Default::default(),
        "default".to_string(),
        std::sync::Arc::new(NullBus::default()),
    )
    .expect("tool handlers")
}

#[tokio::test]
async fn first_run_with_no_findings_produces_empty_state() {
    let dir = TempDir::new().unwrap();
    create_agent(dir.path(), "perf", "watch request latency").unwrap();

    let provider = ScriptedProvider::finishing(
        r#"{"summary":"All clear","findings":"No issues.","assessment":"Healthy.","activeIssues":[],"resolvedIssues":[],"actions":[]}"#,
    );
    let mut tools = handlers(dir.path());
    let mut runtime = AgentRuntime::new(
        dir.path().to_path_buf(),
        AgentDefaults::default(),
        ActionsConfig::default(),
        &provider,
        &mut tools,
    );

    let log = runtime.run("perf", None).await.expect("run succeeds");
    assert_eq!(log.run_id, 1);

    let state = load_state(dir.path(), "perf").unwrap();
    assert_eq!(state.run_count, 1);
    assert!(state.active_issues.is_empty());
    assert_eq!(state.recent_runs.len(), 1);

    let runs_dir = dir.path().join("agents").join("perf").join("runs");
    let files: Vec<_> = std::fs::read_dir(&runs_dir).unwrap().collect();
    assert_eq!(files.len(), 2, "expected one .json and one .md per run");
}

#[tokio::test]
async fn sliding_window_keeps_only_the_most_recent_runs() {
    let dir = TempDir::new().unwrap();
    create_agent(dir.path(), "perf", "watch request latency").unwrap();

    let defaults = AgentDefaults {
        context_window_runs: 3,
        ..AgentDefaults::default()
    };

    for i in 1..=5 {
        let json = format!(
            r#"{{"summary":"s{i}","findings":"run {i} findings","assessment":"a{i}","activeIssues":[],"resolvedIssues":[],"actions":[]}}"#
        );
        let provider = ScriptedProvider::finishing(&json);
        let mut tools = handlers(dir.path());
        let mut runtime = AgentRuntime::new(
            dir.path().to_path_buf(),
            defaults.clone(),
            ActionsConfig::default(),
            &provider,
            &mut tools,
        );
        runtime.run("perf", None).await.expect("run succeeds");
    }

    let state = load_state(dir.path(), "perf").unwrap();
    assert_eq!(state.run_count, 5);
    assert_eq!(state.recent_runs.len(), 3);
    let run_ids: Vec<u64> = state.recent_runs.iter().map(|r| r.run_id).collect();
    assert_eq!(run_ids, vec![3, 4, 5]);

    let runs_dir = dir.path().join("agents").join("perf").join("runs");
    let json_files = std::fs::read_dir(&runs_dir)
        .unwrap()
        .filter(|e| e.as_ref().unwrap().path().extension().and_then(|s| s.to_str()) == Some("json"))
        .count();
    assert_eq!(json_files, 5);
}

#[tokio::test]
async fn paused_agent_refuses_to_run() {
    let dir = TempDir::new().unwrap();
    create_agent(dir.path(), "perf", "watch request latency").unwrap();
    set_agent_status(dir.path(), "perf", AgentStatus::Paused).unwrap();

    let provider = ScriptedProvider::finishing(
        r#"{"summary":"s","findings":"f","assessment":"a"}"#,
    );
    let mut tools = handlers(dir.path());
    let mut runtime = AgentRuntime::new(
        dir.path().to_path_buf(),
        AgentDefaults::default(),
        ActionsConfig::default(),
        &provider,
        &mut tools,
    );

    let err = runtime.run("perf", None).await.unwrap_err();
    assert!(err.to_string().contains("paused"));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);

    let state = load_state(dir.path(), "perf").unwrap();
    assert_eq!(state.run_count, 0);
}

#[tokio::test]
async fn exceeding_max_tool_calls_fails_without_persisting_anything() {
    let dir = TempDir::new().unwrap();
    create_agent(dir.path(), "perf", "watch request latency").unwrap();

    let provider = ScriptedProvider::always_calling_tool();
    let defaults = AgentDefaults {
        max_tool_calls: 3,
        ..AgentDefaults::default()
    };
    let mut tools = handlers(dir.path());
    let mut runtime = AgentRuntime::new(
        dir.path().to_path_buf(),
        defaults,
        ActionsConfig::default(),
        &provider,
        &mut tools,
    );

    let err = runtime.run("perf", None).await.unwrap_err();
    assert!(err.to_string().contains("exceeded max tool calls"));

    let state = load_state(dir.path(), "perf").unwrap();
    assert_eq!(state.run_count, 0);
    let runs_dir = dir.path().join("agents").join("perf").join("runs");
    assert!(!runs_dir.exists() || std::fs::read_dir(&runs_dir).unwrap().next().is_none());
}
