//! Run-log filenames, and the `.json`/`.md` writers (§4.3, §6.2).

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::config::atomic_write;
use crate::errors::Result;
use crate::types::AgentRunLog;

use super::state::runs_dir;

/// `<UTC ISO timestamp with ':' -> '-' and fractional-second suffix ->
/// 'Z'>-run<4-digit-id>`, e.g. `2026-08-01T12-30-00Z-run0007`.
pub fn run_log_basename(timestamp: DateTime<Utc>, run_id: u64) -> String {
    let formatted = timestamp.format("%Y-%m-%dT%H-%M-%SZ").to_string();
    format!("{formatted}-run{run_id:04}")
}

fn json_path(workspace_root: &Path, name: &str, basename: &str) -> PathBuf {
    runs_dir(workspace_root, name).join(format!("{basename}.json"))
}

fn md_path(workspace_root: &Path, name: &str, basename: &str) -> PathBuf {
    runs_dir(workspace_root, name).join(format!("{basename}.md"))
}

/// Persist `log` as both the `.json` audit record and a `.md` human
/// report, under the deterministic filename derived from its timestamp
/// and run id.
pub fn save_run_log(workspace_root: &Path, log: &AgentRunLog) -> Result<()> {
    let timestamp = DateTime::parse_from_rfc3339(&log.timestamp)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());
    let basename = run_log_basename(timestamp, log.run_id);

    atomic_write(
        &json_path(workspace_root, &log.agent_name, &basename),
        &serde_json::to_string_pretty(log)?,
    )?;
    atomic_write(
        &md_path(workspace_root, &log.agent_name, &basename),
        &render_markdown(log),
    )?;
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max).collect::<String>())
    }
}

/// Stable Markdown section order (§6.2): header, summary table,
/// instruction, state-at-start, tool-calls table (results truncated to
/// 120 chars), findings, assessment, actions taken, state changes.
fn render_markdown(log: &AgentRunLog) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Agent Run Report: {}\n\n", log.agent_name));

    out.push_str("## Summary\n\n");
    out.push_str("| Field | Value |\n|---|---|\n");
    out.push_str(&format!("| Run | {} |\n", log.run_id));
    out.push_str(&format!("| Timestamp | {} |\n", log.timestamp));
    out.push_str(&format!("| Duration (ms) | {} |\n", log.duration_ms));
    out.push_str(&format!("| Model | {} |\n", log.llm.model));
    out.push_str(&format!("| Tool calls | {} |\n\n", log.llm.tool_call_count));

    out.push_str("## Instruction\n\n```\n");
    out.push_str(&log.instruction);
    out.push_str("\n```\n\n");

    out.push_str("## State at Start\n\n");
    out.push_str("| Field | Value |\n|---|---|\n");
    out.push_str(&format!("| Summary | {} |\n", log.state_at_start.summary));
    out.push_str(&format!(
        "| Active issues | {} |\n",
        log.state_at_start.active_issue_count
    ));
    out.push_str(&format!("| Run count | {} |\n\n", log.state_at_start.run_count));

    out.push_str("## Tool Calls\n\n");
    out.push_str("| # | Tool | Duration (ms) | Result |\n|---|---|---|---|\n");
    for call in &log.tool_calls {
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            call.sequence,
            call.tool,
            call.duration_ms,
            truncate(&call.result_summary, 120)
        ));
    }
    out.push('\n');

    out.push_str("## Findings\n\n");
    out.push_str(&log.findings);
    out.push_str("\n\n## Assessment\n\n");
    out.push_str(&log.assessment);
    out.push_str("\n\n## Actions Taken\n\n");
    if log.actions.is_empty() {
        out.push_str("- none\n");
    } else {
        for action in &log.actions {
            out.push_str(&format!("- {:?}: {:?}\n", action.action_type, action.status));
        }
    }

    out.push_str("\n## State Changes\n\n");
    if log.state_changes.summary_updated {
        out.push_str("- summary updated\n");
    } else {
        out.push_str("- no changes\n");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn basename_replaces_colons_and_zero_pads_run_id() {
        let ts = Utc.with_ymd_and_hms(2026, 8, 1, 12, 30, 0).unwrap();
        assert_eq!(run_log_basename(ts, 7), "2026-08-01T12-30-00Z-run0007");
    }

    #[test]
    fn basename_handles_four_digit_run_ids_without_truncation() {
        let ts = Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap();
        assert_eq!(run_log_basename(ts, 12345), "2026-08-01T00-00-00Z-run12345");
    }

    #[test]
    fn markdown_sections_appear_in_stable_order() {
        let log = AgentRunLog {
            run_id: 1,
            agent_name: "perf".into(),
            timestamp: "2026-08-01T00:00:00+00:00".into(),
            duration_ms: 10,
            instruction: "watch".into(),
            state_at_start: crate::types::StateAtStart::default(),
            llm: crate::types::LlmUsageSummary {
                model: "gpt".into(),
                prompt_tokens: 1,
                completion_tokens: 1,
                total_tokens: 2,
                tool_call_count: 0,
            },
            tool_calls: vec![],
            assessment: "fine".into(),
            findings: "none".into(),
            actions: vec![],
            state_changes: crate::types::StateChanges::default(),
        };
        let md = render_markdown(&log);
        let order = [
            "# Agent Run Report",
            "## Summary",
            "## Instruction",
            "## State at Start",
            "## Tool Calls",
            "## Findings",
            "## Assessment",
            "## Actions Taken",
            "## State Changes",
        ];
        let mut last = 0;
        for marker in order {
            let pos = md.find(marker).unwrap();
            assert!(pos >= last, "section {marker} out of order");
            last = pos;
        }
    }

    #[test]
    fn tool_call_results_are_truncated_to_120_chars() {
        let long_result = "x".repeat(200);
        assert_eq!(truncate(&long_result, 120).chars().count(), 123);
    }
}
