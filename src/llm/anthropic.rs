//! Anthropic dialect: `system` is a top-level request field (never a
//! message), tool calls arrive as `tool_use` content blocks with an
//! already-decoded JSON `input`, and a turn that emits N tool calls
//! expects N `tool_result` blocks batched into one following `user`
//! message (§4.1: "the provider that groups results differently... MUST
//! batch them automatically").

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::errors::{BctbError, Result};

use super::provider::LLMProvider;
use super::types::{ChatMessage, ChatOptions, ChatResponse, Role, TokenUsage, ToolCall, ToolDef};

pub struct AnthropicConfig {
    pub api_key: String,
    pub model: String,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

pub struct AnthropicProvider {
    config: AnthropicConfig,
    client: reqwest::Client,
}

const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

impl AnthropicProvider {
    pub fn new(config: AnthropicConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    async fn execute_with_retry(&self, body: &Value) -> Result<Value> {
        let mut attempt = 0;
        loop {
            let response = self
                .client
                .post(ANTHROPIC_URL)
                .header("x-api-key", &self.config.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(body)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp.json::<Value>().await.map_err(BctbError::from);
                    }
                    let text = resp.text().await.unwrap_or_default();
                    let truncated: String = text.chars().take(500).collect();
                    if status.is_client_error() || attempt >= self.config.max_retries {
                        return Err(BctbError::llm(format!(
                            "anthropic request failed ({status}): {truncated}"
                        )));
                    }
                }
                Err(e) if attempt >= self.config.max_retries => {
                    return Err(BctbError::llm(format!("anthropic transport error: {e}")));
                }
                Err(_) => {}
            }
            attempt += 1;
            let backoff = Duration::from_millis(200 * 2u64.pow(attempt.min(5)));
            tokio::time::sleep(backoff).await;
        }
    }
}

/// Split leading `system` messages from the rest; Anthropic routes them
/// out-of-band as a top-level `system` string.
fn extract_leading_system(messages: &[ChatMessage]) -> (Option<String>, &[ChatMessage]) {
    let mut end = 0;
    let mut parts = Vec::new();
    for m in messages {
        if m.role == Role::System {
            if let Some(c) = &m.content {
                parts.push(c.clone());
            }
            end += 1;
        } else {
            break;
        }
    }
    let system = if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    };
    (system, &messages[end..])
}

fn messages_to_vendor(messages: &[ChatMessage]) -> Vec<Value> {
    let mut vendor = Vec::new();
    let mut pending_tool_results: Vec<Value> = Vec::new();

    let flush = |pending: &mut Vec<Value>, vendor: &mut Vec<Value>| {
        if !pending.is_empty() {
            vendor.push(json!({"role": "user", "content": std::mem::take(pending)}));
        }
    };

    for m in messages {
        match m.role {
            Role::System => {
                // Already extracted by `extract_leading_system`; any
                // non-leading system message is folded into a user turn
                // verbatim rather than dropped.
                flush(&mut pending_tool_results, &mut vendor);
                vendor.push(json!({"role": "user", "content": m.content.clone().unwrap_or_default()}));
            }
            Role::User => {
                flush(&mut pending_tool_results, &mut vendor);
                vendor.push(json!({"role": "user", "content": m.content.clone().unwrap_or_default()}));
            }
            Role::Assistant => {
                flush(&mut pending_tool_results, &mut vendor);
                let mut blocks = Vec::new();
                if let Some(c) = &m.content {
                    if !c.is_empty() {
                        blocks.push(json!({"type": "text", "text": c}));
                    }
                }
                if let Some(calls) = &m.tool_calls {
                    for call in calls {
                        let input: Value =
                            serde_json::from_str(&call.arguments).unwrap_or(json!({}));
                        blocks.push(json!({
                            "type": "tool_use",
                            "id": call.id,
                            "name": call.name,
                            "input": input,
                        }));
                    }
                }
                vendor.push(json!({"role": "assistant", "content": blocks}));
            }
            Role::Tool => {
                pending_tool_results.push(json!({
                    "type": "tool_result",
                    "tool_use_id": m.tool_call_id,
                    "content": m.content.clone().unwrap_or_default(),
                }));
            }
        }
    }
    flush(&mut pending_tool_results, &mut vendor);
    vendor
}

fn tools_to_vendor(tools: &[ToolDef]) -> Vec<Value> {
    tools
        .iter()
        .map(|t| {
            json!({
                "name": t.name,
                "description": t.description,
                "input_schema": t.json_schema,
            })
        })
        .collect()
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Other,
}

fn response_from_vendor(body: &Value) -> Result<ChatResponse> {
    let blocks: Vec<ContentBlock> = body
        .get("content")
        .and_then(|c| c.as_array())
        .ok_or_else(|| BctbError::llm("malformed response: missing content"))?
        .iter()
        .filter_map(|v| serde_json::from_value(v.clone()).ok())
        .collect();

    let mut text = String::new();
    let mut tool_calls = Vec::new();
    for block in &blocks {
        match block {
            ContentBlock::Text { text: t } => text.push_str(t),
            ContentBlock::ToolUse { id, name, input } => {
                tool_calls.push(ToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    arguments: input.to_string(),
                });
            }
            ContentBlock::Other => {}
        }
    }

    let assistant_message = ChatMessage::assistant(
        if text.is_empty() { None } else { Some(text.clone()) },
        tool_calls.clone(),
    );

    let usage = body
        .get("usage")
        .map(|u| TokenUsage {
            prompt_tokens: u.get("input_tokens").and_then(Value::as_u64).unwrap_or(0),
            completion_tokens: u.get("output_tokens").and_then(Value::as_u64).unwrap_or(0),
        })
        .unwrap_or_default();

    Ok(ChatResponse {
        content: text,
        tool_calls,
        assistant_message,
        usage,
    })
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    #[tracing::instrument(name = "llm.chat", skip(self, messages, tools, options), fields(provider = "anthropic", model = %self.config.model))]
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDef],
        options: &ChatOptions,
    ) -> Result<ChatResponse> {
        let (system, rest) = extract_leading_system(messages);
        let mut body = json!({
            "model": self.config.model,
            "max_tokens": options.max_tokens,
            "messages": messages_to_vendor(rest),
        });
        if let Some(system) = system {
            body["system"] = json!(system);
        }
        if !tools.is_empty() {
            body["tools"] = json!(tools_to_vendor(tools));
        }
        if let Some(temp) = options.temperature {
            body["temperature"] = json!(temp);
        }

        let response = self.execute_with_retry(&body).await?;
        response_from_vendor(&response)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ToolCall as Call;

    #[test]
    fn leading_system_messages_are_hoisted() {
        let messages = vec![
            ChatMessage::system("be precise"),
            ChatMessage::user("hello"),
        ];
        let (system, rest) = extract_leading_system(&messages);
        assert_eq!(system.as_deref(), Some("be precise"));
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn parallel_tool_calls_batch_into_one_user_message() {
        let messages = vec![
            ChatMessage::assistant(
                None,
                vec![
                    Call {
                        id: "1".into(),
                        name: "a".into(),
                        arguments: "{}".into(),
                    },
                    Call {
                        id: "2".into(),
                        name: "b".into(),
                        arguments: "{}".into(),
                    },
                ],
            ),
            ChatMessage::tool_result("1", "result-a"),
            ChatMessage::tool_result("2", "result-b"),
        ];
        let vendor = messages_to_vendor(&messages);
        assert_eq!(vendor.len(), 2);
        let tool_result_msg = &vendor[1];
        assert_eq!(tool_result_msg["role"], "user");
        assert_eq!(tool_result_msg["content"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn tool_use_input_is_decoded_json_object() {
        let body = json!({
            "content": [{"type": "tool_use", "id": "t1", "name": "query_telemetry", "input": {"kql": "X"}}],
            "usage": {"input_tokens": 3, "output_tokens": 1},
        });
        let resp = response_from_vendor(&body).unwrap();
        assert_eq!(resp.tool_calls[0].arguments, json!({"kql": "X"}).to_string());
    }

    #[test]
    fn text_only_response_has_no_tool_calls() {
        let body = json!({"content": [{"type": "text", "text": "All clear"}]});
        let resp = response_from_vendor(&body).unwrap();
        assert_eq!(resp.content, "All clear");
        assert!(!resp.has_tool_calls());
    }
}
