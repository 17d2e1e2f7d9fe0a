//! Azure OpenAI dialect: nested `function` envelope, tool calls with
//! stringified `arguments`, and a tool result that round-trips as a
//! `{role:"tool", tool_call_id, content}` message.
//!
//! Request/response shapes and the retry policy follow the reference
//! OpenAI-compatible provider's `execute_with_retry` pattern: exponential
//! backoff on 5xx and transport errors, no retry on 4xx.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::errors::{BctbError, Result};

use super::provider::LLMProvider;
use super::types::{ChatMessage, ChatOptions, ChatResponse, Role, TokenUsage, ToolCall, ToolDef};

pub struct AzureOpenAiConfig {
    pub endpoint: String,
    pub deployment: String,
    pub api_version: String,
    pub api_key: String,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

pub struct AzureOpenAiProvider {
    config: AzureOpenAiConfig,
    client: reqwest::Client,
}

impl AzureOpenAiProvider {
    pub fn new(config: AzureOpenAiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    fn url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.deployment,
            self.config.api_version
        )
    }

    async fn execute_with_retry(&self, body: &Value) -> Result<Value> {
        let mut attempt = 0;
        loop {
            let response = self
                .client
                .post(self.url())
                .header("api-key", &self.config.api_key)
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
                            "azure openai request failed ({status}): {truncated}"
                        )));
                    }
                }
                Err(e) if attempt >= self.config.max_retries => {
                    return Err(BctbError::llm(format!("azure openai transport error: {e}")));
                }
                Err(_) => {}
            }
            attempt += 1;
            let backoff = Duration::from_millis(200 * 2u64.pow(attempt.min(5)));
            tokio::time::sleep(backoff).await;
        }
    }
}

#[derive(Serialize)]
struct FunctionDef<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Serialize)]
struct ToolSpec<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: FunctionDef<'a>,
}

fn messages_to_vendor(messages: &[ChatMessage]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| match m.role {
            Role::System => json!({"role": "system", "content": m.content.clone().unwrap_or_default()}),
            Role::User => json!({"role": "user", "content": m.content.clone().unwrap_or_default()}),
            Role::Assistant => {
                let mut obj = json!({"role": "assistant", "content": m.content});
                if let Some(calls) = &m.tool_calls {
                    obj["tool_calls"] = json!(calls
                        .iter()
                        .map(|c| json!({
                            "id": c.id,
                            "type": "function",
                            "function": {"name": c.name, "arguments": c.arguments},
                        }))
                        .collect::<Vec<_>>());
                }
                obj
            }
            Role::Tool => json!({
                "role": "tool",
                "tool_call_id": m.tool_call_id,
                "content": m.content.clone().unwrap_or_default(),
            }),
        })
        .collect()
}

fn tools_to_vendor(tools: &[ToolDef]) -> Vec<ToolSpec<'_>> {
    tools
        .iter()
        .map(|t| ToolSpec {
            kind: "function",
            function: FunctionDef {
                name: &t.name,
                description: &t.description,
                parameters: &t.json_schema,
            },
        })
        .collect()
}

#[derive(Deserialize)]
struct VendorToolCall {
    id: String,
    function: VendorFunctionCall,
}

#[derive(Deserialize)]
struct VendorFunctionCall {
    name: String,
    arguments: String,
}

fn response_from_vendor(body: &Value) -> Result<ChatResponse> {
    let choice = body
        .get("choices")
        .and_then(|c| c.get(0))
        .ok_or_else(|| BctbError::llm("malformed response: missing choices[0]"))?;
    let message = choice
        .get("message")
        .ok_or_else(|| BctbError::llm("malformed response: missing message"))?;

    let content = message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let tool_calls: Vec<ToolCall> = match message.get("tool_calls") {
        Some(Value::Array(arr)) => arr
            .iter()
            .filter_map(|v| serde_json::from_value::<VendorToolCall>(v.clone()).ok())
            .map(|v| ToolCall {
                id: v.id,
                name: v.function.name,
                arguments: v.function.arguments,
            })
            .collect(),
        _ => Vec::new(),
    };

    let assistant_message = ChatMessage::assistant(
        if content.is_empty() {
            None
        } else {
            Some(content.clone())
        },
        tool_calls.clone(),
    );

    let usage = body
        .get("usage")
        .map(|u| TokenUsage {
            prompt_tokens: u.get("prompt_tokens").and_then(Value::as_u64).unwrap_or(0),
            completion_tokens: u
                .get("completion_tokens")
                .and_then(Value::as_u64)
                .unwrap_or(0),
        })
        .unwrap_or_default();

    Ok(ChatResponse {
        content,
        tool_calls,
        assistant_message,
        usage,
    })
}

#[async_trait]
impl LLMProvider for AzureOpenAiProvider {
    #[tracing::instrument(name = "llm.chat", skip(self, messages, tools, options), fields(provider = "azure-openai", deployment = %self.config.deployment))]
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDef],
        options: &ChatOptions,
    ) -> Result<ChatResponse> {
        let mut body = json!({
            "messages": messages_to_vendor(messages),
            "max_tokens": options.max_tokens,
        });
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
        &self.config.deployment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_text_response() {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": "All clear"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5},
        });
        let resp = response_from_vendor(&body).unwrap();
        assert_eq!(resp.content, "All clear");
        assert!(!resp.has_tool_calls());
        assert_eq!(resp.usage.prompt_tokens, 10);
    }

    #[test]
    fn parses_tool_call_response() {
        let body = json!({
            "choices": [{"message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "get_event_catalog", "arguments": "{\"days\":10}"}
                }]
            }}]
        });
        let resp = response_from_vendor(&body).unwrap();
        assert!(resp.has_tool_calls());
        assert_eq!(resp.tool_calls[0].name, "get_event_catalog");
        assert_eq!(resp.tool_calls[0].arguments, "{\"days\":10}");
    }

    #[test]
    fn missing_usage_defaults_to_zero() {
        let body = json!({"choices": [{"message": {"role": "assistant", "content": "ok"}}]});
        let resp = response_from_vendor(&body).unwrap();
        assert_eq!(resp.usage.prompt_tokens, 0);
        assert_eq!(resp.usage.completion_tokens, 0);
    }

    #[test]
    fn malformed_response_is_llm_error() {
        let body = json!({"nope": true});
        let err = response_from_vendor(&body).unwrap_err();
        assert!(matches!(err, BctbError::Llm(_)));
    }

    #[test]
    fn tool_result_message_round_trips_to_vendor_shape() {
        let messages = vec![ChatMessage::tool_result("call_1", "{\"rows\":[]}")];
        let vendor = messages_to_vendor(&messages);
        assert_eq!(vendor[0]["role"], "tool");
        assert_eq!(vendor[0]["tool_call_id"], "call_1");
    }
}
