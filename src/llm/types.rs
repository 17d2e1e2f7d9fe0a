//! The flat, vendor-agnostic chat shape the Agent Runtime speaks.
//!
//! Per §9 ("Cross-vendor message normalization"), `ChatMessage` stays in
//! this flat OpenAI-like shape regardless of which vendor dialect a
//! provider implementation actually speaks on the wire; translation to and
//! from the vendor shape is a provider-local concern (see `azure_openai.rs`
//! and `anthropic.rs`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One tool invocation requested by the assistant on a given turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Raw JSON-encoded arguments, exactly as the vendor returned them.
    /// The runtime decodes this per tool call (§4.6, §9): on decode
    /// failure it substitutes `{}` rather than aborting.
    pub arguments: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Present only on `Role::Tool` messages: the id of the `ToolCall` this
    /// message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn assistant(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls)
            },
            tool_call_id: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// Tool definition in the shape the runtime presents to providers, before
/// vendor-specific translation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    pub json_schema: Value,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

/// Options accompanying a `chat` call.
#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: None,
        }
    }
}

/// The uniform response shape every provider returns, regardless of
/// vendor dialect.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Text content of the assistant's turn. Empty when the turn is a
    /// pure tool-call turn for vendors that don't echo content alongside
    /// tool calls.
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    /// The assistant turn in `ChatMessage` shape, ready to append to the
    /// running message history unchanged.
    pub assistant_message: ChatMessage,
    pub usage: TokenUsage,
}

impl ChatResponse {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_message_constructors() {
        let sys = ChatMessage::system("be helpful");
        assert_eq!(sys.role, Role::System);
        assert_eq!(sys.content.as_deref(), Some("be helpful"));

        let assistant = ChatMessage::assistant(
            None,
            vec![ToolCall {
                id: "1".into(),
                name: "get_event_catalog".into(),
                arguments: "{}".into(),
            }],
        );
        assert_eq!(assistant.tool_calls.unwrap().len(), 1);

        let empty_assistant = ChatMessage::assistant(Some("done".into()), vec![]);
        assert!(empty_assistant.tool_calls.is_none());
    }
}
