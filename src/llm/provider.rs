//! The `LLMProvider` capability trait.
//!
//! Modeled the way the reference provider abstraction models it: a small
//! trait with per-vendor implementations, so the Agent Runtime never needs
//! to know which dialect it's talking to (§9, "Polymorphic LLM providers").

use async_trait::async_trait;

use crate::errors::Result;

use super::types::{ChatMessage, ChatOptions, ChatResponse, ToolDef};

#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Send one chat turn. `messages` is the full running history in the
    /// flat shape; `tools` is the set of tool definitions currently in
    /// scope (already filtered by §4.5's `filterToolsByScope`).
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDef],
        options: &ChatOptions,
    ) -> Result<ChatResponse>;

    /// The model identifier this provider is configured to call, for
    /// inclusion in `AgentRunLog.llm.model`.
    fn model_name(&self) -> &str;
}
