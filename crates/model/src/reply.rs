use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::request::AssistantMessage;

/// The reason why the model stopped generating.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ModelFinishReason {
    /// The model wants to call tools.
    ToolCalls,
    /// The model has finished its turn.
    #[default]
    Stop,
    /// The output was cut off by the token limit.
    Length,
}

/// A tool call requested by the model.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Identifier echoed back with the result. May be empty if the provider
    /// did not assign one.
    pub id: String,
    /// The name of the tool to call.
    pub name: String,
    /// The arguments to pass to the tool, usually a JSON object.
    pub arguments: Value,
}

/// Token accounting reported by the provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the request.
    pub prompt_tokens: u32,
    /// Tokens generated in the reply.
    pub completion_tokens: u32,
}

impl TokenUsage {
    /// Returns the sum of prompt and completion tokens.
    #[inline]
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// One complete assistant turn returned by a provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelReply {
    /// Free-text content of the turn.
    pub content: Option<String>,
    /// Tool calls in the order the model emitted them.
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRequest>,
    /// Why the model stopped.
    #[serde(default)]
    pub finish_reason: ModelFinishReason,
    /// Token usage, if the provider reports it.
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

impl ModelReply {
    /// Creates a text-only reply.
    #[inline]
    pub fn text<S: Into<String>>(content: S) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// Adds a tool call, marking the reply as a tool-calling turn.
    #[inline]
    pub fn with_tool_call(mut self, request: ToolCallRequest) -> Self {
        self.tool_calls.push(request);
        self.finish_reason = ModelFinishReason::ToolCalls;
        self
    }

    /// Returns the content, treating an empty string as no content.
    #[inline]
    pub fn text_content(&self) -> Option<&str> {
        self.content.as_deref().filter(|content| !content.is_empty())
    }

    /// Converts the reply into the message stored in a conversation.
    pub fn into_message(self) -> AssistantMessage {
        AssistantMessage {
            content: self.content.filter(|content| !content.is_empty()),
            tool_calls: self.tool_calls,
        }
    }
}
