use agenthub_model::{
    ErrorKind, ModelFinishReason, ModelReply, TokenUsage, ToolCallRequest,
};

use crate::Error;
use crate::proto::{self, ChatCompletion};

/// Converts the first choice of a completion into a reply.
pub(crate) fn from_completion(
    mut completion: ChatCompletion,
) -> Result<ModelReply, Error> {
    if completion.choices.is_empty() {
        return Err(Error::new("the response has no choices", ErrorKind::Other));
    }
    let choice = completion.choices.swap_remove(0);
    trace!("got completion {}: {choice:?}", completion.id);

    let finish_reason = match choice.finish_reason.as_deref() {
        Some("content_filter") => {
            return Err(Error::new(
                "the response was blocked by the content filter",
                ErrorKind::Moderated,
            ));
        }
        Some("length") => ModelFinishReason::Length,
        Some("tool_calls") | Some("function_call") => ModelFinishReason::ToolCalls,
        _ if !choice.message.tool_calls.is_empty() => {
            ModelFinishReason::ToolCalls
        }
        _ => ModelFinishReason::Stop,
    };

    let tool_calls = choice
        .message
        .tool_calls
        .into_iter()
        .map(|tool_call| ToolCallRequest {
            id: tool_call.id,
            name: tool_call.function.name,
            arguments: proto::parse_arguments(&tool_call.function.arguments),
        })
        .collect();

    Ok(ModelReply {
        content: choice.message.content.filter(|content| !content.is_empty()),
        tool_calls,
        finish_reason,
        usage: completion.usage.map(|usage| TokenUsage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        }),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_tool_call_completion() {
        let completion: ChatCompletion =
            serde_json::from_str(include_str!("../fixtures/chat_completion.json"))
                .unwrap();
        let reply = from_completion(completion).unwrap();

        assert_eq!(
            reply.content.as_deref(),
            Some("I will look at the project first.")
        );
        assert_eq!(reply.finish_reason, ModelFinishReason::ToolCalls);
        assert_eq!(reply.tool_calls.len(), 2);
        let call = &reply.tool_calls[0];
        assert_eq!(call.id, "call_ls");
        assert_eq!(call.name, "shell");
        assert_eq!(call.arguments, json!({ "command": "ls -la" }));
        assert_eq!(reply.tool_calls[1].name, "read_file");
        assert_eq!(reply.usage.map(|usage| usage.total()), Some(469));
    }

    #[test]
    fn test_text_completion() {
        let completion: ChatCompletion = serde_json::from_value(json!({
            "id": "x",
            "choices": [{
                "message": { "role": "assistant", "content": "Hi!" },
                "finish_reason": "stop"
            }]
        }))
        .unwrap();
        let reply = from_completion(completion).unwrap();
        assert_eq!(reply, ModelReply::text("Hi!"));
    }

    #[test]
    fn test_truncated_completion() {
        let completion: ChatCompletion = serde_json::from_value(json!({
            "choices": [{
                "message": { "content": "" },
                "finish_reason": "length"
            }]
        }))
        .unwrap();
        let reply = from_completion(completion).unwrap();
        assert_eq!(reply.content, None);
        assert_eq!(reply.finish_reason, ModelFinishReason::Length);
    }

    #[test]
    fn test_rejected_completions() {
        let filtered: ChatCompletion = serde_json::from_value(json!({
            "choices": [{
                "message": { "content": null },
                "finish_reason": "content_filter"
            }]
        }))
        .unwrap();
        let err = from_completion(filtered).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Moderated);

        let empty: ChatCompletion =
            serde_json::from_value(json!({ "choices": [] })).unwrap();
        assert!(from_completion(empty).is_err());
    }
}
