//! Turns raw model tool calls into dispatchable commands.

use agenthub_model::ToolCallRequest;
use serde_json::{Map, Value};

/// A structured request, proposed by the model, to invoke a named tool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    id: String,
    name: String,
    arguments: Value,
}

impl Command {
    /// Creates a command.
    #[inline]
    pub fn new<S1: Into<String>, S2: Into<String>>(
        id: S1,
        name: S2,
        arguments: Value,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Returns the identifier pairing this command with its observation.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the name of the tool to invoke.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the arguments, normally a JSON object.
    #[inline]
    pub fn arguments(&self) -> &Value {
        &self.arguments
    }

    /// Converts the command back into the shape stored in assistant messages.
    pub(crate) fn to_request(&self) -> ToolCallRequest {
        ToolCallRequest {
            id: self.id.clone(),
            name: self.name.clone(),
            arguments: self.arguments.clone(),
        }
    }
}

/// Extracts the commands from the tool calls of one model response.
///
/// Order is preserved exactly. Names are trimmed, missing ids are filled
/// with `call_<round>_<index>` so that every command can be paired with an
/// observation. Arguments arriving as a JSON-encoded object string are
/// decoded, `null` becomes an empty object, and anything else is passed
/// through untouched for the tool to reject.
pub fn extract_commands(
    requests: Vec<ToolCallRequest>,
    round: usize,
) -> Vec<Command> {
    requests
        .into_iter()
        .enumerate()
        .map(|(index, req)| {
            let id = match req.id.trim() {
                "" => format!("call_{round}_{index}"),
                id => id.to_owned(),
            };
            let command = Command {
                id,
                name: req.name.trim().to_owned(),
                arguments: normalize_arguments(req.arguments),
            };
            trace!("extracted command: {command:?}");
            command
        })
        .collect()
}

fn normalize_arguments(arguments: Value) -> Value {
    match arguments {
        Value::Null => Value::Object(Map::new()),
        Value::String(raw) => {
            match serde_json::from_str::<Map<String, Value>>(&raw) {
                Ok(object) => Value::Object(object),
                Err(_) => Value::String(raw),
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request(id: &str, name: &str, arguments: Value) -> ToolCallRequest {
        ToolCallRequest {
            id: id.to_owned(),
            name: name.to_owned(),
            arguments,
        }
    }

    #[test]
    fn test_preserves_order_and_duplicates() {
        let commands = extract_commands(
            vec![
                request("a", "shell", json!({ "command": "ls" })),
                request("b", "read_file", json!({ "path": "x" })),
                request("c", "shell", json!({ "command": "ls" })),
            ],
            1,
        );
        let names: Vec<_> = commands.iter().map(Command::name).collect();
        assert_eq!(names, ["shell", "read_file", "shell"]);
        assert_eq!(commands[0].arguments(), commands[2].arguments());
        assert_ne!(commands[0].id(), commands[2].id());
    }

    #[test]
    fn test_no_requests() {
        assert!(extract_commands(vec![], 3).is_empty());
    }

    #[test]
    fn test_fills_missing_ids() {
        let commands = extract_commands(
            vec![request("", "finish", json!({})), request(" ", "x", json!({}))],
            4,
        );
        assert_eq!(commands[0].id(), "call_4_0");
        assert_eq!(commands[1].id(), "call_4_1");
    }

    #[test]
    fn test_trims_names() {
        let commands =
            extract_commands(vec![request("1", "  finish\n", json!({}))], 1);
        assert_eq!(commands[0].name(), "finish");

        // A blank name survives extraction and is rejected by the dispatcher.
        let commands = extract_commands(vec![request("2", "  ", json!({}))], 1);
        assert_eq!(commands[0].name(), "");
    }

    #[test]
    fn test_normalizes_arguments() {
        let commands = extract_commands(
            vec![
                request("1", "a", Value::Null),
                request("2", "b", json!("{\"path\": \"/tmp\"}")),
                request("3", "c", json!("not json")),
                request("4", "d", json!([1, 2])),
            ],
            1,
        );
        assert_eq!(commands[0].arguments(), &json!({}));
        assert_eq!(commands[1].arguments(), &json!({ "path": "/tmp" }));
        assert_eq!(commands[2].arguments(), &json!("not json"));
        assert_eq!(commands[3].arguments(), &json!([1, 2]));
    }
}
