use std::any::Any;
use std::fmt::{self, Display};
use std::sync::Arc;

use tracing::Instrument;

use super::ToolRegistry;
use crate::command::Command;

const EMPTY_OUTPUT: &str =
    "The command ran successfully and did not produce any output.";

/// The textual result of dispatching a command.
///
/// Failures are observations too: they are fed back to the model like any
/// other tool output so it can correct itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Observation {
    content: String,
    is_error: bool,
}

impl Observation {
    fn success(name: &str, output: &str) -> Self {
        let output = if output.is_empty() { EMPTY_OUTPUT } else { output };
        Self {
            content: format!("Observed result of command '{name}':\n{output}"),
            is_error: false,
        }
    }

    fn error(trace: impl Display) -> Self {
        Self {
            content: format!("Error:\n{trace}"),
            is_error: true,
        }
    }

    /// Returns the text appended to the message log.
    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns `true` if the command failed.
    #[inline]
    pub fn is_error(&self) -> bool {
        self.is_error
    }

    /// Consumes the observation and returns its text.
    #[inline]
    pub fn into_content(self) -> String {
        self.content
    }
}

impl Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}

/// Resolves commands against a [`ToolRegistry`] and executes them.
///
/// Dispatching never fails: unknown tools, bad arguments, tool errors and
/// tool panics all come back as error observations.
#[derive(Clone, Copy, Debug)]
pub struct Dispatcher<'a> {
    registry: &'a ToolRegistry,
}

impl<'a> Dispatcher<'a> {
    /// Creates a dispatcher over `registry`.
    #[inline]
    pub fn new(registry: &'a ToolRegistry) -> Self {
        Self { registry }
    }

    /// Executes a single command and returns its observation.
    pub async fn dispatch(&self, command: &Command) -> Observation {
        let name = command.name();
        if name.is_empty() {
            return Observation::error("No command specified.");
        }
        let Some(tool) = self.registry.resolve(name) else {
            warn!("the model requested an unknown tool `{name}`");
            return Observation::error(format!("Command '{name}' not found."));
        };

        let fut = Arc::clone(tool).execute(command.arguments().clone());
        let span = debug_span!("tool execute", id = command.id(), tool = name);
        // Running the tool on its own task isolates panics from the loop.
        let joined = tokio::spawn(fut.instrument(span)).await;

        match joined {
            Ok(Ok(output)) => {
                debug!("command `{name}` completed");
                Observation::success(name, &output)
            }
            Ok(Err(err)) => {
                debug!("command `{name}` failed: {err}");
                Observation::error(format!(
                    "Command '{name}' failed with {}",
                    err.trace()
                ))
            }
            Err(err) if err.is_panic() => {
                let payload = panic_message(err.into_panic());
                error!("tool `{name}` panicked: {payload}");
                Observation::error(format!("Tool '{name}' panicked: {payload}"))
            }
            Err(err) => {
                error!("tool `{name}` was cancelled: {err}");
                Observation::error(format!("Tool '{name}' was cancelled."))
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::tool::{Error, from_fn};

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::default();
        registry.register(from_fn(
            "echo",
            "Echoes `text`.",
            json!({ "type": "object" }),
            |args| match args.get("text") {
                Some(Value::String(text)) => Ok(text.clone()),
                _ => Err(Error::invalid_input().with_reason("missing `text`")),
            },
        ));
        registry.register(from_fn(
            "boom",
            "Always panics.",
            json!({ "type": "object" }),
            |_| panic!("tool exploded"),
        ));
        registry
    }

    #[tokio::test]
    async fn test_success() {
        let registry = registry();
        let dispatcher = Dispatcher::new(&registry);

        let obs = dispatcher
            .dispatch(&Command::new("1", "echo", json!({ "text": "hi" })))
            .await;
        assert!(!obs.is_error());
        assert_eq!(obs.content(), "Observed result of command 'echo':\nhi");

        let obs = dispatcher
            .dispatch(&Command::new("2", "echo", json!({ "text": "" })))
            .await;
        assert_eq!(
            obs.content(),
            format!("Observed result of command 'echo':\n{EMPTY_OUTPUT}")
        );
    }

    #[tokio::test]
    async fn test_unknown_and_empty_names() {
        let registry = registry();
        let dispatcher = Dispatcher::new(&registry);

        let obs = dispatcher
            .dispatch(&Command::new("1", "unknown_tool", json!({})))
            .await;
        assert!(obs.is_error());
        assert_eq!(obs.content(), "Error:\nCommand 'unknown_tool' not found.");

        let obs = dispatcher.dispatch(&Command::new("2", "", json!({}))).await;
        assert_eq!(obs.content(), "Error:\nNo command specified.");
    }

    #[tokio::test]
    async fn test_tool_errors() {
        let registry = registry();
        let dispatcher = Dispatcher::new(&registry);

        let obs = dispatcher.dispatch(&Command::new("1", "echo", json!({}))).await;
        assert!(obs.is_error());
        assert_eq!(
            obs.content(),
            "Error:\nCommand 'echo' failed with Invalid input: missing `text`"
        );

        // Non-object arguments never reach the closure.
        let obs = dispatcher
            .dispatch(&Command::new("2", "echo", json!("oops")))
            .await;
        assert!(obs.is_error());
        assert!(obs.content().contains("Invalid input"));
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let registry = registry();
        let dispatcher = Dispatcher::new(&registry);

        let obs = dispatcher.dispatch(&Command::new("1", "boom", json!({}))).await;
        assert!(obs.is_error());
        assert_eq!(obs.content(), "Error:\nTool 'boom' panicked: tool exploded");

        // The dispatcher is still usable afterwards.
        let obs = dispatcher
            .dispatch(&Command::new("2", "echo", json!({ "text": "ok" })))
            .await;
        assert!(!obs.is_error());
    }
}
