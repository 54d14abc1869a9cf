use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use super::{Error, Tool, ToolResult};

/// Object-safe view of a [`Tool`], used by the registry.
pub(crate) trait ToolObject: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameter_schema(&self) -> &Value;

    /// Decodes the arguments and runs the tool. Nothing happens until the
    /// returned future is polled, so a panicking tool only ever panics
    /// inside it.
    fn execute(
        self: Arc<Self>,
        arguments: Value,
    ) -> Pin<Box<dyn Future<Output = ToolResult> + Send>>;
}

pub(crate) struct AnyTool<T: Tool>(pub T);

impl<T: Tool> ToolObject for AnyTool<T> {
    #[inline]
    fn name(&self) -> &str {
        self.0.name()
    }

    #[inline]
    fn description(&self) -> &str {
        self.0.description()
    }

    #[inline]
    fn parameter_schema(&self) -> &Value {
        self.0.parameter_schema()
    }

    fn execute(
        self: Arc<Self>,
        arguments: Value,
    ) -> Pin<Box<dyn Future<Output = ToolResult> + Send>> {
        Box::pin(async move {
            let input: T::Input = serde_json::from_value(arguments).map_err(
                |err| Error::invalid_input().with_reason(format!("{err}")),
            )?;
            self.0.execute(input).await
        })
    }
}
