use std::future::ready;

use serde_json::{Map, Value};

use super::{Tool, ToolResult};

/// A tool backed by a synchronous closure over the raw argument object.
pub struct FnTool<F> {
    name: String,
    description: String,
    parameter_schema: Value,
    f: F,
}

/// Creates a tool from a closure.
///
/// The closure receives the arguments as a JSON object; anything else is
/// rejected as invalid input before the closure runs.
pub fn from_fn<F>(
    name: impl Into<String>,
    description: impl Into<String>,
    parameter_schema: Value,
    f: F,
) -> FnTool<F>
where
    F: Fn(Map<String, Value>) -> ToolResult + Send + Sync + 'static,
{
    FnTool {
        name: name.into(),
        description: description.into(),
        parameter_schema,
        f,
    }
}

impl<F> Tool for FnTool<F>
where
    F: Fn(Map<String, Value>) -> ToolResult + Send + Sync + 'static,
{
    type Input = Map<String, Value>;

    #[inline]
    fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    fn description(&self) -> &str {
        &self.description
    }

    #[inline]
    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[inline]
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        ready((self.f)(input))
    }
}
