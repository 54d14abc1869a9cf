use agenthub_core::tool::{Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FinishStatus {
    Success,
    Failure,
}

#[derive(Deserialize, JsonSchema)]
pub struct FinishParameters {
    #[schemars(description = "The status of the interaction.")]
    status: FinishStatus,
}

/// A tool that ends the interaction.
pub struct FinishTool {
    parameter_schema: Value,
}

impl FinishTool {
    /// Creates a new finish tool.
    #[inline]
    pub fn new() -> Self {
        FinishTool {
            parameter_schema: schema_for!(FinishParameters).to_value(),
        }
    }
}

impl Default for FinishTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for FinishTool {
    type Input = FinishParameters;

    fn name(&self) -> &str {
        "finish"
    }

    fn description(&self) -> &str {
        "Finish the interaction when the task is complete or if you cannot proceed further with the task."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: FinishParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let status = match input.status {
            FinishStatus::Success => "success",
            FinishStatus::Failure => "failure",
        };
        async move {
            Ok(format!("The interaction has been completed with status: {status}"))
        }
    }
}

#[derive(Deserialize, JsonSchema)]
pub struct AttemptCompletionParameters {
    #[schemars(
        description = "The final result of the task. Do not end it with questions or offers for further assistance."
    )]
    result: String,
}

/// A tool that reports the final result of a task.
pub struct AttemptCompletionTool {
    parameter_schema: Value,
}

impl AttemptCompletionTool {
    /// Creates a new attempt completion tool.
    #[inline]
    pub fn new() -> Self {
        AttemptCompletionTool {
            parameter_schema: schema_for!(AttemptCompletionParameters)
                .to_value(),
        }
    }
}

impl Default for AttemptCompletionTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for AttemptCompletionTool {
    type Input = AttemptCompletionParameters;

    fn name(&self) -> &str {
        "attempt_completion"
    }

    fn description(&self) -> &str {
        "Use this when the task is resolved completely, or when there is enough evidence that your changes resolved it."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: AttemptCompletionParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        async move { Ok(input.result) }
    }
}
