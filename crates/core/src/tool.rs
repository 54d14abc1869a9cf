//! Tool call supports.

mod dispatcher;
mod error;
mod func;
mod object;
mod registry;

use serde::de::DeserializeOwned;
use serde_json::Value;

pub use dispatcher::{Dispatcher, Observation};
pub use error::{Error, ErrorKind};
pub use func::{FnTool, from_fn};
pub(crate) use object::{AnyTool, ToolObject};
pub use registry::ToolRegistry;

/// The result of a tool call.
pub type ToolResult = Result<String, Error>;

/// A tool that can be called by the model.
///
/// Tools are registered once and shared across rounds, so any state they
/// keep must be safe to access concurrently. Context such as the working
/// directory should be captured during initialization and copied into the
/// future returned by [`Tool::execute`].
pub trait Tool: Send + Sync + 'static {
    /// The type of input that the tool accepts.
    type Input: DeserializeOwned;

    /// Returns the name of the tool.
    fn name(&self) -> &str;

    /// Returns the description of the tool.
    fn description(&self) -> &str;

    /// Returns the parameter schema of the tool.
    fn parameter_schema(&self) -> &Value;

    /// Executes the tool with the given input.
    ///
    /// This method must return a future that is fully independent of `self`.
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static;
}
