use agenthub_model::ToolChoice;

use crate::completion::CompletionDetector;

/// Default round budget for a run.
pub const DEFAULT_MAX_STEPS: usize = 30;

/// Default number of earlier identical assistant replies that marks the
/// agent as stuck.
pub const DEFAULT_DUPLICATE_THRESHOLD: usize = 2;

/// The static configuration of an agent loop.
#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub(crate) name: String,
    pub(crate) system_prompt: Option<String>,
    pub(crate) instruction_template: Option<String>,
    pub(crate) completion: CompletionDetector,
    pub(crate) max_steps: usize,
    pub(crate) tool_choice: ToolChoice,
    pub(crate) duplicate_threshold: Option<usize>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "agent".to_owned(),
            system_prompt: None,
            instruction_template: None,
            completion: CompletionDetector::default(),
            max_steps: DEFAULT_MAX_STEPS,
            tool_choice: ToolChoice::Auto,
            duplicate_threshold: Some(DEFAULT_DUPLICATE_THRESHOLD),
        }
    }
}

impl AgentConfig {
    /// Returns the agent name used in logs.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the system prompt prepended to every request.
    #[inline]
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// Returns the per-round instruction template.
    #[inline]
    pub fn instruction_template(&self) -> Option<&str> {
        self.instruction_template.as_deref()
    }

    /// Returns the completion detector.
    #[inline]
    pub fn completion(&self) -> &CompletionDetector {
        &self.completion
    }

    /// Returns the maximum number of rounds per run.
    #[inline]
    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Returns the tool choice sent with every request.
    #[inline]
    pub fn tool_choice(&self) -> ToolChoice {
        self.tool_choice
    }

    /// Returns the stuck detection threshold, if enabled.
    #[inline]
    pub fn duplicate_threshold(&self) -> Option<usize> {
        self.duplicate_threshold
    }
}
