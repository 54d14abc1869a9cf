use std::sync::Arc;

use agenthub_model::{ModelProvider, ToolChoice};

use super::Agent;
use crate::agent_loop::{AgentLoop, TranscriptFn, TranscriptSource};
use crate::config::AgentConfig;
use crate::context::ContextProvider;
use crate::model_client::{ModelClient, RetryPolicy};
use crate::tool::{AnyTool, Tool, ToolObject, ToolRegistry};

/// [`Agent`] builder.
pub struct AgentBuilder {
    config: AgentConfig,
    model_client: ModelClient,
    tools: Vec<Arc<dyn ToolObject>>,
    context_provider: Option<Arc<dyn ContextProvider>>,
    on_transcript: Option<TranscriptFn>,
    pub(crate) on_idle: Option<Box<dyn Fn() + Send + Sync>>,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            config: AgentConfig::default(),
            model_client: ModelClient::new(provider),
            tools: vec![],
            context_provider: None,
            on_transcript: None,
            on_idle: None,
        }
    }

    /// Sets the name used in logs.
    #[inline]
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.name = name.into();
        self
    }

    /// Sets the system prompt, sent first in every request.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the per-round instruction template.
    ///
    /// `{key}` placeholders are filled from the working context before each
    /// round. The rendered instruction is sent with the request but never
    /// stored in the message log.
    #[inline]
    pub fn with_instruction_template<S: Into<String>>(
        mut self,
        template: S,
    ) -> Self {
        self.config.instruction_template = Some(template.into());
        self
    }

    /// Registers a tool. A tool with the same name as an earlier one
    /// replaces it.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.tools.push(Arc::new(AnyTool(tool)));
        self
    }

    /// Marks a tool name as terminal: executing it completes the task.
    #[inline]
    pub fn with_terminal_command<S: Into<String>>(mut self, name: S) -> Self {
        self.config.completion.insert(name);
        self
    }

    /// Sets the maximum number of rounds per run.
    #[inline]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.config.max_steps = max_steps;
        self
    }

    /// Sets the tool choice sent with every request.
    #[inline]
    pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.config.tool_choice = tool_choice;
        self
    }

    /// Sets how many earlier identical replies mark the agent as stuck.
    /// `None` disables the detection.
    #[inline]
    pub fn with_duplicate_threshold(mut self, threshold: Option<usize>) -> Self {
        self.config.duplicate_threshold = threshold;
        self
    }

    /// Sets how transient model failures are retried.
    #[inline]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.model_client = self.model_client.with_retry_policy(retry_policy);
        self
    }

    /// Sets the provider of the working context.
    #[inline]
    pub fn with_context_provider<C: ContextProvider + 'static>(
        mut self,
        provider: C,
    ) -> Self {
        self.context_provider = Some(Arc::new(provider));
        self
    }

    /// Attaches a callback receiving user, assistant and tool transcripts.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str, TranscriptSource) + Send + Sync + 'static,
    ) -> Self {
        self.on_transcript = Some(Arc::new(on_transcript));
        self
    }

    /// Attaches a callback to be invoked when the agent is idle.
    #[inline]
    pub fn on_idle(
        mut self,
        on_idle: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.on_idle = Some(Box::new(on_idle));
        self
    }

    /// Builds a standalone loop, driven by the caller.
    #[inline]
    pub fn build_loop(self) -> AgentLoop {
        self.into_parts().0.make_loop()
    }

    /// Builds the agent. Must be called within a tokio runtime.
    #[inline]
    pub fn build(self) -> Agent {
        let (factory, on_idle) = self.into_parts();
        Agent::spawn_with(factory, on_idle)
    }

    fn into_parts(self) -> (LoopFactory, Option<Box<dyn Fn() + Send + Sync>>) {
        let factory = LoopFactory {
            config: Arc::new(self.config),
            model_client: self.model_client,
            registry: Arc::new(ToolRegistry::with_tools(self.tools)),
            context_provider: self.context_provider,
            on_transcript: self.on_transcript,
        };
        (factory, self.on_idle)
    }
}

/// Everything needed to start a fresh loop for a task.
pub(crate) struct LoopFactory {
    config: Arc<AgentConfig>,
    model_client: ModelClient,
    registry: Arc<ToolRegistry>,
    context_provider: Option<Arc<dyn ContextProvider>>,
    on_transcript: Option<TranscriptFn>,
}

impl LoopFactory {
    #[inline]
    pub(crate) fn name(&self) -> &str {
        self.config.name()
    }

    pub(crate) fn make_loop(&self) -> AgentLoop {
        AgentLoop::new(
            Arc::clone(&self.config),
            self.model_client.clone(),
            Arc::clone(&self.registry),
            self.context_provider.clone(),
            self.on_transcript.clone(),
        )
    }
}
