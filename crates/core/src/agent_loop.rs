//! The think/act loop driving a single task.


use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use agenthub_model::{
    AssistantMessage, ErrorKind, ModelFinishReason, ModelMessage,
    ModelProviderError, ModelRequest, ToolCallResult,
};
use tracing::Instrument;

use crate::command::{Command, extract_commands};
use crate::config::AgentConfig;
use crate::context::ContextProvider;
use crate::message_log::MessageLog;
use crate::model_client::ModelClient;
use crate::tool::{Dispatcher, ToolRegistry};

const STUCK_PROMPT: &str = "Observed duplicate responses. Consider changing \
    strategy or terminating the interaction.";

pub(crate) type TranscriptFn = Arc<dyn Fn(&str, TranscriptSource) + Send + Sync>;

/// Where a transcript line comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TranscriptSource {
    /// The task given by the user.
    User,
    /// Text produced by the model.
    Assistant,
    /// An observation produced by a tool.
    Tool,
}

/// The lifecycle state of an agent loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AgentState {
    /// Ready to accept a task.
    #[default]
    Idle,
    /// A run is in progress.
    Running,
    /// The task was completed or the run was stopped.
    Finished,
    /// The model could not be reached.
    Error,
}

impl Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentState::Idle => write!(f, "idle"),
            AgentState::Running => write!(f, "running"),
            AgentState::Finished => write!(f, "finished"),
            AgentState::Error => write!(f, "error"),
        }
    }
}

/// Why a run ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TerminationReason {
    /// A terminal command was executed.
    TerminalCommand {
        /// Name of the terminal command.
        name: String,
    },
    /// The model answered without proposing any command.
    NoCommands,
    /// The round budget ran out.
    BudgetExhausted,
    /// The model failed and retries were exhausted.
    OracleError {
        /// Classification of the failure.
        kind: ErrorKind,
        /// The rendered error.
        message: String,
    },
    /// The run was stopped from outside.
    Stopped,
}

impl Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::TerminalCommand { name } => {
                write!(f, "terminal command `{name}` executed")
            }
            TerminationReason::NoCommands => write!(f, "no commands proposed"),
            TerminationReason::BudgetExhausted => {
                write!(f, "step budget exhausted")
            }
            TerminationReason::OracleError { kind, message } => {
                write!(f, "model error ({kind}): {message}")
            }
            TerminationReason::Stopped => write!(f, "stopped"),
        }
    }
}

/// The outcome of [`AgentLoop::run`].
#[derive(Clone, Debug)]
pub struct RunResult {
    /// State of the loop when the run ended.
    pub state: AgentState,
    /// Why the run ended.
    pub reason: TerminationReason,
    /// Number of rounds that were completed. A round whose model request
    /// failed is not counted.
    pub steps: usize,
    /// The full conversation of this loop.
    pub log: MessageLog,
    /// One summary line per round.
    pub outputs: Vec<String>,
}

impl RunResult {
    /// Joins the per-round outputs into a human readable summary.
    #[inline]
    pub fn summary(&self) -> String {
        self.outputs.join("\n")
    }

    /// Returns `true` if the task was completed by a terminal command.
    #[inline]
    pub fn is_completed(&self) -> bool {
        matches!(self.reason, TerminationReason::TerminalCommand { .. })
    }
}

/// Returned when a run is requested in a state other than idle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NotIdleError(pub AgentState);

impl Display for NotIdleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot start a run while the agent is {}", self.0)
    }
}

impl StdError for NotIdleError {}

/// Requests a running loop to stop at the next round boundary.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Requests the stop. The current round is not interrupted.
    #[inline]
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns `true` if a stop was requested.
    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Drives one task through repeated think/act rounds.
///
/// Each round asks the model for its next move given the whole message
/// log, then executes the proposed commands in order and records their
/// observations. The loop ends when a terminal command succeeds, the model
/// proposes nothing, the budget is spent, the model fails, or a stop is
/// requested.
///
/// Built by [`AgentBuilder::build_loop`](crate::AgentBuilder::build_loop).
pub struct AgentLoop {
    config: Arc<AgentConfig>,
    model_client: ModelClient,
    registry: Arc<ToolRegistry>,
    context_provider: Option<Arc<dyn ContextProvider>>,
    on_transcript: Option<TranscriptFn>,
    log: MessageLog,
    state: AgentState,
    step: usize,
    pending: Vec<Command>,
    finish_requested: Option<String>,
    stuck: bool,
    stop: StopHandle,
}

impl AgentLoop {
    pub(crate) fn new(
        config: Arc<AgentConfig>,
        model_client: ModelClient,
        registry: Arc<ToolRegistry>,
        context_provider: Option<Arc<dyn ContextProvider>>,
        on_transcript: Option<TranscriptFn>,
    ) -> Self {
        Self {
            config,
            model_client,
            registry,
            context_provider,
            on_transcript,
            log: MessageLog::new(),
            state: AgentState::Idle,
            step: 0,
            pending: vec![],
            finish_requested: None,
            stuck: false,
            stop: StopHandle::default(),
        }
    }

    /// Returns the current state.
    #[inline]
    pub fn state(&self) -> AgentState {
        self.state
    }

    /// Returns the number of rounds completed so far.
    #[inline]
    pub fn steps(&self) -> usize {
        self.step
    }

    /// Returns the message log.
    #[inline]
    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    /// Returns the commands extracted by the last `think` and not yet acted
    /// upon.
    #[inline]
    pub fn pending_commands(&self) -> &[Command] {
        &self.pending
    }

    /// Returns the configuration.
    #[inline]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Returns a handle that can stop this loop from another task.
    ///
    /// A stop requested before the run starts ends it before the first
    /// round.
    #[inline]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Runs one reasoning step.
    ///
    /// Returns whether the model proposed any command. The assistant reply
    /// is appended to the log either way. If the model fails after retries,
    /// the state becomes [`AgentState::Error`] and the error is returned;
    /// nothing is appended in that case.
    pub async fn think(&mut self) -> Result<bool, Box<dyn ModelProviderError>> {
        let stuck = std::mem::take(&mut self.stuck);
        let request = self.build_request(stuck).await;
        let reply = match self.model_client.send_request(request).await {
            Ok(reply) => reply,
            Err(err) => {
                error!("model request failed: {err}");
                self.state = AgentState::Error;
                return Err(err);
            }
        };

        if reply.finish_reason == ModelFinishReason::Length {
            warn!("{} reply was cut off by the token limit", self.config.name);
        }
        let content = reply.content.filter(|content| !content.is_empty());
        let commands = extract_commands(reply.tool_calls, self.step + 1);
        if let Some(content) = &content {
            info!("{} thinks: {content}", self.config.name);
            self.emit_transcript(content, TranscriptSource::Assistant);
        }
        debug!("{} selected {} command(s)", self.config.name, commands.len());

        self.log.append(ModelMessage::Assistant(AssistantMessage {
            content,
            tool_calls: commands.iter().map(Command::to_request).collect(),
        }));
        if self.is_stuck() {
            warn!("{} detected duplicate responses", self.config.name);
            self.stuck = true;
        }

        self.pending = commands;
        Ok(!self.pending.is_empty())
    }

    /// Executes the commands proposed by the last `think`, strictly in
    /// order, and returns their observations joined by blank lines.
    ///
    /// Every command gets exactly one tool message in the log, even when it
    /// fails. A terminal command finishes the run once the whole batch has
    /// been executed. A terminal command that fails, or that is not
    /// registered, does not finish anything; the model sees the error and
    /// the run goes on.
    pub async fn act(&mut self) -> String {
        let commands = std::mem::take(&mut self.pending);
        let registry = Arc::clone(&self.registry);
        let dispatcher = Dispatcher::new(&registry);
        let mut observations = Vec::with_capacity(commands.len());

        for command in &commands {
            let observation = dispatcher.dispatch(command).await;
            info!(
                "command `{}` observed {} chars{}",
                command.name(),
                observation.content().len(),
                if observation.is_error() { " (error)" } else { "" }
            );
            self.emit_transcript(observation.content(), TranscriptSource::Tool);
            self.log.append(ModelMessage::Tool(ToolCallResult {
                id: command.id().to_owned(),
                name: command.name().to_owned(),
                content: observation.content().to_owned(),
            }));

            if !observation.is_error()
                && self.config.completion.is_terminal(command)
                && self.finish_requested.is_none()
            {
                info!("terminal command `{}` executed", command.name());
                self.finish_requested = Some(command.name().to_owned());
            }
            observations.push(observation.into_content());
        }

        if self.finish_requested.is_some() {
            self.state = AgentState::Finished;
        }
        observations.join("\n\n")
    }

    /// Runs `task` until the loop terminates.
    ///
    /// A non-empty task is appended to the log as a user message. The run
    /// fails only if the loop is not idle; every other outcome is described
    /// by the returned [`RunResult`].
    pub async fn run(&mut self, task: &str) -> Result<RunResult, NotIdleError> {
        if self.state != AgentState::Idle {
            return Err(NotIdleError(self.state));
        }
        let span = info_span!("agent run", agent = %self.config.name);
        Ok(self.run_inner(task).instrument(span).await)
    }

    async fn run_inner(&mut self, task: &str) -> RunResult {
        if !task.is_empty() {
            self.log.append(ModelMessage::user(task));
            self.emit_transcript(task, TranscriptSource::User);
        }
        self.state = AgentState::Running;
        self.finish_requested = None;

        let max_steps = self.config.max_steps;
        let mut outputs = vec![];
        let reason = loop {
            if self.stop.is_stopped() {
                info!("stop requested, ending the run");
                self.state = AgentState::Finished;
                break TerminationReason::Stopped;
            }
            if self.step >= max_steps {
                outputs.push(format!("Reached maximum steps limit ({max_steps})"));
                self.state = AgentState::Idle;
                break TerminationReason::BudgetExhausted;
            }

            let round = self.step + 1;
            info!("executing step {round}/{max_steps}");

            let thought =
                self.think().instrument(debug_span!("think", round)).await;
            if thought.is_ok() {
                self.step = round;
            }
            match thought {
                Ok(true) => {}
                Ok(false) => {
                    outputs.push("Thinking complete - no action needed".to_owned());
                    self.state = AgentState::Idle;
                    break TerminationReason::NoCommands;
                }
                Err(err) => {
                    outputs.push(format!("Model error: {err}"));
                    break TerminationReason::OracleError {
                        kind: err.kind(),
                        message: err.to_string(),
                    };
                }
            }

            let output = self.act().instrument(debug_span!("act", round)).await;
            outputs.push(format!("Step {round}: {output}"));

            if let Some(name) = &self.finish_requested {
                break TerminationReason::TerminalCommand { name: name.clone() };
            }
        };

        info!("run ended after {} step(s): {reason}", self.step);
        RunResult {
            state: self.state,
            reason,
            steps: self.step,
            log: self.log.clone(),
            outputs,
        }
    }

    async fn build_request(&self, stuck: bool) -> ModelRequest {
        let mut messages = Vec::with_capacity(self.log.len() + 2);
        if let Some(system_prompt) = &self.config.system_prompt {
            messages.push(ModelMessage::system(system_prompt.as_str()));
        }
        messages.extend(self.log.snapshot());
        if let Some(instruction) = self.instruction(stuck).await {
            messages.push(ModelMessage::user(instruction));
        }

        ModelRequest {
            messages,
            tools: self.registry.describe_all(),
            tool_choice: self.config.tool_choice,
        }
    }

    /// Renders this round's instruction. Never stored in the log.
    async fn instruction(&self, stuck: bool) -> Option<String> {
        let rendered = match &self.config.instruction_template {
            Some(template) => {
                let context = match &self.context_provider {
                    Some(provider) => provider.refresh().await,
                    None => Default::default(),
                };
                Some(context.render(template))
            }
            None => None,
        };
        if !stuck {
            return rendered;
        }
        Some(match rendered {
            Some(rendered) => format!("{STUCK_PROMPT}\n{rendered}"),
            None => STUCK_PROMPT.to_owned(),
        })
    }

    /// Checks whether the latest assistant content repeats earlier ones.
    fn is_stuck(&self) -> bool {
        let Some(threshold) = self.config.duplicate_threshold else {
            return false;
        };
        let mut replies = self.log.iter().rev().filter_map(|msg| match msg {
            ModelMessage::Assistant(msg) => Some(msg.content.as_deref()),
            _ => None,
        });
        let Some(Some(last)) = replies.next() else {
            return false;
        };
        replies.filter(|content| *content == Some(last)).count() >= threshold
    }

    #[inline]
    fn emit_transcript(&self, text: &str, source: TranscriptSource) {
        if let Some(on_transcript) = &self.on_transcript {
            on_transcript(text, source);
        }
    }
}
