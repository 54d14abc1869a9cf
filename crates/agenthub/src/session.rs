use std::env;
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::io;
use std::path::PathBuf;

use agenthub_core::{
    Agent, AgentBuilder, AgentStoppedError, RetryPolicy, RunResult,
    TranscriptSource,
};
use agenthub_model::ModelProvider;
use tokio::sync::oneshot;

use crate::presets::Preset;
use crate::tools::*;

/// The error returned when a session cannot be built.
#[derive(Debug)]
pub enum SessionError {
    /// A requested tool does not exist.
    UnknownTool(String),
    /// The working directory cannot be used.
    InvalidWorkdir(PathBuf, io::Error),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::UnknownTool(name) => {
                write!(f, "unknown tool `{name}`, expected one of: ")?;
                f.write_str(&TOOL_NAMES.join(", "))
            }
            SessionError::InvalidWorkdir(path, err) => {
                write!(f, "invalid working directory {}: {err}", path.display())
            }
        }
    }
}

impl StdError for SessionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            SessionError::UnknownTool(_) => None,
            SessionError::InvalidWorkdir(_, err) => Some(err),
        }
    }
}

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    agent_builder: AgentBuilder,
    preset: Preset,
    extra_tools: Vec<String>,
    workdir: Option<PathBuf>,
    max_steps: Option<usize>,
}

impl SessionBuilder {
    /// Creates a session builder with a specified model provider.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        let agent_builder = AgentBuilder::with_model_provider(provider);
        Self {
            agent_builder,
            preset: Preset::default(),
            extra_tools: vec![],
            workdir: None,
            max_steps: None,
        }
    }

    /// Sets the preset that decides prompts, tools and the terminal command.
    #[inline]
    pub fn with_preset(mut self, preset: Preset) -> Self {
        self.preset = preset;
        self
    }

    /// Adds tools on top of the preset's tools.
    #[inline]
    pub fn with_tools<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_tools.extend(names.into_iter().map(Into::into));
        self
    }

    /// Sets the initial working directory, default to the process's current
    /// directory.
    #[inline]
    pub fn with_workdir<P: Into<PathBuf>>(mut self, workdir: P) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    /// Overrides the preset's maximum number of rounds per task.
    #[inline]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    /// Sets how transient model failures are retried.
    #[inline]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.agent_builder = self.agent_builder.with_retry_policy(retry_policy);
        self
    }

    /// Attaches a callback to be invoked when the agent is idle.
    #[inline]
    pub fn on_idle(
        mut self,
        on_idle: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder = self.agent_builder.on_idle(on_idle);
        self
    }

    /// Attaches a callback to be invoked when a transcript is generated.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str, TranscriptSource) + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder = self.agent_builder.on_transcript(on_transcript);
        self
    }

    /// Builds a new session. Must be called within a tokio runtime.
    pub fn build(self) -> Result<Session, SessionError> {
        let workdir = match self.workdir {
            Some(workdir) => workdir,
            None => env::current_dir().map_err(|err| {
                SessionError::InvalidWorkdir(PathBuf::from("."), err)
            })?,
        };
        let workdir = workdir
            .canonicalize()
            .and_then(|path| {
                if path.is_dir() {
                    Ok(path)
                } else {
                    Err(io::Error::new(
                        io::ErrorKind::NotADirectory,
                        "not a directory",
                    ))
                }
            })
            .map_err(|err| SessionError::InvalidWorkdir(workdir, err))?;
        let shell = ShellSession::new(workdir);

        let preset = self.preset;
        let mut tool_names: Vec<String> = vec![];
        for name in preset
            .tool_names()
            .iter()
            .map(|name| name.to_string())
            .chain(self.extra_tools)
        {
            let name = name.trim().to_owned();
            if !name.is_empty() && !tool_names.contains(&name) {
                tool_names.push(name);
            }
        }

        let mut agent_builder = self
            .agent_builder
            .with_name(preset.name())
            .with_system_prompt(preset.system_prompt())
            .with_instruction_template(preset.instruction_template())
            .with_terminal_command(preset.terminal_command())
            .with_max_steps(self.max_steps.unwrap_or(preset.max_steps()))
            .with_context_provider(shell.clone());
        for name in &tool_names {
            agent_builder = with_builtin_tool(agent_builder, name, &shell)?;
        }
        debug!("building session `{preset}` with tools: {tool_names:?}");

        Ok(Session {
            agent: agent_builder.build(),
            preset,
            shell,
            tool_names,
        })
    }
}

fn with_builtin_tool(
    builder: AgentBuilder,
    name: &str,
    shell: &ShellSession,
) -> Result<AgentBuilder, SessionError> {
    let builder = match name {
        "shell" => builder.with_tool(ShellTool::new(shell.clone())),
        "read_file" => builder.with_tool(ReadFileTool::new(shell.clone())),
        "list_files" => builder.with_tool(ListFilesTool::new(shell.clone())),
        "edit_file" => builder.with_tool(EditFileTool::new(shell.clone())),
        "create_project_template" => {
            builder.with_tool(ProjectTemplateTool::new(shell.clone()))
        }
        "finish" => builder.with_tool(FinishTool::new()),
        "attempt_completion" => builder.with_tool(AttemptCompletionTool::new()),
        _ => return Err(SessionError::UnknownTool(name.to_owned())),
    };
    Ok(builder)
}

/// A chat session, like a window that displays messages and has a input box.
///
/// The session holds a fully configured agent that you can use directly, and
/// it is basically a wrapper around [`Agent`]. Every message starts a new
/// task, while the shell's working directory is kept across tasks.
pub struct Session {
    agent: Agent,
    preset: Preset,
    shell: ShellSession,
    tool_names: Vec<String>,
}

impl Session {
    /// Sends a message to the session.
    ///
    /// The returned receiver resolves with the result of the task.
    #[inline]
    pub fn send_message(&self, message: &str) -> oneshot::Receiver<RunResult> {
        self.agent.enqueue_task(message)
    }

    /// Sends a message and waits for the result of the task.
    #[inline]
    pub async fn run(
        &self,
        message: &str,
    ) -> Result<RunResult, AgentStoppedError> {
        self.agent.run(message).await
    }

    /// Stops the running task at its next round boundary.
    #[inline]
    pub fn stop(&self) {
        self.agent.stop();
    }

    /// Returns the current working directory of the session's shell.
    #[inline]
    pub fn current_dir(&self) -> PathBuf {
        self.shell.current_dir()
    }

    /// Returns the preset the session was built with.
    #[inline]
    pub fn preset(&self) -> Preset {
        self.preset
    }

    /// Returns the names of the tools available to the agent.
    #[inline]
    pub fn tool_names(&self) -> &[String] {
        &self.tool_names
    }
}
