use std::env;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agenthub_core::context::{ContextProvider, WorkingContext};
use agenthub_core::tool::{Error as ToolError, Tool, ToolResult};
use async_trait::async_trait;
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use tokio::process::Command;
use tokio::time::timeout;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const CWD_MARKER: &str = "__AGENTHUB_CWD__";

/// The shell state shared by tools of one session.
///
/// Commands run in the session's working directory, and a `cd` in one
/// command is visible to the next.
#[derive(Clone, Debug)]
pub struct ShellSession {
    cwd: Arc<Mutex<PathBuf>>,
}

impl ShellSession {
    /// Creates a session starting in `cwd`.
    #[inline]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd: Arc::new(Mutex::new(cwd)),
        }
    }

    /// Returns the current working directory.
    pub fn current_dir(&self) -> PathBuf {
        self.cwd.lock().unwrap_or_else(|err| err.into_inner()).clone()
    }

    fn set_current_dir(&self, cwd: PathBuf) {
        *self.cwd.lock().unwrap_or_else(|err| err.into_inner()) = cwd;
    }
}

#[async_trait]
impl ContextProvider for ShellSession {
    async fn refresh(&self) -> WorkingContext {
        WorkingContext::new()
            .with("current_dir", self.current_dir().display().to_string())
    }
}

#[derive(Deserialize, JsonSchema)]
pub struct ShellToolParameters {
    #[schemars(description = "The command line to run.")]
    command: String,
}

/// A tool for running shell commands.
pub struct ShellTool {
    session: ShellSession,
    timeout: Duration,
    parameter_schema: Value,
}

impl ShellTool {
    /// Creates a new shell tool bound to `session`.
    #[inline]
    pub fn new(session: ShellSession) -> Self {
        ShellTool {
            session,
            timeout: DEFAULT_TIMEOUT,
            parameter_schema: schema_for!(ShellToolParameters).to_value(),
        }
    }

    /// Sets how long a command may run before it is killed.
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Tool for ShellTool {
    type Input = ShellToolParameters;

    fn name(&self) -> &str {
        "shell"
    }

    fn description(&self) -> &str {
        r#"
Runs a command line in a persistent shell session, like using a terminal.
The working directory is kept between calls, so `cd` affects later commands.
Output from stdout and stderr is returned, along with the exit code when it is not zero.
Long running commands are killed after a timeout; avoid interactive programs."#
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: ShellToolParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let session = self.session.clone();
        let limit = self.timeout;
        async move {
            if input.command.trim().is_empty() {
                return Err(ToolError::invalid_input()
                    .with_reason("`command` must not be empty"));
            }
            match timeout(limit, run_command_line(&session, &input.command)).await
            {
                Ok(result) => result.map_err(|err| {
                    ToolError::execution_error()
                        .with_reason("failed to run the command")
                        .with_source(err)
                }),
                Err(_) => Err(ToolError::timeout().with_reason(format!(
                    "the command did not finish within {} seconds",
                    limit.as_secs()
                ))),
            }
        }
    }
}

#[inline]
fn inferred_shell() -> OsString {
    // The wrapper script below needs a POSIX shell.
    let posix = ["sh", "bash", "zsh", "dash", "ksh"];
    match env::var_os("SHELL") {
        Some(shell)
            if Path::new(&shell)
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| posix.contains(&name)) =>
        {
            shell
        }
        _ => OsString::from("/bin/sh"),
    }
}

async fn run_command_line(
    session: &ShellSession,
    cmdline: &str,
) -> Result<String, io::Error> {
    let script = format!(
        "{cmdline}\n__agenthub_status=$?\n\
         printf '\\n{CWD_MARKER}%s\\n' \"$(pwd)\"\n\
         exit $__agenthub_status"
    );
    let cwd = session.current_dir();
    debug!("running `{cmdline}` in {}", cwd.display());

    let output = Command::new(inferred_shell())
        .arg("-c")
        .arg(script)
        .current_dir(&cwd)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stdout = match stdout.rfind(CWD_MARKER) {
        Some(pos) => {
            let new_cwd = stdout[pos + CWD_MARKER.len()..].trim_end();
            if !new_cwd.is_empty() && Path::new(new_cwd).is_dir() {
                session.set_current_dir(PathBuf::from(new_cwd));
            }
            // Drop the newline printed in front of the marker.
            let body = &stdout[..pos];
            body.strip_suffix('\n').unwrap_or(body).to_owned()
        }
        // The command exited the shell before the marker was printed.
        None => stdout.into_owned(),
    };

    let mut result = String::new();
    if !stdout.is_empty() {
        result.push_str("==> STDOUT <==\n");
        result.push_str(&stdout);
    }
    if !output.stderr.is_empty() {
        if !result.is_empty() {
            result.push('\n');
        }
        result.push_str("==> STDERR <==\n");
        result.push_str(&String::from_utf8_lossy(&output.stderr));
    }
    match output.status.code() {
        Some(0) => {}
        Some(code) => {
            if !result.is_empty() {
                result.push('\n');
            }
            result.push_str(&format!("==> EXIT CODE <==\n{code}\n"));
        }
        None => {
            if !result.is_empty() {
                result.push('\n');
            }
            result.push_str("==> TERMINATED BY SIGNAL <==\n");
        }
    }
    Ok(result)
}
