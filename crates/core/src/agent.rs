mod builder;
mod host;
#[cfg(test)]
mod tests;

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::Instrument;

use crate::agent_loop::RunResult;
pub use builder::AgentBuilder;
use builder::LoopFactory;
use host::{HostCommand, HostStatus, PendingTask, TaskHost, run_host};

/// Returned when talking to an agent whose host has stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AgentStoppedError;

impl fmt::Display for AgentStoppedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("the agent has stopped")
    }
}

impl StdError for AgentStoppedError {}

/// A hosted agent that accepts tasks and runs them one at a time.
///
/// Requests sent to the agent are handled immediately, no matter whether a
/// task is running. A task enqueued while another one runs is queued and
/// started once the agent becomes idle. Every task runs on a fresh loop with
/// its own message log.
///
/// Clones share the same host. The host stops when [`Agent::shutdown`] is
/// called or when every clone is dropped.
#[derive(Clone)]
pub struct Agent {
    cmd_tx: mpsc::UnboundedSender<HostCommand>,
    kill_tx: Arc<watch::Sender<bool>>,
}

impl Agent {
    /// Enqueues a task for processing.
    ///
    /// The returned receiver resolves with the run result once the task has
    /// been run. It fails if the agent is shut down first.
    pub fn enqueue_task<S: Into<String>>(
        &self,
        task: S,
    ) -> oneshot::Receiver<RunResult> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let task = PendingTask {
            task: task.into(),
            reply_tx,
        };
        if self.cmd_tx.send(HostCommand::Enqueue(task)).is_err() {
            warn!("the agent has stopped, dropping the task");
        }
        reply_rx
    }

    /// Runs a task and waits for its result.
    pub async fn run<S: Into<String>>(
        &self,
        task: S,
    ) -> Result<RunResult, AgentStoppedError> {
        self.enqueue_task(task).await.map_err(|_| AgentStoppedError)
    }

    /// Stops the running task at its next round boundary. Queued tasks are
    /// not affected.
    #[inline]
    pub fn stop(&self) {
        self.cmd_tx.send(HostCommand::Stop).ok();
    }

    /// Returns the number of tasks waiting to be run.
    pub async fn pending_tasks(&self) -> Result<usize, AgentStoppedError> {
        Ok(self.status().await?.pending)
    }

    /// Returns `true` if a task is running.
    pub async fn is_running(&self) -> Result<bool, AgentStoppedError> {
        Ok(self.status().await?.running)
    }

    /// Stops the host. The running task is aborted and queued tasks are
    /// dropped, so their receivers fail.
    #[inline]
    pub fn shutdown(&self) {
        self.kill_tx.send(true).ok();
    }

    async fn status(&self) -> Result<HostStatus, AgentStoppedError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(HostCommand::Status(reply_tx))
            .map_err(|_| AgentStoppedError)?;
        reply_rx.await.map_err(|_| AgentStoppedError)
    }

    /// Spawns the host task. Must be called within a tokio runtime.
    fn spawn_with(
        factory: LoopFactory,
        on_idle: Option<Box<dyn Fn() + Send + Sync>>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (kill_tx, kill_rx) = watch::channel(false);
        let span = debug_span!("agent host", name = factory.name());
        let host = TaskHost::new(factory, on_idle, cmd_tx.downgrade());
        tokio::spawn(run_host(host, cmd_rx, kill_rx).instrument(span));
        Self {
            cmd_tx,
            kill_tx: Arc::new(kill_tx),
        }
    }
}
