use std::collections::VecDeque;
use std::fmt::{self, Debug};

use tokio::select;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::builder::LoopFactory;
use crate::agent_loop::{RunResult, StopHandle};

pub struct PendingTask {
    pub task: String,
    pub reply_tx: oneshot::Sender<RunResult>,
}

impl Debug for PendingTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTask")
            .field("task", &self.task)
            .finish_non_exhaustive()
    }
}

pub struct HostStatus {
    pub pending: usize,
    pub running: bool,
}

/// Requests handled by the host task, in the order they were sent.
pub enum HostCommand {
    Enqueue(PendingTask),
    Stop,
    Status(oneshot::Sender<HostStatus>),
    TaskEnded {
        id: u64,
        result: Option<RunResult>,
        reply_tx: oneshot::Sender<RunResult>,
    },
}

impl Debug for HostCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostCommand::Enqueue(task) => {
                f.debug_tuple("Enqueue").field(task).finish()
            }
            HostCommand::Stop => f.write_str("Stop"),
            HostCommand::Status(_) => f.write_str("Status"),
            HostCommand::TaskEnded { id, result, .. } => f
                .debug_struct("TaskEnded")
                .field("id", id)
                .field("result", &result.as_ref().map(|result| &result.reason))
                .finish_non_exhaustive(),
        }
    }
}

struct RunningTask {
    id: u64,
    stop: StopHandle,
    join: JoinHandle<()>,
}

/// Reports the end of a task to the host when dropped, so that a task
/// which panics still frees the host for the next one.
struct TaskEndGuard {
    id: u64,
    result: Option<RunResult>,
    reply_tx: Option<oneshot::Sender<RunResult>>,
    cmd_tx: mpsc::WeakUnboundedSender<HostCommand>,
}

impl Drop for TaskEndGuard {
    fn drop(&mut self) {
        let Some(reply_tx) = self.reply_tx.take() else {
            return;
        };
        if std::thread::panicking() {
            error!("task {} panicked", self.id);
        }
        if let Some(cmd_tx) = self.cmd_tx.upgrade() {
            cmd_tx
                .send(HostCommand::TaskEnded {
                    id: self.id,
                    result: self.result.take(),
                    reply_tx,
                })
                .ok();
        }
    }
}

/// State owned by the host task.
pub struct TaskHost {
    factory: LoopFactory,
    pending_tasks: VecDeque<PendingTask>,
    running_task: Option<RunningTask>,
    next_task_id: u64,
    on_idle: Option<Box<dyn Fn() + Send + Sync>>,
    // Weak, so that the host stops once every `Agent` is dropped.
    cmd_tx: mpsc::WeakUnboundedSender<HostCommand>,
}

impl TaskHost {
    pub fn new(
        factory: LoopFactory,
        on_idle: Option<Box<dyn Fn() + Send + Sync>>,
        cmd_tx: mpsc::WeakUnboundedSender<HostCommand>,
    ) -> Self {
        Self {
            factory,
            pending_tasks: VecDeque::new(),
            running_task: None,
            next_task_id: 1,
            on_idle,
            cmd_tx,
        }
    }

    fn handle(&mut self, cmd: HostCommand) {
        match cmd {
            HostCommand::Enqueue(task) => self.enqueue_task(task),
            HostCommand::Stop => match &self.running_task {
                Some(running_task) => {
                    info!("stopping task {}", running_task.id);
                    running_task.stop.stop();
                }
                None => debug!("no running task to stop"),
            },
            HostCommand::Status(reply_tx) => {
                let status = HostStatus {
                    pending: self.pending_tasks.len(),
                    running: self.running_task.is_some(),
                };
                reply_tx.send(status).ok();
            }
            HostCommand::TaskEnded {
                id,
                result,
                reply_tx,
            } => self.task_ended(id, result, reply_tx),
        }
    }

    fn enqueue_task(&mut self, task: PendingTask) {
        self.pending_tasks.push_back(task);
        if self.running_task.is_some() {
            // Picked up when the running task ends.
            debug!(
                "a task is running, queued ({} pending)",
                self.pending_tasks.len()
            );
            return;
        }
        self.start_next_task();
    }

    fn start_next_task(&mut self) {
        debug_assert!(self.running_task.is_none());
        let Some(PendingTask { task, reply_tx }) = self.pending_tasks.pop_front()
        else {
            // Nothing to process, so we can invoke the idle callback.
            if let Some(on_idle) = &self.on_idle {
                on_idle();
            }
            return;
        };

        let id = self.next_task_id;
        self.next_task_id += 1;

        let mut agent_loop = self.factory.make_loop();
        let stop = agent_loop.stop_handle();
        let mut guard = TaskEndGuard {
            id,
            result: None,
            reply_tx: Some(reply_tx),
            cmd_tx: self.cmd_tx.clone(),
        };
        let join = tokio::spawn(async move {
            guard.result = match agent_loop.run(&task).await {
                Ok(result) => Some(result),
                Err(err) => {
                    error!("failed to start task {id}: {err}");
                    None
                }
            };
        });
        info!("started task {id}");
        self.running_task = Some(RunningTask { id, stop, join });
    }

    fn task_ended(
        &mut self,
        id: u64,
        result: Option<RunResult>,
        reply_tx: oneshot::Sender<RunResult>,
    ) {
        let running_task = self
            .running_task
            .take_if(|running_task| running_task.id == id);
        if running_task.is_none() {
            warn!("internal state is inconsistent, unknown task {id}");
            return;
        }
        info!("task {id} ended");

        // The task is no longer running when the caller observes the result.
        if let Some(result) = result {
            reply_tx.send(result).ok();
        }
        self.start_next_task();
    }
}

impl Drop for TaskHost {
    fn drop(&mut self) {
        if let Some(running_task) = self.running_task.take() {
            debug!("aborting task {}", running_task.id);
            running_task.join.abort();
        }
    }
}

/// Handles commands until the agent is shut down or every handle is gone.
pub async fn run_host(
    mut host: TaskHost,
    mut cmd_rx: mpsc::UnboundedReceiver<HostCommand>,
    mut kill_rx: watch::Receiver<bool>,
) {
    debug!("started");
    loop {
        let cmd = select! {
            biased;

            _ = kill_rx.changed() => break,
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    break;
                };
                cmd
            }
        };
        trace!("received command: {cmd:?}");
        host.handle(cmd);
    }
    debug!("stopped");
}
