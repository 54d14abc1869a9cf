//! Core logic including the agent loop, tool dispatching, completion
//! detection, configurations, etc.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod agent_loop;
mod command;
mod completion;
mod config;
pub mod context;
mod message_log;
mod model_client;
pub mod tool;

pub use agent::{Agent, AgentBuilder, AgentStoppedError};
pub use agent_loop::{
    AgentLoop, AgentState, NotIdleError, RunResult, StopHandle,
    TerminationReason, TranscriptSource,
};
pub use command::{Command, extract_commands};
pub use completion::CompletionDetector;
pub use config::{AgentConfig, DEFAULT_DUPLICATE_THRESHOLD, DEFAULT_MAX_STEPS};
pub use message_log::MessageLog;
pub use model_client::RetryPolicy;
