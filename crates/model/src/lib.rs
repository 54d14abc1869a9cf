//! The contract between an agent and the language model that drives it.
//!
//! An agent sends the conversation so far as a [`ModelRequest`] and gets a
//! [`ModelReply`] back: some text and the tool calls the model wants to
//! make. Providers implement [`ModelProvider`], so the agent loop can switch
//! between them without touching the core codebase.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod reply;
mod request;

pub use error::*;
pub use provider::*;
pub use reply::*;
pub use request::*;
