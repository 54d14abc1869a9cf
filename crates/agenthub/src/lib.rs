//! An out-of-the-box agent that assembles built-in tools, presets and model
//! providers.
//!
//! The crate includes a CLI tool for using in the terminal. And you can also
//! use it as a library to bring agent functionality into your own host apps.

#![deny(missing_docs)]

#[allow(unused_imports)]
#[macro_use]
extern crate tracing;

mod presets;
mod session;
pub mod tools;

pub use presets::{Preset, UnknownPresetError};
pub use session::{Session, SessionBuilder, SessionError};

/// Re-exports of [`agenthub_core`] crate.
pub mod core {
    pub use agenthub_core::*;
}
