//! # Pipeline Common
//!
//! Coordination primitives shared by the stages of the ingest pipeline.
//!
//! ## Features
//!
//! - `CommandQueue<T>`: a FIFO of commands between producer and consumer
//!   threads, with preemptive insertion and removal by kind
//! - `Command`: the tagging trait queued items implement
//! - `init_test_tracing!` for tests
//!
//! ## License
//!
//! MIT License
//!
//! ## Authors
//!
//! - hua0512
//!
#![deny(missing_docs)]

use thiserror::Error;

pub mod queue;
/// Helpers for tests of pipeline crates
pub mod test_utils;

/// Re-export key traits and types
pub use queue::{Command, CommandQueue};

/// Errors returned by the command queue
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The queue no longer accepts commands
    #[error("command queue is closed")]
    Closed,
}
