//! # HLS Ingest
//!
//! Turns HLS audio segments into a stream of commands for a playback
//! consumer running on another thread.
//!
//! ```text
//! segment bytes -> DecryptingReader (AES-128) -> AdtsDemuxer -> CommandQueue
//! caption marker -> CaptionDecoder (CEA-608)  ---------------> CommandQueue
//! ```
//!
//! [`SegmentIngest`] owns every single-threaded stage; the
//! [`CommandQueue`](pipeline_common::CommandQueue) it shares with the
//! consumer is the only synchronized object. Seeks, fatal errors and close
//! requests preempt whatever is still queued.
//!
//! ## License
//!
//! MIT OR Apache-2.0
//!
//! ## Authors
//!
//! - hua0512
//!
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]

pub mod builder;
mod command;
mod config;
mod error;
mod logging;
mod segment;

pub use builder::IngestConfigBuilder;
pub use command::{CommandKind, PipelineCommand};
pub use config::{DEFAULT_READ_CHUNK_SIZE, IngestConfig, QueueConfig};
pub use error::IngestError;
pub use logging::init_logging;
pub use segment::{SegmentIngest, SegmentKey, SegmentStats};

/// Result type for ingest operations
pub type Result<T> = std::result::Result<T, IngestError>;
