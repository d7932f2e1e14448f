//! A crate for decoding AAC audio headers and synchronizing on ADTS streams.
//!
//! ## License
//!
//! This project is licensed under the [MIT](./LICENSE.MIT) or
//! [Apache-2.0](./LICENSE.Apache-2.0) license. You can choose between one of
//! them if you use this work.
//!
//! `SPDX-License-Identifier: MIT OR Apache-2.0`
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(unsafe_code)]

mod config;
mod demux;
mod error;
pub mod header;
mod sync;

#[cfg(test)]
mod test_support;

pub use config::{AudioObjectType, PartialAudioSpecificConfig, SampleFrequencyIndex};
pub use demux::{AdtsDemuxer, AudioFrame};
pub use error::AdtsError;
pub use header::{AdtsHeader, MpegVersion, TICKS_PER_SECOND, ticks_from_90khz};
pub use sync::{
    AdtsConfig, AudioFormat, FrameSynchronizer, MAX_FRAME_LENGTH, Sample, SyncOutcome,
    SyncedFrame,
};

/// Result type for AAC parsing operations
pub type Result<T> = std::result::Result<T, AdtsError>;
