//! CEA-608 closed caption decoding.
//!
//! Captions arrive as ATSC `GA94` user data blobs, usually base64 encoded in
//! timed metadata markers. [`CaptionDecoder`] validates each blob, keeps the
//! byte pairs of one field and data channel, and runs them through the
//! CEA-608 state machine. Each end-of-caption code hands the accumulated
//! page to a [`CaptionSink`] as a [`CaptionRun`] of styled spans.
//!
//! ## License
//!
//! This project is licensed under the [MIT](./LICENSE.MIT) or [Apache-2.0](./LICENSE.Apache-2.0) license.
//! You can choose between one of them if you use this work.
//!
//! `SPDX-License-Identifier: MIT OR Apache-2.0`
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]

mod charset;
mod decoder;
mod error;
pub mod packet;
mod style;

pub use charset::CharacterSet;
pub use decoder::{CaptionConfig, CaptionDecoder, CaptionSink, DataChannel, DecoderStats};
pub use error::CaptionError;
pub use packet::{CaptionField, CcPair, parse_cc_data};
pub use style::{CaptionColor, CaptionRun, SpanStyle, TextSpan};

/// Result type for caption decoding
pub type Result<T> = std::result::Result<T, CaptionError>;
