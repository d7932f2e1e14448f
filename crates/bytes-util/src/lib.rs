//! Bit-level cursors over byte buffers.
//!
//! [`BitReader`] extracts arbitrary width big-endian bit fields from a byte
//! slice without ever leaving the cursor half advanced. [`BitWriter`] builds
//! such fields back into bytes.
//!
//! ## License
//!
//! This project is licensed under the [MIT](./LICENSE.MIT) or [Apache-2.0](./LICENSE.Apache-2.0) license.
//! You can choose between one of them if you use this work.
//!
//! `SPDX-License-Identifier: MIT OR Apache-2.0`
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(unsafe_code)]

mod bit_read;
mod bit_write;
mod error;

pub use bit_read::BitReader;
pub use bit_write::BitWriter;
pub use error::BitError;

/// Result type for bit cursor operations
pub type Result<T> = std::result::Result<T, BitError>;
