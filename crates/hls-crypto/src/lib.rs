//! # HLS segment decryption
//!
//! Streaming decryption for `EXT-X-KEY:METHOD=AES-128` segments. The cipher
//! sits behind the [`BlockTransform`] trait so the reader does not care which
//! algorithm, key or IV the playlist selected.
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

mod error;
mod iv;
mod reader;
mod transform;

#[cfg(test)]
mod test_support;

pub use error::DecryptError;
pub use iv::{iv_from_sequence, parse_iv};
pub use reader::{DEFAULT_BLOCKS_PER_FILL, DecryptConfig, DecryptingReader};
pub use transform::{AES_BLOCK_SIZE, Aes128CbcTransform, BlockTransform};

/// Result type for decryption operations
pub type Result<T> = std::result::Result<T, DecryptError>;
