use bytes_util::BitError;
use thiserror::Error;

/// Errors that can occur while synchronizing on an ADTS stream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdtsError {
    /// Only mono and stereo streams can be described downstream.
    #[error("unsupported channel configuration: {0}")]
    UnsupportedChannelConfig(u8),

    /// A header field holds a value the format does not allow.
    #[error("invalid header: {0}")]
    InvalidHeader(&'static str),

    /// A header was cut short.
    #[error("bit read error: {0}")]
    BitRead(#[from] BitError),
}
