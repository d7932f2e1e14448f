use bytes_util::BitError;
use thiserror::Error;

/// Errors that reject a whole caption blob
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptionError {
    /// The blob does not start with `GA94`
    #[error("invalid user data signature: {0:02x?}")]
    InvalidSignature([u8; 4]),

    /// The blob carries something other than `cc_data`
    #[error("unsupported user data type code: 0x{0:02x}")]
    UnsupportedUserDataType(u8),

    /// The blob is shorter than its header or `cc_count` announce
    #[error("truncated caption data: expected at least {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes needed
        expected: usize,
        /// Bytes present
        actual: usize,
    },

    /// A flag field could not be read
    #[error("bit read error: {0}")]
    BitRead(#[from] BitError),

    /// The marker payload is not valid base64
    #[error("invalid base64 marker payload: {0}")]
    Base64(#[from] base64::DecodeError),
}
