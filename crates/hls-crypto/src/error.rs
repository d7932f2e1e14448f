use thiserror::Error;

/// Errors raised while setting up or running segment decryption
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecryptError {
    /// The key is not 16 bytes long
    #[error("invalid key length: {0} bytes (expected 16)")]
    InvalidKeyLength(usize),

    /// The IV is not 16 bytes long
    #[error("invalid IV length: {0} bytes (expected 16)")]
    InvalidIvLength(usize),

    /// The playlist `IV` attribute is not a 128-bit hex number
    #[error("failed to parse IV '{iv}': {reason}")]
    InvalidIv {
        /// Attribute value as written in the playlist
        iv: String,
        /// What was wrong with it
        reason: String,
    },

    /// Interior data handed to the cipher is not a whole number of blocks
    #[error("interior ciphertext of {0} bytes is not block aligned")]
    MisalignedBlocks(usize),

    /// The segment length is not a multiple of the block size
    #[error("final ciphertext of {0} bytes is not block aligned")]
    MisalignedFinalBlock(usize),

    /// PKCS#7 padding did not verify, usually a wrong key or IV
    #[error("invalid padding in final block")]
    Padding,

    /// The cipher was used after its final block
    #[error("the final block has already been decrypted")]
    Finished,
}
