use std::io;

use aac::AdtsError;
use bytes_util::BitError;
use cea608::CaptionError;
use hls_crypto::DecryptError;
use pipeline_common::QueueError;
use thiserror::Error;

/// Error type for segment ingest
#[derive(Error, Debug)]
pub enum IngestError {
    /// Framing failed
    #[error("ADTS error: {0}")]
    Adts(#[from] AdtsError),

    /// Decryption failed or the key was unusable
    #[error("Decryption error: {0}")]
    Decrypt(#[from] DecryptError),

    /// A caption marker was rejected
    #[error("Caption error: {0}")]
    Caption(#[from] CaptionError),

    /// A bit field ran past its buffer
    #[error("Bit read error: {0}")]
    BitRead(#[from] BitError),

    /// The command queue was closed
    #[error("Command queue error: {0}")]
    Queue(#[from] QueueError),

    /// Reading the segment source failed
    #[error("I/O error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for IngestError {
    /// Unwraps decryption failures surfaced through `io::Read`.
    fn from(error: io::Error) -> Self {
        match error
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<DecryptError>())
        {
            Some(inner) => IngestError::Decrypt(inner.clone()),
            None => IngestError::Io(error),
        }
    }
}

impl IngestError {
    /// True when the stream cannot continue and must be torn down
    pub fn is_fatal(&self) -> bool {
        !matches!(self, IngestError::Caption(_))
    }
}
