use std::fmt;
use std::time::Duration;

use aac::AdtsConfig;
use cea608::CaptionConfig;
use hls_crypto::DecryptConfig;

use crate::builder::IngestConfigBuilder;

/// Consumer side queue settings
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// How long a consumer blocks in one `wait_for_item` call before it
    /// re-checks its own state
    pub wait_timeout: Duration,

    /// Initial capacity of the command queue
    pub initial_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            wait_timeout: Duration::from_millis(100),
            initial_capacity: 64,
        }
    }
}

/// Configuration options for segment ingest
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Segment decryption
    pub decrypt: DecryptConfig,

    /// ADTS frame synchronization
    pub adts: AdtsConfig,

    /// Caption channel selection and rendering
    pub caption: CaptionConfig,

    /// Command hand-off
    pub queue: QueueConfig,

    /// Size of each read from the segment source
    pub read_chunk_size: usize,
}

/// Default size of each read from the segment source
pub const DEFAULT_READ_CHUNK_SIZE: usize = 16 * 1024;

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            decrypt: DecryptConfig::default(),
            adts: AdtsConfig::default(),
            caption: CaptionConfig::default(),
            queue: QueueConfig::default(),
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }
}

impl IngestConfig {
    /// Starts a builder from the defaults
    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder::new()
    }

    /// The read chunk size, falling back to the default when zero
    pub fn effective_read_chunk_size(&self) -> usize {
        if self.read_chunk_size == 0 {
            DEFAULT_READ_CHUNK_SIZE
        } else {
            self.read_chunk_size
        }
    }
}

impl fmt::Display for IngestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "blocks_per_fill={}, verify_next_sync={}, max_frame_length={}, caption={:?}/{:?}/{:?}, wait_timeout={}ms, read_chunk={}",
            self.decrypt.blocks_per_fill,
            self.adts.verify_next_sync,
            self.adts.max_frame_length,
            self.caption.field,
            self.caption.channel,
            self.caption.character_set,
            self.queue.wait_timeout.as_millis(),
            self.effective_read_chunk_size(),
        )
    }
}
