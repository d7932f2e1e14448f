//! # Builder for IngestConfig
//!
//! ```
//! use std::time::Duration;
//! use hls_ingest::IngestConfig;
//! use cea608::{CharacterSet, DataChannel};
//!
//! let config = IngestConfig::builder()
//!     .with_blocks_per_fill(64)
//!     .with_caption_channel(DataChannel::Two)
//!     .with_character_set(CharacterSet::Unicode)
//!     .with_wait_timeout(Duration::from_millis(250))
//!     .build();
//!
//! assert_eq!(config.decrypt.blocks_per_fill, 64);
//! ```

use std::time::Duration;

use cea608::{CaptionField, CharacterSet, DataChannel};

use crate::IngestConfig;

/// Builder for creating IngestConfig instances with a fluent API
#[derive(Debug, Clone, Default)]
pub struct IngestConfigBuilder {
    config: IngestConfig,
}

impl IngestConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of cipher blocks decrypted per fill cycle
    pub fn with_blocks_per_fill(mut self, blocks: usize) -> Self {
        self.config.decrypt.blocks_per_fill = blocks.max(1);
        self
    }

    /// Require a second sync word after every ADTS frame
    pub fn with_verify_next_sync(mut self, verify: bool) -> Self {
        self.config.adts.verify_next_sync = verify;
        self
    }

    /// Treat ADTS frames longer than this as false syncs
    pub fn with_max_frame_length(mut self, length: usize) -> Self {
        self.config.adts.max_frame_length = length;
        self
    }

    /// Decode captions from this field
    pub fn with_caption_field(mut self, field: CaptionField) -> Self {
        self.config.caption.field = field;
        self
    }

    /// Decode captions from this data channel
    pub fn with_caption_channel(mut self, channel: DataChannel) -> Self {
        self.config.caption.channel = channel;
        self
    }

    /// Set how special caption characters are rendered
    pub fn with_character_set(mut self, character_set: CharacterSet) -> Self {
        self.config.caption.character_set = character_set;
        self
    }

    /// Drop printable caption pairs that repeat the previous pair
    pub fn with_printable_repeat_suppression(mut self, enabled: bool) -> Self {
        self.config.caption.suppress_printable_repeats = enabled;
        self
    }

    /// Set how long a consumer blocks per wait
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.config.queue.wait_timeout = timeout;
        self
    }

    /// Preallocate room for this many queued commands
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue.initial_capacity = capacity;
        self
    }

    /// Set the size of each read from the segment source
    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.config.read_chunk_size = size;
        self
    }

    /// Build the final IngestConfig
    pub fn build(self) -> IngestConfig {
        self.config
    }
}
