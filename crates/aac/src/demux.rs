//! Buffered driver for [`FrameSynchronizer`].

use bytes::{Buf, Bytes, BytesMut};
use tracing::debug;

use crate::{AdtsConfig, AdtsHeader, AudioFormat, FrameSynchronizer, Result, Sample, SyncOutcome};

/// A frame cut out of the demuxer's buffer
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// The frame header
    pub header: AdtsHeader,
    /// Timing of the frame. `payload_offset` refers to the demuxer's
    /// internal buffer at the time the frame was found.
    pub sample: Sample,
    /// Raw AAC payload
    pub payload: Bytes,
    /// Set on the first frame of the stream only
    pub format: Option<AudioFormat>,
}

/// Accumulates segment bytes and yields complete ADTS frames.
#[derive(Debug, Default)]
pub struct AdtsDemuxer {
    sync: FrameSynchronizer,
    buffer: BytesMut,
    discarded: u64,
}

impl AdtsDemuxer {
    /// Create a demuxer with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a demuxer with the given synchronizer configuration
    pub fn with_config(config: AdtsConfig) -> Self {
        Self {
            sync: FrameSynchronizer::with_config(config),
            ..Self::default()
        }
    }

    /// Access to the synchronizer, e.g. to queue timestamps
    pub fn synchronizer_mut(&mut self) -> &mut FrameSynchronizer {
        &mut self.sync
    }

    /// The stream format, once known
    pub fn format(&self) -> Option<&AudioFormat> {
        self.sync.format()
    }

    /// Bytes held back waiting for more data
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes dropped while hunting for sync words
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Appends segment bytes
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Returns the next complete frame, `None` when more data is needed.
    pub fn next_frame(&mut self) -> Result<Option<AudioFrame>> {
        self.next(false)
    }

    /// Drains the buffer as the end of the stream, returning the frames
    /// still held. Bytes that do not form a frame are dropped.
    pub fn finish(&mut self) -> Result<Vec<AudioFrame>> {
        let mut frames = Vec::new();
        while let Some(frame) = self.next(true)? {
            frames.push(frame);
        }

        if !self.buffer.is_empty() {
            debug!(bytes = self.buffer.len(), "dropping trailing ADTS bytes");
            self.discarded += self.buffer.len() as u64;
            self.buffer.clear();
        }

        Ok(frames)
    }

    /// Drops buffered bytes and queued timestamps, keeping the format
    pub fn flush(&mut self) {
        self.buffer.clear();
        self.sync.clear_pts();
    }

    fn next(&mut self, end_of_stream: bool) -> Result<Option<AudioFrame>> {
        loop {
            let len = self.buffer.len();
            let outcome = if end_of_stream {
                self.sync.process_final(&self.buffer, 0, len)?
            } else {
                self.sync.process(&self.buffer, 0, len)?
            };

            match outcome {
                SyncOutcome::NeedMoreData => return Ok(None),
                SyncOutcome::Skip(count) => {
                    self.discarded += count as u64;
                    self.buffer.advance(count);
                }
                SyncOutcome::Frame(frame) => {
                    self.discarded += frame.skipped as u64;
                    let start = frame.sample.payload_offset;
                    let end = start + frame.sample.payload_length;
                    let payload = self.buffer.split_to(end).freeze().slice(start..);

                    return Ok(Some(AudioFrame {
                        header: frame.header,
                        sample: frame.sample,
                        payload,
                        format: frame.format,
                    }));
                }
            }
        }
    }
}
