//! Segment driver.
//!
//! [`SegmentIngest`] runs one segment at a time on the calling thread:
//! optional AES-128 decryption, ADTS framing, and hand-off of every frame to
//! the shared [`CommandQueue`]. Caption markers that arrive alongside the
//! segments are decoded into pages and queued the same way.

use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;

use aac::{AdtsDemuxer, AudioFormat, AudioFrame, ticks_from_90khz};
use cea608::CaptionDecoder;
use hls_crypto::{AES_BLOCK_SIZE, Aes128CbcTransform, DecryptError, DecryptingReader, iv_from_sequence, parse_iv};
use pipeline_common::CommandQueue;
use tracing::{debug, info, warn};

use crate::{IngestConfig, IngestError, PipelineCommand, Result};

/// Key material of an `EXT-X-KEY` with `METHOD=AES-128`
#[derive(Clone)]
pub struct SegmentKey {
    key: [u8; AES_BLOCK_SIZE],
    iv: [u8; AES_BLOCK_SIZE],
}

impl SegmentKey {
    /// Key and IV as raw bytes
    pub fn new(key: [u8; AES_BLOCK_SIZE], iv: [u8; AES_BLOCK_SIZE]) -> Self {
        Self { key, iv }
    }

    /// Builds a key from fetched key bytes. Without an explicit `IV`
    /// attribute the media sequence number is the IV.
    pub fn from_playlist(key: &[u8], iv: Option<&str>, media_sequence: u64) -> Result<Self> {
        let key: [u8; AES_BLOCK_SIZE] = key
            .try_into()
            .map_err(|_| DecryptError::InvalidKeyLength(key.len()))?;
        let iv = match iv {
            Some(iv) => parse_iv(iv)?,
            None => iv_from_sequence(media_sequence),
        };
        Ok(Self { key, iv })
    }

    /// The IV the segment is decrypted with
    pub fn iv(&self) -> &[u8; AES_BLOCK_SIZE] {
        &self.iv
    }
}

impl fmt::Debug for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentKey")
            .field("key", &"<redacted>")
            .field("iv", &self.iv)
            .finish()
    }
}

/// Totals for one ingested segment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentStats {
    /// Plaintext bytes read
    pub bytes: u64,
    /// Frames queued
    pub frames: u64,
    /// Bytes dropped while hunting for sync words
    pub discarded: u64,
}

/// Drives segments and caption markers into a command queue
pub struct SegmentIngest {
    config: IngestConfig,
    demuxer: AdtsDemuxer,
    captions: CaptionDecoder,
    queue: Arc<CommandQueue<PipelineCommand>>,
    segments: u64,
}

impl SegmentIngest {
    /// Creates a driver with the default configuration and a fresh queue
    pub fn new() -> Self {
        Self::with_config(IngestConfig::default())
    }

    /// Creates a driver and a queue sized by `config`
    pub fn with_config(config: IngestConfig) -> Self {
        let queue = Arc::new(CommandQueue::with_capacity(config.queue.initial_capacity));
        Self::with_queue(config, queue)
    }

    /// Creates a driver feeding an existing queue
    pub fn with_queue(config: IngestConfig, queue: Arc<CommandQueue<PipelineCommand>>) -> Self {
        debug!(%config, "creating segment ingest");
        Self {
            demuxer: AdtsDemuxer::with_config(config.adts.clone()),
            captions: CaptionDecoder::with_config(config.caption.clone()),
            config,
            queue,
            segments: 0,
        }
    }

    /// The active configuration
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// The queue the consumer reads from
    pub fn queue(&self) -> &Arc<CommandQueue<PipelineCommand>> {
        &self.queue
    }

    /// Stream format, once the first frame has been seen
    pub fn format(&self) -> Option<&AudioFormat> {
        self.demuxer.format()
    }

    /// Segments ingested so far
    pub fn segments(&self) -> u64 {
        self.segments
    }

    /// Anchors the next frame to a 90 kHz container timestamp
    pub fn push_pts(&mut self, pts: u64) {
        self.demuxer.synchronizer_mut().push_pts(ticks_from_90khz(pts));
    }

    /// Reads a whole segment, decrypting it when `key` is given, and queues
    /// its frames. The first frame of the stream is preceded by a
    /// [`PipelineCommand::Format`].
    ///
    /// Errors are fatal for the stream; pass them to [`fail`](Self::fail)
    /// to notify the consumer.
    pub fn ingest_segment<R: Read>(
        &mut self,
        reader: R,
        key: Option<&SegmentKey>,
    ) -> Result<SegmentStats> {
        let stats = match key {
            Some(key) => {
                let transform = Aes128CbcTransform::new(&key.key, &key.iv)?;
                let reader = DecryptingReader::with_config(reader, transform, &self.config.decrypt);
                self.pump(reader)?
            }
            None => self.pump(reader)?,
        };

        self.segments += 1;
        debug!(
            segment = self.segments,
            bytes = stats.bytes,
            frames = stats.frames,
            discarded = stats.discarded,
            "segment ingested"
        );
        Ok(stats)
    }

    fn pump<R: Read>(&mut self, mut reader: R) -> Result<SegmentStats> {
        let mut stats = SegmentStats::default();
        let discarded_before = self.demuxer.discarded();
        let mut buf = vec![0u8; self.config.effective_read_chunk_size()];

        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, "segment read failed");
                    return Err(e.into());
                }
            };
            stats.bytes += n as u64;

            self.demuxer.push(&buf[..n]);
            while let Some(frame) = self.demuxer.next_frame()? {
                self.deliver(frame)?;
                stats.frames += 1;
            }
        }

        for frame in self.demuxer.finish()? {
            self.deliver(frame)?;
            stats.frames += 1;
        }

        stats.discarded = self.demuxer.discarded() - discarded_before;
        Ok(stats)
    }

    fn deliver(&mut self, frame: AudioFrame) -> Result<()> {
        if let Some(format) = &frame.format {
            info!(
                object_type = ?format.object_type,
                sampling_rate = format.sampling_rate,
                channels = format.channels,
                "audio format detected"
            );
            self.queue.enqueue(PipelineCommand::Format(format.clone()))?;
        }
        self.queue.enqueue(PipelineCommand::Sample(frame))?;
        Ok(())
    }

    /// Decodes a base64 caption marker and queues each finished page at
    /// `timestamp` (100 ns ticks). Returns the number of pages queued.
    ///
    /// A malformed marker is rejected without touching the caption state.
    pub fn ingest_caption_marker(&mut self, timestamp: u64, marker: &str) -> Result<usize> {
        let mut pages = Vec::new();
        if let Err(e) = self.captions.decode_base64(marker, &mut pages) {
            debug!(error = %e, "dropping caption marker");
            return Err(e.into());
        }

        let count = pages.len();
        for caption in pages {
            self.queue
                .enqueue(PipelineCommand::Caption { timestamp, caption })?;
        }
        Ok(count)
    }

    /// Restarts at `position` (100 ns ticks): pending frames, timestamps and
    /// the partial caption page are dropped, and the consumer sees the seek
    /// before anything else. The next frame is stamped with `position`
    /// unless a container timestamp is pushed first.
    pub fn seek(&mut self, position: u64) -> Result<()> {
        self.demuxer.flush();
        self.demuxer.synchronizer_mut().push_pts(position);
        self.captions.reset();

        let discarded = self.queue.clear_and_enqueue(PipelineCommand::Seek(position))?;
        info!(position, discarded, "seek");
        Ok(())
    }

    /// Reports a fatal stream error to the consumer, preempting everything
    /// still queued.
    pub fn fail(&self, error: IngestError) -> Result<()> {
        warn!(error = %error, "stream failed");
        self.queue
            .clear_and_enqueue(PipelineCommand::Error(Arc::new(error)))?;
        Ok(())
    }

    /// Queues [`PipelineCommand::Close`] behind everything already queued
    /// and closes the queue, so the consumer drains the stream first.
    pub fn end_of_stream(&self) {
        if self.queue.enqueue(PipelineCommand::Close).is_ok() {
            debug!(pending = self.queue.len(), "end of stream queued");
        }
        self.queue.close();
    }

    /// Preempts the queue with [`PipelineCommand::Close`] and closes it.
    /// Closing twice is a no-op.
    pub fn close(&self) {
        if self.queue.is_closed() {
            return;
        }
        if let Ok(discarded) = self.queue.clear_and_enqueue(PipelineCommand::Close) {
            debug!(discarded, "close queued");
        }
        self.queue.close();
    }
}

impl Default for SegmentIngest {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;
    use crate::command::CommandKind;
    use pipeline_common::Command;

    fn adts_stream(frames: usize) -> Vec<u8> {
        let mut data = Vec::new();
        for i in 0..frames {
            let header = aac::AdtsHeader::for_payload(
                aac::AudioObjectType::AacLowComplexity,
                44100,
                2,
                32,
            )
            .unwrap();
            data.extend(header.to_bytes().unwrap());
            data.extend(std::iter::repeat_n(i as u8, 32));
        }
        data
    }

    #[test]
    fn test_plain_segment() {
        let mut ingest = SegmentIngest::new();
        let stats = ingest.ingest_segment(&adts_stream(3)[..], None).unwrap();
        assert_eq!(stats.frames, 3);
        assert_eq!(stats.bytes, 3 * 39);
        assert_eq!(stats.discarded, 0);

        let kinds: Vec<_> = ingest.queue().drain().iter().map(|c| c.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                CommandKind::Format,
                CommandKind::Sample,
                CommandKind::Sample,
                CommandKind::Sample
            ]
        );
    }

    #[test]
    fn test_seek_preempts_and_anchors() {
        let mut ingest = SegmentIngest::new();
        ingest.ingest_segment(&adts_stream(2)[..], None).unwrap();
        ingest.seek(50_000_000).unwrap();
        assert_eq!(ingest.queue().len(), 1);
        assert!(matches!(
            ingest.queue().dequeue(),
            Some(PipelineCommand::Seek(50_000_000))
        ));

        ingest.ingest_segment(&adts_stream(1)[..], None).unwrap();
        match ingest.queue().dequeue() {
            Some(PipelineCommand::Sample(frame)) => {
                assert_eq!(frame.sample.timestamp, 50_000_000)
            }
            other => panic!("expected a sample, got {other:?}"),
        }
    }

    #[test]
    fn test_fail_and_close() {
        let ingest = SegmentIngest::new();
        ingest
            .fail(IngestError::Decrypt(DecryptError::Padding))
            .unwrap();
        assert_eq!(ingest.queue().len(), 1);

        ingest.close();
        ingest.close();
        assert!(ingest.queue().is_closed());
        assert!(matches!(
            ingest.queue().drain().as_slice(),
            [PipelineCommand::Close]
        ));
        assert!(matches!(
            ingest.fail(IngestError::Decrypt(DecryptError::Padding)),
            Err(IngestError::Queue(_))
        ));
    }

    #[test]
    fn test_key_from_playlist() {
        let key = SegmentKey::from_playlist(&[1u8; 16], None, 5).unwrap();
        assert_eq!(key.iv()[15], 5);
        assert!(format!("{key:?}").contains("redacted"));

        let key = SegmentKey::from_playlist(&[1u8; 16], Some("0x000102030405060708090A0B0C0D0E0F"), 5)
            .unwrap();
        assert_eq!(key.iv()[1], 1);

        assert!(matches!(
            SegmentKey::from_playlist(&[1u8; 8], None, 0),
            Err(IngestError::Decrypt(DecryptError::InvalidKeyLength(8)))
        ));
    }
}
