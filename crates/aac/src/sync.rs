//! Frame synchronization over a rolling byte window.
//!
//! The synchronizer is re-entered once per call with the bytes the caller
//! currently holds and answers with how far the caller may advance. It never
//! blocks and never buffers: retaining the unconsumed tail between calls is
//! the caller's job (see [`AdtsDemuxer`](crate::AdtsDemuxer) for a driver
//! that does it).

use std::collections::VecDeque;

use tracing::{debug, info, trace, warn};

use crate::header::{AdtsHeader, header_length_for, is_sync};
use crate::{AdtsError, AudioObjectType, PartialAudioSpecificConfig, Result};

/// Largest frame length the 13 bit field can express
pub const MAX_FRAME_LENGTH: usize = 0x1FFF;

/// Synchronizer tuning knobs
#[derive(Debug, Clone)]
pub struct AdtsConfig {
    /// Confirm every candidate by finding another sync word right after it
    pub verify_next_sync: bool,
    /// Candidates announcing a longer frame are treated as false syncs
    pub max_frame_length: usize,
}

impl Default for AdtsConfig {
    fn default() -> Self {
        Self {
            verify_next_sync: true,
            max_frame_length: MAX_FRAME_LENGTH,
        }
    }
}

/// Stream level description derived from the first frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFormat {
    /// Audio object type
    pub object_type: AudioObjectType,
    /// Sampling rate in Hz
    pub sampling_rate: u32,
    /// 1 or 2
    pub channels: u8,
    /// Serialized AudioSpecificConfig, the decoder's codec private data
    pub codec_private: Vec<u8>,
}

/// One elementary stream access unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Offset of the raw AAC payload within the buffer passed to `process`
    pub payload_offset: usize,
    /// Payload length in bytes
    pub payload_length: usize,
    /// Presentation time in 100 ns ticks
    pub timestamp: u64,
    /// Duration in 100 ns ticks
    pub duration: u64,
}

/// A recognised frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedFrame {
    /// Garbage bytes dropped in front of the sync word
    pub skipped: usize,
    /// The frame header
    pub header: AdtsHeader,
    /// The payload this frame carries
    pub sample: Sample,
    /// Set on the first frame of the stream only
    pub format: Option<AudioFormat>,
}

/// Result of one synchronizer step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing can be decided until more bytes arrive
    NeedMoreData,
    /// Drop this many bytes; they hold no usable frame start
    Skip(usize),
    /// A frame was recognised
    Frame(SyncedFrame),
}

impl SyncOutcome {
    /// Number of bytes the caller should advance before the next call.
    ///
    /// For a frame this is the header plus the garbage in front of it; the
    /// payload starts right after and is described by the sample.
    pub fn advance(&self) -> usize {
        match self {
            SyncOutcome::NeedMoreData => 0,
            SyncOutcome::Skip(count) => *count,
            SyncOutcome::Frame(frame) => frame.skipped + frame.header.header_length(),
        }
    }
}

/// Finds ADTS frames, assigns timestamps and reports the stream format
#[derive(Debug, Default)]
pub struct FrameSynchronizer {
    config: AdtsConfig,
    format: Option<AudioFormat>,
    pts_queue: VecDeque<u64>,
    next_timestamp: u64,
    frames: u64,
}

impl FrameSynchronizer {
    /// Create a synchronizer with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a synchronizer with the given configuration
    pub fn with_config(config: AdtsConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Queues a presentation timestamp (100 ns ticks) from the container.
    /// The next frame takes it as its timestamp and as the new anchor.
    pub fn push_pts(&mut self, timestamp: u64) {
        self.pts_queue.push_back(timestamp);
    }

    /// Drops queued timestamps, e.g. after a seek or discontinuity
    pub fn clear_pts(&mut self) {
        self.pts_queue.clear();
    }

    /// Forgets everything, including the cached format
    pub fn reset(&mut self) {
        *self = Self::with_config(self.config.clone());
    }

    /// The format announced by the first frame, if any
    pub fn format(&self) -> Option<&AudioFormat> {
        self.format.as_ref()
    }

    /// Frames recognised so far
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Examines `buffer[offset..offset + count]`.
    pub fn process(&mut self, buffer: &[u8], offset: usize, count: usize) -> Result<SyncOutcome> {
        self.step(buffer, offset, count, false)
    }

    /// Like [`process`](Self::process), but the window is known to be the
    /// end of the stream: a final frame is accepted without the sync word
    /// that would normally follow it.
    pub fn process_final(
        &mut self,
        buffer: &[u8],
        offset: usize,
        count: usize,
    ) -> Result<SyncOutcome> {
        self.step(buffer, offset, count, true)
    }

    fn step(
        &mut self,
        buffer: &[u8],
        offset: usize,
        count: usize,
        end_of_stream: bool,
    ) -> Result<SyncOutcome> {
        let start = offset.min(buffer.len());
        let end = offset.saturating_add(count).min(buffer.len());
        let window = &buffer[start..end];

        let Some(pos) = find_sync(window) else {
            if window.len() < 2 {
                return Ok(SyncOutcome::NeedMoreData);
            }
            // Keep the last byte, it may be the first half of a sync word.
            trace!(skipped = window.len() - 1, "no ADTS sync in window");
            return Ok(SyncOutcome::Skip(window.len() - 1));
        };

        let wait = || {
            if pos > 0 {
                SyncOutcome::Skip(pos)
            } else {
                SyncOutcome::NeedMoreData
            }
        };

        if window.len() - pos < header_length_for(window[pos + 1]) {
            return Ok(wait());
        }

        let header = match AdtsHeader::parse(window, pos) {
            Ok(header) => header,
            Err(AdtsError::InvalidHeader(reason)) => {
                debug!(offset = start + pos, reason, "false ADTS sync");
                return Ok(SyncOutcome::Skip(pos + 2));
            }
            Err(e) => return Err(e),
        };

        if header.frame_length > self.config.max_frame_length {
            debug!(
                offset = start + pos,
                frame_length = header.frame_length,
                "false ADTS sync: frame too long"
            );
            return Ok(SyncOutcome::Skip(pos + 2));
        }

        let frame_end = pos + header.frame_length;
        if end_of_stream && window.len() >= frame_end {
            // The last frame may be followed by padding.
            if window.len() > frame_end {
                trace!(trailing = window.len() - frame_end, "accepting final ADTS frame");
            }
        } else if self.config.verify_next_sync {
            if window.len() >= frame_end + 2 {
                if !is_sync(window[frame_end], window[frame_end + 1]) {
                    let tail = &window[frame_end..];
                    // Trailing padding after the last frame looks the same
                    // until the stream ends or another sync word shows up.
                    if find_sync(tail).is_none() && tail.len() <= self.config.max_frame_length {
                        trace!(offset = start + pos, trailing = tail.len(), "holding ADTS candidate");
                        return Ok(wait());
                    }
                    debug!(offset = start + pos, "false ADTS sync: no sync after frame");
                    return Ok(SyncOutcome::Skip(pos + 2));
                }
            } else {
                return Ok(wait());
            }
        } else if window.len() < frame_end {
            return Ok(wait());
        }

        let format = match self.format {
            Some(ref cached) => {
                if cached.sampling_rate != header.sampling_frequency
                    || cached.channels != header.channel_configuration
                {
                    debug!(
                        sampling_rate = header.sampling_frequency,
                        channels = header.channel_configuration,
                        "ADTS frame disagrees with the stream format"
                    );
                }
                None
            }
            None => {
                let format = describe(&header)?;
                info!(
                    object_type = ?format.object_type,
                    sampling_rate = format.sampling_rate,
                    channels = format.channels,
                    "ADTS stream format detected"
                );
                self.format = Some(format.clone());
                Some(format)
            }
        };

        let duration = header.duration_ticks();
        let timestamp = match self.pts_queue.pop_front() {
            Some(anchor) => anchor,
            None => self.next_timestamp,
        };
        self.next_timestamp = timestamp + duration;
        self.frames += 1;

        if pos > 0 {
            debug!(skipped = pos, "skipped bytes before ADTS frame");
        }

        Ok(SyncOutcome::Frame(SyncedFrame {
            skipped: pos,
            header,
            sample: Sample {
                payload_offset: start + pos + header.header_length(),
                payload_length: header.payload_length(),
                timestamp,
                duration,
            },
            format,
        }))
    }
}

fn find_sync(window: &[u8]) -> Option<usize> {
    window.windows(2).position(|pair| is_sync(pair[0], pair[1]))
}

fn describe(header: &AdtsHeader) -> Result<AudioFormat> {
    let channels = header.channel_configuration;
    if !(1..=2).contains(&channels) {
        warn!(channels, "unsupported ADTS channel configuration");
        return Err(AdtsError::UnsupportedChannelConfig(channels));
    }

    let config = PartialAudioSpecificConfig {
        audio_object_type: header.object_type,
        sampling_frequency: header.sampling_frequency,
        channel_configuration: channels,
    };

    Ok(AudioFormat {
        object_type: header.object_type,
        sampling_rate: header.sampling_frequency,
        channels,
        codec_private: config.to_bytes()?,
    })
}
