//! ADTS fixed and variable header.
//!
//! ISO/IEC 13818-7 - 6.2 (Table 5, Table 6)
//!
//! ```text
//! syncword                12  0xFFF
//! id                       1  0 = MPEG-4, 1 = MPEG-2
//! layer                    2  always 0
//! protection_absent        1
//! profile                  2  object type - 1
//! sampling_frequency_index 4
//! private_bit              1
//! channel_configuration    3
//! original/copy, home      2
//! copyright id bit, start  2
//! frame_length            13  header included
//! buffer_fullness         11
//! raw_data_blocks          2  blocks in frame - 1
//! crc                     16  only when protection_absent == 0
//! ```

use bytes_util::{BitReader, BitWriter};

use crate::{AdtsError, AudioObjectType, Result, SampleFrequencyIndex};

/// Header length without CRC
pub const ADTS_HEADER_LENGTH: usize = 7;

/// Header length with CRC
pub const ADTS_HEADER_LENGTH_CRC: usize = 9;

/// PCM samples carried by one raw data block
pub const SAMPLES_PER_BLOCK: u64 = 1024;

/// 100 ns ticks per second
pub const TICKS_PER_SECOND: u64 = 10_000_000;

/// MPEG version signalled by the ADTS `id` bit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegVersion {
    /// id = 0
    Mpeg4,
    /// id = 1
    Mpeg2,
}

/// A parsed ADTS header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdtsHeader {
    /// MPEG version
    pub version: MpegVersion,
    /// Layer, always 0
    pub layer: u8,
    /// No CRC follows the header when set
    pub protection_absent: bool,
    /// Audio object type derived from the profile field
    pub object_type: AudioObjectType,
    /// Sampling frequency index
    pub sampling_frequency_index: SampleFrequencyIndex,
    /// Sampling frequency in Hz
    pub sampling_frequency: u32,
    /// Channel configuration
    pub channel_configuration: u8,
    /// Length of the whole frame, header included
    pub frame_length: usize,
    /// Decoder buffer fullness, 0x7FF for VBR
    pub buffer_fullness: u16,
    /// Number of raw data blocks minus one
    pub raw_data_blocks: u8,
    /// CRC check word
    pub crc: Option<u16>,
}

/// Returns true when `b0 b1` starts an ADTS header.
///
/// The top 12 bits must be set, but a 0xFFFF pair is rejected since it is
/// far more likely to be stuffing than a header.
#[inline]
pub fn is_sync(b0: u8, b1: u8) -> bool {
    b0 == 0xFF && (b1 & 0xF0) == 0xF0 && b1 != 0xFF
}

/// Returns the header length announced by the protection bit of `b1`.
#[inline]
pub fn header_length_for(b1: u8) -> usize {
    if b1 & 0x01 == 1 {
        ADTS_HEADER_LENGTH
    } else {
        ADTS_HEADER_LENGTH_CRC
    }
}

impl AdtsHeader {
    /// Parses the header starting at `offset`.
    ///
    /// Structurally impossible headers are reported as
    /// [`AdtsError::InvalidHeader`]; the caller decides whether that is a
    /// false sync.
    pub fn parse(data: &[u8], offset: usize) -> Result<Self> {
        let mut reader = BitReader::new(data, offset);

        reader.skip_bits(12)?;
        let version = if reader.read_flag()? {
            MpegVersion::Mpeg2
        } else {
            MpegVersion::Mpeg4
        };
        let layer = reader.read_unsigned_bits(2)? as u8;
        let protection_absent = reader.read_flag()?;
        let profile = reader.read_unsigned_bits(2)? as u8;
        let sampling_index = reader.read_unsigned_bits(4)? as u8;
        reader.skip_bits(1)?;
        let channel_configuration = reader.read_unsigned_bits(3)? as u8;
        reader.skip_bits(4)?;
        let frame_length = reader.read_unsigned_bits(13)? as usize;
        let buffer_fullness = reader.read_unsigned_bits(11)? as u16;
        let raw_data_blocks = reader.read_unsigned_bits(2)? as u8;
        let crc = if protection_absent {
            None
        } else {
            Some(reader.read_unsigned_bits(16)? as u16)
        };

        if layer != 0 {
            return Err(AdtsError::InvalidHeader("layer must be 0"));
        }

        let sampling_frequency_index = SampleFrequencyIndex::from_index(sampling_index)
            .ok_or(AdtsError::InvalidHeader("invalid sampling frequency index"))?;
        let sampling_frequency = sampling_frequency_index
            .to_freq()
            .ok_or(AdtsError::InvalidHeader("reserved sampling frequency index"))?;

        let header = Self {
            version,
            layer,
            protection_absent,
            object_type: AudioObjectType::from_adts_profile(profile),
            sampling_frequency_index,
            sampling_frequency,
            channel_configuration,
            frame_length,
            buffer_fullness,
            raw_data_blocks,
            crc,
        };

        if header.frame_length < header.header_length() {
            return Err(AdtsError::InvalidHeader("frame shorter than its header"));
        }

        Ok(header)
    }

    /// Describes a single-block, CRC-less MPEG-4 frame around a payload of
    /// `payload_length` bytes.
    pub fn for_payload(
        object_type: AudioObjectType,
        sampling_frequency: u32,
        channel_configuration: u8,
        payload_length: usize,
    ) -> Result<Self> {
        let sampling_frequency_index = SampleFrequencyIndex::from_freq(sampling_frequency);
        if sampling_frequency_index == SampleFrequencyIndex::FreqEscape {
            return Err(AdtsError::InvalidHeader("sampling frequency has no ADTS index"));
        }
        if !(1..=4).contains(&object_type.as_u16()) {
            return Err(AdtsError::InvalidHeader("object type has no ADTS profile"));
        }
        if channel_configuration > 7 {
            return Err(AdtsError::InvalidHeader("channel configuration exceeds 3 bits"));
        }

        let frame_length = payload_length + ADTS_HEADER_LENGTH;
        if frame_length > 0x1FFF {
            return Err(AdtsError::InvalidHeader("frame length exceeds 13 bits"));
        }

        Ok(Self {
            version: MpegVersion::Mpeg4,
            layer: 0,
            protection_absent: true,
            object_type,
            sampling_frequency_index,
            sampling_frequency,
            channel_configuration,
            frame_length,
            buffer_fullness: 0x7FF,
            raw_data_blocks: 0,
            crc: None,
        })
    }

    /// Serializes the header, CRC included when present.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = BitWriter::new();
        writer.write_bits(0xFFF, 12)?;
        writer.write_flag(self.version == MpegVersion::Mpeg2);
        writer.write_bits(self.layer as u64, 2)?;
        writer.write_flag(self.protection_absent);
        writer.write_bits(self.object_type.as_u16() as u64 - 1, 2)?;
        writer.write_bits(self.sampling_frequency_index as u64, 4)?;
        writer.write_flag(false);
        writer.write_bits(self.channel_configuration as u64, 3)?;
        writer.write_bits(0, 4)?;
        writer.write_bits(self.frame_length as u64, 13)?;
        writer.write_bits(self.buffer_fullness as u64, 11)?;
        writer.write_bits(self.raw_data_blocks as u64, 2)?;
        if let Some(crc) = self.crc {
            writer.write_bits(crc as u64, 16)?;
        }
        Ok(writer.finish())
    }

    /// 7 bytes, or 9 when a CRC follows the header.
    #[inline]
    pub const fn header_length(&self) -> usize {
        if self.protection_absent {
            ADTS_HEADER_LENGTH
        } else {
            ADTS_HEADER_LENGTH_CRC
        }
    }

    /// Bytes of raw AAC data after the header
    #[inline]
    pub const fn payload_length(&self) -> usize {
        self.frame_length - self.header_length()
    }

    /// Number of raw data blocks in this frame
    #[inline]
    pub const fn block_count(&self) -> u64 {
        self.raw_data_blocks as u64 + 1
    }

    /// Frame duration in 100 ns ticks.
    pub const fn duration_ticks(&self) -> u64 {
        self.block_count() * SAMPLES_PER_BLOCK * TICKS_PER_SECOND
            / self.sampling_frequency as u64
    }
}

/// Converts a 90 kHz MPEG-TS timestamp to 100 ns ticks
#[inline]
pub const fn ticks_from_90khz(pts: u64) -> u64 {
    pts * 1000 / 9
}
