use bytes_util::{BitReader, BitWriter};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::{AdtsError, Result};

/// A Partial Audio Specific Config
/// ISO/IEC 14496-3:2019(E) - 1.6
///
/// This struct does not represent the full AudioSpecificConfig, it only
/// represents the top few fields. It is also what gets handed downstream as
/// codec private data once an ADTS stream has been recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct PartialAudioSpecificConfig {
    /// Audio Object Type
    pub audio_object_type: AudioObjectType,
    /// Sampling Frequency
    pub sampling_frequency: u32,
    /// Channel Configuration
    pub channel_configuration: u8,
}

/// Audio Object Type
/// ISO/IEC 14496-3:2019(E) - 1.5.1.2.6
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum AudioObjectType {
    /// AAC main
    AacMain,
    /// AAC LC
    AacLowComplexity,
    /// AAC SSR
    AacScalableSampleRate,
    /// AAC LTP
    AacLongTermPrediction,
    /// Any other object type
    Unknown(u16),
}

impl AudioObjectType {
    /// Converts an AudioObjectType to a u16
    pub const fn as_u16(&self) -> u16 {
        match self {
            AudioObjectType::AacMain => 1,
            AudioObjectType::AacLowComplexity => 2,
            AudioObjectType::AacScalableSampleRate => 3,
            AudioObjectType::AacLongTermPrediction => 4,
            AudioObjectType::Unknown(value) => *value,
        }
    }

    /// Converts a u16 to an AudioObjectType
    pub const fn from_u16(value: u16) -> Self {
        match value {
            1 => AudioObjectType::AacMain,
            2 => AudioObjectType::AacLowComplexity,
            3 => AudioObjectType::AacScalableSampleRate,
            4 => AudioObjectType::AacLongTermPrediction,
            _ => AudioObjectType::Unknown(value),
        }
    }

    /// The object type signalled by the two bit ADTS profile field
    pub const fn from_adts_profile(profile: u8) -> Self {
        Self::from_u16(profile as u16 + 1)
    }
}

impl From<u16> for AudioObjectType {
    fn from(value: u16) -> Self {
        Self::from_u16(value)
    }
}

impl From<AudioObjectType> for u16 {
    fn from(value: AudioObjectType) -> Self {
        value.as_u16()
    }
}

/// Sampling Frequency Index
///
/// The purpose of the FrequencyIndex is to encode commonly used frequencies in
/// 4 bits to save space. These are the set of commonly used frequencies defined
/// in ISO/IEC 14496-3.
///
/// ISO/IEC 14496-3:2019(E) - 1.6.2.4 (Table 1.22)
#[derive(FromPrimitive, Debug, Clone, PartialEq, Copy, Eq, PartialOrd, Ord)]
#[repr(u8)]
#[must_use]
pub enum SampleFrequencyIndex {
    /// 96000 Hz
    Freq96000 = 0x0,
    /// 88200 Hz
    Freq88200 = 0x1,
    /// 64000 Hz
    Freq64000 = 0x2,
    /// 48000 Hz
    Freq48000 = 0x3,
    /// 44100 Hz
    Freq44100 = 0x4,
    /// 32000 Hz
    Freq32000 = 0x5,
    /// 24000 Hz
    Freq24000 = 0x6,
    /// 22050 Hz
    Freq22050 = 0x7,
    /// 16000 Hz
    Freq16000 = 0x8,
    /// 12000 Hz
    Freq12000 = 0x9,
    /// 11025 Hz
    Freq11025 = 0xA,
    /// 8000 Hz
    Freq8000 = 0xB,
    /// 7350 Hz
    Freq7350 = 0xC,
    /// Reserved
    FreqReserved = 0xD,
    /// Reserved
    FreqReserved2 = 0xE,
    /// Escape (Meaning the frequency is not in the table, and we need to read
    /// an additional 24 bits to get the frequency)
    FreqEscape = 0xF,
}

impl SampleFrequencyIndex {
    /// Decodes a four bit index
    pub fn from_index(index: u8) -> Option<Self> {
        Self::from_u8(index)
    }

    /// Convert the SampleFrequencyIndex to the actual frequency in Hz
    pub const fn to_freq(&self) -> Option<u32> {
        match self {
            SampleFrequencyIndex::Freq96000 => Some(96000),
            SampleFrequencyIndex::Freq88200 => Some(88200),
            SampleFrequencyIndex::Freq64000 => Some(64000),
            SampleFrequencyIndex::Freq48000 => Some(48000),
            SampleFrequencyIndex::Freq44100 => Some(44100),
            SampleFrequencyIndex::Freq32000 => Some(32000),
            SampleFrequencyIndex::Freq24000 => Some(24000),
            SampleFrequencyIndex::Freq22050 => Some(22050),
            SampleFrequencyIndex::Freq16000 => Some(16000),
            SampleFrequencyIndex::Freq12000 => Some(12000),
            SampleFrequencyIndex::Freq11025 => Some(11025),
            SampleFrequencyIndex::Freq8000 => Some(8000),
            SampleFrequencyIndex::Freq7350 => Some(7350),
            SampleFrequencyIndex::FreqReserved => None,
            SampleFrequencyIndex::FreqReserved2 => None,
            SampleFrequencyIndex::FreqEscape => None,
        }
    }

    /// Looks up the table entry for a frequency, `FreqEscape` when it has none
    pub fn from_freq(freq: u32) -> Self {
        (0x0..=0xC)
            .filter_map(Self::from_u8)
            .find(|idx| idx.to_freq() == Some(freq))
            .unwrap_or(SampleFrequencyIndex::FreqEscape)
    }
}

impl PartialAudioSpecificConfig {
    /// Parse the Audio Specific Config from given bytes
    /// The implementation is based on ISO/IEC 14496-3:2019(E) - 1.6.2.1 (Table
    /// 1.19) This does not parse the entire AAC Data, it only parses the
    /// top few fields.
    /// - Audio Object Type
    /// - Sampling Frequency
    /// - Channel Configuration
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut bitreader = BitReader::new(data, 0);

        // GetAudioObjectType() # ISO/IEC 14496-3:2019(E) - 1.6.2.1 (Table 1.20)
        let mut audio_object_type = bitreader.read_unsigned_bits(5)? as u16;
        if audio_object_type == 31 {
            audio_object_type = 32 + bitreader.read_unsigned_bits(6)? as u16;
        }

        let sampling_frequency_index =
            SampleFrequencyIndex::from_index(bitreader.read_unsigned_bits(4)? as u8)
                .ok_or(AdtsError::InvalidHeader("invalid sampling frequency index"))?;

        let sampling_frequency = match sampling_frequency_index {
            SampleFrequencyIndex::FreqEscape => bitreader.read_unsigned_bits(24)?,
            _ => sampling_frequency_index
                .to_freq()
                .ok_or(AdtsError::InvalidHeader("reserved sampling frequency index"))?,
        };

        let channel_configuration = bitreader.read_unsigned_bits(4)? as u8;

        Ok(Self {
            audio_object_type: audio_object_type.into(),
            sampling_frequency,
            channel_configuration,
        })
    }

    /// Serializes the config followed by an all-zero GASpecificConfig
    /// (1024 sample frames, no core coder, no extension).
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = BitWriter::new();

        let object_type = self.audio_object_type.as_u16() as u64;
        if object_type >= 32 {
            writer.write_bits(31, 5)?;
            writer.write_bits(object_type - 32, 6)?;
        } else {
            writer.write_bits(object_type, 5)?;
        }

        let index = SampleFrequencyIndex::from_freq(self.sampling_frequency);
        writer.write_bits(index as u64, 4)?;
        if index == SampleFrequencyIndex::FreqEscape {
            writer.write_bits(self.sampling_frequency as u64, 24)?;
        }

        writer.write_bits(self.channel_configuration as u64, 4)?;
        writer.write_bits(0, 3)?;

        Ok(writer.finish())
    }
}
