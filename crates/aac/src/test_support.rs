use crate::{AdtsHeader, AudioObjectType};

/// An AAC-LC ADTS frame whose payload never contains 0xFF.
pub(crate) fn adts_frame(sampling_frequency: u32, channels: u8, payload_length: usize) -> Vec<u8> {
    let header = AdtsHeader::for_payload(
        AudioObjectType::AacLowComplexity,
        sampling_frequency,
        channels,
        payload_length,
    )
    .unwrap();

    let mut frame = header.to_bytes().unwrap();
    frame.extend((0..payload_length).map(|i| (i % 200) as u8));
    frame
}
