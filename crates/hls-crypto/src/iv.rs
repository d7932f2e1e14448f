use crate::{DecryptError, Result};

/// Parses an `IV=0x...` attribute value into 16 bytes.
pub fn parse_iv(iv_hex_str: &str) -> Result<[u8; 16]> {
    let iv_str = iv_hex_str
        .trim()
        .trim_start_matches("0x")
        .trim_start_matches("0X");
    let mut iv_bytes = [0u8; 16];
    hex::decode_to_slice(iv_str, &mut iv_bytes).map_err(|e| DecryptError::InvalidIv {
        iv: iv_hex_str.to_string(),
        reason: e.to_string(),
    })?;
    Ok(iv_bytes)
}

/// The IV an AES-128 segment uses when the key tag carries none: the media
/// sequence number as a big-endian 128 bit integer.
pub fn iv_from_sequence(media_sequence: u64) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[8..].copy_from_slice(&media_sequence.to_be_bytes());
    iv
}
