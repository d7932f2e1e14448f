//! ATSC A/53 caption user data.
//!
//! ```text
//! user_identifier      32  "GA94"
//! user_data_type_code   8  0x03 = cc_data
//! process_em_data       1
//! process_cc_data       1
//! additional_data       1
//! cc_count              5
//! em_data               8
//! cc_count times:
//!   marker_bits         5
//!   cc_valid            1
//!   cc_type             2  0/1 = 608 field 1/2, 2/3 = 708
//!   cc_data_1           8
//!   cc_data_2           8
//! ```

use bytes_util::BitReader;
use tracing::trace;

use crate::{CaptionError, Result};

/// ATSC user data identifier
pub const GA94_SIGNATURE: [u8; 4] = *b"GA94";

/// `user_data_type_code` of caption data
pub const CC_DATA_TYPE_CODE: u8 = 0x03;

/// Identifier, type code, flags and reserved byte
const PREAMBLE_LENGTH: usize = 7;

/// The 608 field a byte pair was transmitted in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptionField {
    /// CC1 / CC2
    #[default]
    First,
    /// CC3 / CC4
    Second,
}

/// One `cc_data` triplet that carries valid CEA-608 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CcPair {
    /// Field the triplet was tagged with
    pub field: CaptionField,
    /// The two CEA-608 bytes, parity bits included
    pub data: [u8; 2],
}

/// Validates a user data blob and returns its valid CEA-608 pairs in order.
///
/// CEA-708 triplets and triplets without the valid bit are dropped. Bytes
/// after the declared triplets are ignored.
pub fn parse_cc_data(data: &[u8]) -> Result<Vec<CcPair>> {
    if data.len() < PREAMBLE_LENGTH {
        return Err(CaptionError::Truncated {
            expected: PREAMBLE_LENGTH,
            actual: data.len(),
        });
    }

    let signature = [data[0], data[1], data[2], data[3]];
    if signature != GA94_SIGNATURE {
        return Err(CaptionError::InvalidSignature(signature));
    }
    if data[4] != CC_DATA_TYPE_CODE {
        return Err(CaptionError::UnsupportedUserDataType(data[4]));
    }

    let mut reader = BitReader::new(data, 5);
    reader.skip_bits(3)?;
    let cc_count = reader.read_unsigned_bits(5)? as usize;
    reader.skip_bits(8)?;

    let expected = PREAMBLE_LENGTH + cc_count * 3;
    if data.len() < expected {
        return Err(CaptionError::Truncated {
            expected,
            actual: data.len(),
        });
    }

    let mut pairs = Vec::with_capacity(cc_count);
    for _ in 0..cc_count {
        reader.skip_bits(5)?;
        let cc_valid = reader.read_flag()?;
        let cc_type = reader.read_unsigned_bits(2)?;
        let data = [
            reader.read_unsigned_bits(8)? as u8,
            reader.read_unsigned_bits(8)? as u8,
        ];

        let field = match cc_type {
            0 => CaptionField::First,
            1 => CaptionField::Second,
            _ => continue,
        };
        if !cc_valid {
            trace!(?field, "skipping invalid cc_data triplet");
            continue;
        }
        pairs.push(CcPair { field, data });
    }

    Ok(pairs)
}
