use crate::BitError;

/// Builds a byte buffer out of most-significant-bit-first fields.
#[derive(Debug, Default, Clone)]
#[must_use]
pub struct BitWriter {
    bytes: Vec<u8>,
    bit_pos: u8,
}

impl BitWriter {
    /// Creates an empty writer.
    pub const fn new() -> Self {
        Self {
            bytes: Vec::new(),
            bit_pos: 0,
        }
    }

    /// Writes a single bit.
    pub fn write_flag(&mut self, bit: bool) {
        if self.bit_pos == 0 {
            self.bytes.push(0);
        }

        if bit {
            if let Some(last) = self.bytes.last_mut() {
                *last |= 1 << (7 - self.bit_pos);
            }
        }

        self.bit_pos = (self.bit_pos + 1) % 8;
    }

    /// Writes the low `count` bits of `value`, most significant first.
    pub fn write_bits(&mut self, value: u64, count: u32) -> Result<(), BitError> {
        if count > 64 {
            return Err(BitError::WidthOutOfRange {
                requested: count,
                max: 64,
            });
        }

        if count < 64 && value >> count != 0 {
            return Err(BitError::ValueTooWide {
                value,
                width: count,
            });
        }

        for i in (0..count).rev() {
            self.write_flag((value >> i) & 1 == 1);
        }

        Ok(())
    }

    /// Returns the number of bits written so far.
    #[must_use]
    pub fn bit_len(&self) -> u64 {
        match self.bit_pos {
            0 => self.bytes.len() as u64 * 8,
            pos => (self.bytes.len() as u64 - 1) * 8 + pos as u64,
        }
    }

    /// Pads the last byte with zero bits and returns the buffer.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}
