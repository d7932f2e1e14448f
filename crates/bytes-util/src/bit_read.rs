use crate::BitError;

/// A cursor that reads most-significant-bit-first fields out of a byte slice.
///
/// Every read either consumes exactly the requested number of bits or fails
/// with [`BitError::InsufficientBits`] and leaves the cursor untouched.
#[derive(Debug, Clone)]
#[must_use]
pub struct BitReader<'a> {
    data: &'a [u8],
    byte_offset: usize,
    bit_offset: u8,
}

impl<'a> BitReader<'a> {
    /// Create a new BitReader positioned at `byte_offset` within `data`.
    ///
    /// An offset past the end of the slice is clamped to the end.
    pub const fn new(data: &'a [u8], byte_offset: usize) -> Self {
        let byte_offset = if byte_offset > data.len() {
            data.len()
        } else {
            byte_offset
        };

        Self {
            data,
            byte_offset,
            bit_offset: 0,
        }
    }

    /// Re-initializes the reader over a new buffer. This is the only way to
    /// move the cursor backwards.
    pub fn reset(&mut self, data: &'a [u8], byte_offset: usize) {
        *self = Self::new(data, byte_offset);
    }

    /// Reads up to 32 bits and returns them reinterpreted as a signed value.
    ///
    /// No sign extension is performed; a 32 bit read returns the raw bit
    /// pattern as an `i32`.
    pub fn read_bits(&mut self, count: u32) -> Result<i32, BitError> {
        self.read_checked(count, 32).map(|v| v as u32 as i32)
    }

    /// Reads up to 32 bits as an unsigned value.
    pub fn read_unsigned_bits(&mut self, count: u32) -> Result<u32, BitError> {
        self.read_checked(count, 32).map(|v| v as u32)
    }

    /// Reads up to 64 bits.
    pub fn read_bits_wide(&mut self, count: u32) -> Result<u64, BitError> {
        self.read_checked(count, 64)
    }

    /// Reads a single bit as a boolean.
    pub fn read_flag(&mut self) -> Result<bool, BitError> {
        self.read_checked(1, 1).map(|v| v == 1)
    }

    /// Skips `count` bits.
    pub fn skip_bits(&mut self, count: u64) -> Result<(), BitError> {
        self.ensure_remaining(count)?;

        if self.is_aligned() && count % 8 == 0 {
            self.byte_offset += (count / 8) as usize;
            return Ok(());
        }

        let mut left = count;
        while left > 0 {
            let chunk = left.min(64) as u32;
            self.take(chunk);
            left -= chunk as u64;
        }

        Ok(())
    }

    /// Returns the absolute cursor position in bits.
    #[inline]
    #[must_use]
    pub const fn bit_position(&self) -> u64 {
        self.byte_offset as u64 * 8 + self.bit_offset as u64
    }

    /// Returns the number of unread bits.
    #[inline]
    #[must_use]
    pub const fn remaining_bits(&self) -> u64 {
        self.data.len() as u64 * 8 - self.bit_position()
    }

    /// Returns the number of whole unread bytes.
    #[inline]
    #[must_use]
    pub const fn remaining_bytes(&self) -> usize {
        (self.remaining_bits() / 8) as usize
    }

    /// Returns the index of the byte holding the next unread bit.
    #[inline]
    #[must_use]
    pub const fn byte_offset(&self) -> usize {
        self.byte_offset
    }

    /// Checks if the reader is aligned to the byte boundary
    #[inline]
    #[must_use]
    pub const fn is_aligned(&self) -> bool {
        self.bit_offset == 0
    }

    fn read_checked(&mut self, count: u32, max: u32) -> Result<u64, BitError> {
        if count > max {
            return Err(BitError::WidthOutOfRange {
                requested: count,
                max,
            });
        }

        self.ensure_remaining(count as u64)?;
        Ok(self.take(count))
    }

    fn ensure_remaining(&self, count: u64) -> Result<(), BitError> {
        let remaining = self.remaining_bits();
        if count > remaining {
            return Err(BitError::InsufficientBits {
                requested: count,
                remaining,
            });
        }
        Ok(())
    }

    /// Consumes `count` (<= 64) bits. Callers must have checked the bounds.
    fn take(&mut self, count: u32) -> u64 {
        if count == 8 && self.is_aligned() {
            let byte = self.data[self.byte_offset];
            self.byte_offset += 1;
            return byte as u64;
        }

        let mut value = 0u64;
        let mut left = count;

        while left > 0 {
            let available = 8 - self.bit_offset as u32;
            let taken = left.min(available);
            let shift = available - taken;
            let mask = ((1u16 << taken) - 1) as u8;
            let bits = (self.data[self.byte_offset] >> shift) & mask;

            value = (value << taken) | bits as u64;
            left -= taken;

            let bit_offset = self.bit_offset as u32 + taken;
            if bit_offset == 8 {
                self.byte_offset += 1;
                self.bit_offset = 0;
            } else {
                self.bit_offset = bit_offset as u8;
            }
        }

        value
    }
}
