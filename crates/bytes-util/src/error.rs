use thiserror::Error;

/// Errors produced by [`BitReader`](crate::BitReader) and
/// [`BitWriter`](crate::BitWriter).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitError {
    /// The request needs more bits than the buffer has left. The cursor is
    /// left where it was.
    #[error("insufficient bits: requested {requested}, remaining {remaining}")]
    InsufficientBits {
        /// Bits asked for
        requested: u64,
        /// Bits left in the buffer
        remaining: u64,
    },

    /// The bit width is wider than the accessor can return.
    #[error("bit width {requested} is out of range [0, {max}]")]
    WidthOutOfRange {
        /// Width asked for
        requested: u32,
        /// Widest width the accessor supports
        max: u32,
    },

    /// A value does not fit in the number of bits it was written with.
    #[error("value {value:#x} does not fit in {width} bits")]
    ValueTooWide {
        /// The rejected value
        value: u64,
        /// The width it was written with
        width: u32,
    },
}
