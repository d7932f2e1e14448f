//! CEA-608 byte pair state machine.
//!
//! Pairs are classified in priority order: control codes (first byte
//! 0x10-0x1F, covering preamble address, mid-row, special character and
//! miscellaneous codes) and then printable pairs.

use std::mem;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, trace};

use crate::packet::{CaptionField, parse_cc_data};
use crate::style::{CaptionColor, CaptionRun, SpanStyle};
use crate::{CharacterSet, Result};

/// Base row of a preamble address code, indexed by the low nibble of the
/// first byte. Second bytes 0x60-0x7F address the row below.
const PAC_ROWS: [u8; 16] = [11, 1, 3, 12, 14, 5, 7, 9, 11, 1, 3, 12, 14, 5, 7, 9];

const LAST_ROW: u8 = 15;

/// Data channel within the selected field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataChannel {
    /// CC1 on field 1, CC3 on field 2
    #[default]
    One,
    /// CC2 on field 1, CC4 on field 2
    Two,
}

/// Caption decoder settings
#[derive(Debug, Clone, Default)]
pub struct CaptionConfig {
    /// Field whose pairs are decoded
    pub field: CaptionField,
    /// Data channel within that field
    pub channel: DataChannel,
    /// How characters without a plain text form are rendered
    pub character_set: CharacterSet,
    /// Also drop a printable pair that repeats the previous pair. Off by
    /// default since doubled letters are legitimate text.
    pub suppress_printable_repeats: bool,
}

/// Receives finished caption pages
pub trait CaptionSink {
    /// Called once per end-of-caption code
    fn on_caption(&mut self, caption: CaptionRun);
}

impl CaptionSink for Vec<CaptionRun> {
    fn on_caption(&mut self, caption: CaptionRun) {
        self.push(caption);
    }
}

/// Counters for the recoverable anomalies seen so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Pairs examined on the selected field
    pub pairs: u64,
    /// Bytes that failed the odd parity check
    pub parity_errors: u64,
    /// Bytes outside every code range
    pub rejected_bytes: u64,
    /// Redundant control copies dropped
    pub repeats_suppressed: u64,
    /// Pages handed to the sink
    pub captions: u64,
}

#[derive(Debug, Clone, Copy)]
enum Category {
    Printable = 0,
    Special = 1,
    Control = 2,
}

/// Tracks the redundant transmission of codes
#[derive(Debug, Default)]
struct RepeatGuard {
    last: Option<[u8; 2]>,
    expect: [bool; 3],
}

impl RepeatGuard {
    /// Returns true when `pair` is the redundant copy of the previous pair.
    fn is_repeat(&mut self, pair: [u8; 2], category: Category) -> bool {
        let index = category as usize;
        if self.last == Some(pair) && self.expect[index] {
            self.expect[index] = false;
            return true;
        }

        self.last = Some(pair);
        self.expect = [false; 3];
        self.expect[index] = true;
        false
    }

    fn forget(&mut self) {
        self.last = None;
        self.expect = [false; 3];
    }
}

#[inline]
fn has_odd_parity(byte: u8) -> bool {
    byte.count_ones() % 2 == 1
}

/// Decodes one CEA-608 data channel into caption pages.
#[derive(Debug, Default)]
pub struct CaptionDecoder {
    config: CaptionConfig,
    current: CaptionRun,
    /// Row of the last preamble code, 0 before the first one on a page
    row: u8,
    repeat: RepeatGuard,
    /// Set while the stream addresses the other data channel
    inactive: bool,
    stats: DecoderStats,
}

impl CaptionDecoder {
    /// Decoder for CC1 with folded characters
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder for the field and channel in `config`
    pub fn with_config(config: CaptionConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// The active settings
    pub fn config(&self) -> &CaptionConfig {
        &self.config
    }

    /// The page being built
    pub fn current(&self) -> &CaptionRun {
        &self.current
    }

    /// Counters since the decoder was created
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Drops the page being built and all pair tracking, e.g. after a seek.
    pub fn reset(&mut self) {
        self.current = CaptionRun::default();
        self.row = 0;
        self.repeat.forget();
        self.inactive = false;
    }

    /// Decodes a base64 encoded user data blob, as delivered by timed
    /// metadata markers. Returns the number of captions emitted.
    pub fn decode_base64<S: CaptionSink + ?Sized>(
        &mut self,
        marker: &str,
        sink: &mut S,
    ) -> Result<usize> {
        let data = STANDARD.decode(marker.trim())?;
        self.decode(&data, sink)
    }

    /// Decodes a `GA94` user data blob. Returns the number of captions
    /// emitted. A malformed blob is rejected as a whole before any pair is
    /// applied.
    pub fn decode<S: CaptionSink + ?Sized>(&mut self, data: &[u8], sink: &mut S) -> Result<usize> {
        let pairs = parse_cc_data(data)?;
        let before = self.stats.captions;

        let field = self.config.field;
        for pair in pairs.iter().filter(|p| p.field == field) {
            self.decode_pair(pair.data[0], pair.data[1], sink);
        }

        Ok((self.stats.captions - before) as usize)
    }

    /// Applies one byte pair of the selected field, parity bits included.
    pub fn decode_pair<S: CaptionSink + ?Sized>(&mut self, b1: u8, b2: u8, sink: &mut S) {
        self.stats.pairs += 1;

        let (c1, c2) = (b1 & 0x7F, b2 & 0x7F);
        if c1 == 0 && c2 == 0 {
            return;
        }

        if !(0x10..=0x1F).contains(&c1) {
            self.printable_pair([b1, b2]);
            return;
        }

        if !has_odd_parity(b1) {
            self.stats.parity_errors += 1;
            debug!(b1, b2, "control byte failed parity, keeping second byte as text");
            self.repeat.forget();
            if !self.inactive {
                self.printable_byte(b2);
            }
            return;
        }

        if !has_odd_parity(b2) {
            self.stats.parity_errors += 1;
            debug!(b1, b2, "dropping control pair with corrupt second byte");
            self.repeat.forget();
            return;
        }

        self.control([b1, b2], sink);
    }

    fn control<S: CaptionSink + ?Sized>(&mut self, pair: [u8; 2], sink: &mut S) {
        let (c1, c2) = (pair[0] & 0x7F, pair[1] & 0x7F);

        let channel = if c1 & 0x08 == 0 {
            DataChannel::One
        } else {
            DataChannel::Two
        };
        if channel != self.config.channel {
            if !self.inactive {
                trace!(?channel, "stream switched to the other data channel");
            }
            self.inactive = true;
            self.repeat.forget();
            return;
        }
        self.inactive = false;

        let code = c1 & 0x07;
        let category = if code == 0x01 && (0x30..=0x3F).contains(&c2) {
            Category::Special
        } else {
            Category::Control
        };
        if self.repeat.is_repeat(pair, category) {
            self.stats.repeats_suppressed += 1;
            trace!(c1, c2, "dropping redundant control pair");
            return;
        }

        match (code, c2) {
            (_, 0x40..=0x7F) => self.preamble(c1, c2),
            (0x01, 0x20..=0x2F) => self.mid_row(c2),
            (0x01, 0x30..=0x3F) => {
                if let Some(text) = self.config.character_set.special(c2) {
                    self.current.push_str(text);
                }
            }
            (0x02 | 0x03, 0x20..=0x3F) => trace!(c1, c2, "extended character ignored"),
            (0x04 | 0x05, 0x20..=0x2F) => self.misc(c2, sink),
            (0x07, 0x21..=0x23) => self.current.push_str(&" ".repeat((c2 - 0x20) as usize)),
            (0x00 | 0x07, 0x20..=0x2F) => trace!(c1, c2, "attribute code ignored"),
            _ => {
                self.stats.rejected_bytes += 2;
                debug!(c1, c2, "unknown control code");
            }
        }
    }

    fn preamble(&mut self, c1: u8, c2: u8) {
        let row = PAC_ROWS[(c1 & 0x0F) as usize] + u8::from(c2 & 0x20 != 0);
        let attribute = c2 & 0x1F;
        let underline = attribute & 0x01 != 0;

        let (style, indent) = if attribute < 0x10 {
            let index = attribute >> 1;
            let style = SpanStyle {
                color: CaptionColor::from_attribute(index),
                italic: index == 7,
                underline,
            };
            (style, 0)
        } else {
            let style = SpanStyle {
                underline,
                ..SpanStyle::default()
            };
            (style, ((attribute & 0x0E) >> 1) as usize * 4)
        };

        self.move_to_row(row);
        self.current.set_style(style);
        if indent > 0 {
            self.current.push_str(&" ".repeat(indent));
        }
    }

    fn move_to_row(&mut self, row: u8) {
        if !self.current.is_blank() {
            let breaks = match self.row {
                0 => 1,
                current if row > current => row - current,
                current if row == current => 0,
                _ => 1,
            };
            for _ in 0..breaks {
                self.current.push_char('\n');
            }
        }
        self.row = row;
    }

    /// Mid-row codes occupy one cell, rendered as a space.
    fn mid_row(&mut self, c2: u8) {
        let attribute = c2 & 0x0F;
        let index = attribute >> 1;
        let underline = attribute & 0x01 != 0;

        let style = if index == 7 {
            SpanStyle {
                color: self.current.style().color,
                italic: true,
                underline,
            }
        } else {
            SpanStyle {
                color: CaptionColor::from_attribute(index),
                italic: false,
                underline,
            }
        };

        self.current.push_char(' ');
        self.current.set_style(style);
    }

    fn misc<S: CaptionSink + ?Sized>(&mut self, c2: u8, sink: &mut S) {
        match c2 {
            0x21 => {
                self.current.backspace();
            }
            0x25..=0x27 => {
                for _ in 0..c2 - 0x23 {
                    self.carriage_return();
                }
            }
            0x2D => self.carriage_return(),
            0x2F => self.end_of_caption(sink),
            // RCL, AOF, AON, DER, FON, RDC, TR, RTD, EDM, ENM
            _ => trace!(code = c2, "inert control code"),
        }
    }

    fn carriage_return(&mut self) {
        self.current.push_char('\n');
        if self.row != 0 && self.row < LAST_ROW {
            self.row += 1;
        }
    }

    fn end_of_caption<S: CaptionSink + ?Sized>(&mut self, sink: &mut S) {
        let caption = mem::take(&mut self.current);
        self.row = 0;
        self.stats.captions += 1;
        debug!(spans = caption.spans.len(), "caption complete");
        sink.on_caption(caption);
    }

    fn printable_pair(&mut self, pair: [u8; 2]) {
        if self.inactive {
            return;
        }

        if self.config.suppress_printable_repeats {
            if self.repeat.is_repeat(pair, Category::Printable) {
                self.stats.repeats_suppressed += 1;
                return;
            }
        } else {
            self.repeat.forget();
        }

        self.printable_byte(pair[0]);
        self.printable_byte(pair[1]);
    }

    fn printable_byte(&mut self, byte: u8) {
        let code = byte & 0x7F;
        if code == 0 {
            return;
        }

        let charset = self.config.character_set;
        if !has_odd_parity(byte) {
            self.stats.parity_errors += 1;
            trace!(byte, "caption byte failed parity");
            self.current.push_char(charset.unknown_glyph());
            return;
        }

        match charset.basic(code) {
            Some(c) => self.current.push_char(c),
            None => {
                self.stats.rejected_bytes += 1;
                debug!(byte = code, "rejected caption byte");
            }
        }
    }
}
