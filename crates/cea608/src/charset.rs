//! Character tables for the basic and special CEA-608 character sets.

/// How CEA-608 glyphs that are not plain ASCII are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharacterSet {
    /// Accented letters lose their accent, symbols get ASCII fallbacks
    #[default]
    Folded,
    /// The glyphs as defined by CEA-608
    Unicode,
}

impl CharacterSet {
    /// Placeholder for bytes that fail the parity check
    pub const fn unknown_glyph(self) -> char {
        match self {
            Self::Folded => '?',
            Self::Unicode => '\u{FFFD}',
        }
    }

    /// Maps a basic character (0x20-0x7F, parity stripped). Returns `None`
    /// for bytes outside the printable range.
    pub fn basic(self, byte: u8) -> Option<char> {
        let folded = self == Self::Folded;
        let c = match byte {
            0x2A => pick(folded, 'a', 'á'),
            0x5C => pick(folded, 'e', 'é'),
            0x5E => pick(folded, 'i', 'í'),
            0x5F => pick(folded, 'o', 'ó'),
            0x60 => pick(folded, 'u', 'ú'),
            0x7B => pick(folded, 'c', 'ç'),
            0x7C => pick(folded, '/', '÷'),
            0x7D => pick(folded, 'N', 'Ñ'),
            0x7E => pick(folded, 'n', 'ñ'),
            0x7F => pick(folded, '#', '█'),
            0x20..=0x7E => byte as char,
            _ => return None,
        };
        Some(c)
    }

    /// Maps the second byte of a special character pair (0x30-0x3F)
    pub fn special(self, byte: u8) -> Option<&'static str> {
        let index = byte.checked_sub(0x30).filter(|i| *i < 16)? as usize;
        Some(match self {
            Self::Folded => SPECIAL_FOLDED[index],
            Self::Unicode => SPECIAL_UNICODE[index],
        })
    }
}

#[inline]
const fn pick(folded: bool, ascii: char, glyph: char) -> char {
    if folded { ascii } else { glyph }
}

const SPECIAL_UNICODE: [&str; 16] = [
    "®", "°", "½", "¿", "™", "¢", "£", "♪", "à", " ", "è", "â", "ê", "î", "ô", "û",
];

const SPECIAL_FOLDED: [&str; 16] = [
    "(R)", "o", "1/2", "?", "TM", "c", "L", "#", "a", " ", "e", "a", "e", "i", "o", "u",
];
