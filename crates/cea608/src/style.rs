/// Foreground colors available to preamble and mid-row codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptionColor {
    /// White, also used for italics
    #[default]
    White,
    /// Green
    Green,
    /// Blue
    Blue,
    /// Cyan
    Cyan,
    /// Red
    Red,
    /// Yellow
    Yellow,
    /// Magenta
    Magenta,
}

impl CaptionColor {
    /// Maps the 3-bit color index shared by preamble and mid-row attributes.
    /// Index 7 selects italics and keeps the color white.
    pub(crate) fn from_attribute(index: u8) -> Self {
        match index & 0x07 {
            1 => Self::Green,
            2 => Self::Blue,
            3 => Self::Cyan,
            4 => Self::Red,
            5 => Self::Yellow,
            6 => Self::Magenta,
            _ => Self::White,
        }
    }
}

/// Attributes applied to a span of caption text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpanStyle {
    /// Foreground color
    pub color: CaptionColor,
    /// Italic text
    pub italic: bool,
    /// Underlined text
    pub underline: bool,
}

/// Text sharing one style. Line breaks are embedded as `'\n'`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextSpan {
    /// Style of every character in `text`
    pub style: SpanStyle,
    /// The characters
    pub text: String,
}

impl TextSpan {
    /// Creates a span
    pub fn new(style: SpanStyle, text: impl Into<String>) -> Self {
        Self {
            style,
            text: text.into(),
        }
    }
}

/// One caption page: the spans accumulated between two end-of-caption codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionRun {
    /// Spans in display order
    pub spans: Vec<TextSpan>,
}

impl Default for CaptionRun {
    fn default() -> Self {
        Self {
            spans: vec![TextSpan::default()],
        }
    }
}

impl CaptionRun {
    /// The page text without styling
    pub fn text(&self) -> String {
        self.spans.iter().map(|span| span.text.as_str()).collect()
    }

    /// True when no span holds any text
    pub fn is_blank(&self) -> bool {
        self.spans.iter().all(|span| span.text.is_empty())
    }

    /// Switches the style of the text that follows. An empty trailing span is
    /// restyled in place instead of leaving an empty span behind.
    pub(crate) fn set_style(&mut self, style: SpanStyle) {
        match self.spans.last_mut() {
            Some(last) if last.text.is_empty() => last.style = style,
            Some(last) if last.style == style => {}
            _ => self.spans.push(TextSpan::new(style, String::new())),
        }
    }

    pub(crate) fn style(&self) -> SpanStyle {
        self.spans.last().map(|span| span.style).unwrap_or_default()
    }

    pub(crate) fn push_str(&mut self, text: &str) {
        match self.spans.last_mut() {
            Some(last) => last.text.push_str(text),
            None => self.spans.push(TextSpan::new(SpanStyle::default(), text)),
        }
    }

    pub(crate) fn push_char(&mut self, c: char) {
        match self.spans.last_mut() {
            Some(last) => last.text.push(c),
            None => self
                .spans
                .push(TextSpan::new(SpanStyle::default(), c.to_string())),
        }
    }

    /// Removes the last character on the page. Returns false on an empty page.
    pub(crate) fn backspace(&mut self) -> bool {
        self.spans
            .iter_mut()
            .rev()
            .find(|span| !span.text.is_empty())
            .and_then(|span| span.text.pop())
            .is_some()
    }
}
