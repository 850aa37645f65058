//! Style records and the inline declaration parser.
//!
//! Only a handful of properties matter to the reader's layout engine, so a
//! [`CssStyle`] is four optional fields rather than a property map.

use crate::text::TextSlice;

/// Horizontal text alignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextAlign {
    Left,
    Right,
    Center,
    Justify,
}

/// Font slant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FontStyle {
    Normal,
    Italic,
}

/// Font weight, reduced to the two faces the renderer carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FontWeight {
    Normal,
    Bold,
}

/// How the styles of several class names combine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Precedence {
    /// The leftmost class that sets a field decides it.
    #[default]
    FirstWins,
    /// The rightmost class that sets a field decides it.
    LastWins,
}

/// Style record with independently optional fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CssStyle {
    /// `text-align`.
    pub text_align: Option<TextAlign>,
    /// `font-style`.
    pub font_style: Option<FontStyle>,
    /// `font-weight`.
    pub font_weight: Option<FontWeight>,
    /// `text-indent` in pixels.
    pub text_indent: Option<u16>,
}

impl CssStyle {
    /// Whether any field is set.
    pub fn any(&self) -> bool {
        self.text_align.is_some()
            || self.font_style.is_some()
            || self.font_weight.is_some()
            || self.text_indent.is_some()
    }

    /// Fill the fields still unset on `self` from `other`.
    pub fn merge(&mut self, other: &CssStyle) {
        self.text_align = self.text_align.or(other.text_align);
        self.font_style = self.font_style.or(other.font_style);
        self.font_weight = self.font_weight.or(other.font_weight);
        self.text_indent = self.text_indent.or(other.text_indent);
    }

    /// Replace fields of `self` with every field set on `other`.
    pub fn overlay(&mut self, other: &CssStyle) {
        self.text_align = other.text_align.or(self.text_align);
        self.font_style = other.font_style.or(self.font_style);
        self.font_weight = other.font_weight.or(self.font_weight);
        self.text_indent = other.text_indent.or(self.text_indent);
    }

    /// Combine `other` into `self` according to `precedence`, treating `self`
    /// as the earlier of the two.
    pub fn combine(&mut self, other: &CssStyle, precedence: Precedence) {
        match precedence {
            Precedence::FirstWins => self.merge(other),
            Precedence::LastWins => self.overlay(other),
        }
    }
}

/// Parse a `;`-separated declaration list, as found in a `style` attribute
/// or between the braces of a rule.
///
/// Unknown properties and unusable values are skipped; this never fails.
///
/// ```
/// use epub_stream_style::style::{parse_inline, FontWeight, TextAlign};
///
/// let style = parse_inline("text-align: center; font-weight: 700;");
/// assert_eq!(style.text_align, Some(TextAlign::Center));
/// assert_eq!(style.font_weight, Some(FontWeight::Bold));
/// assert_eq!(style.font_style, None);
/// ```
pub fn parse_inline<'s>(declarations: impl Into<TextSlice<'s>>) -> CssStyle {
    let mut style = CssStyle::default();

    for declaration in declarations.into().split(b';') {
        let Some((name, value)) = declaration.split_once(b':') else {
            continue;
        };
        let name = name.trim_whitespace();
        let value = value.trim_whitespace();

        if name.eq_ignore_ascii_case("text-align") {
            if let Some(align) = parse_text_align(value) {
                style.text_align = Some(align);
            }
        } else if name.eq_ignore_ascii_case("font-style") {
            style.font_style = Some(parse_font_style(value));
        } else if name.eq_ignore_ascii_case("font-weight") {
            style.font_weight = Some(parse_font_weight(value));
        } else if name.eq_ignore_ascii_case("text-indent") {
            if let Some(indent) = parse_indent_px(value) {
                style.text_indent = Some(indent);
            }
        } else {
            log::trace!("ignoring css property {}", name);
        }
    }

    style
}

fn parse_text_align(value: TextSlice<'_>) -> Option<TextAlign> {
    if value.eq_ignore_ascii_case("left") || value.eq_ignore_ascii_case("start") {
        Some(TextAlign::Left)
    } else if value.eq_ignore_ascii_case("right") || value.eq_ignore_ascii_case("end") {
        Some(TextAlign::Right)
    } else if value.eq_ignore_ascii_case("center") {
        Some(TextAlign::Center)
    } else if value.eq_ignore_ascii_case("justify") {
        Some(TextAlign::Justify)
    } else {
        None
    }
}

fn parse_font_style(value: TextSlice<'_>) -> FontStyle {
    if value.eq_ignore_ascii_case("italic") || value.eq_ignore_ascii_case("oblique") {
        FontStyle::Italic
    } else {
        FontStyle::Normal
    }
}

fn parse_font_weight(value: TextSlice<'_>) -> FontWeight {
    const BOLD: [&str; 5] = ["bold", "bolder", "700", "800", "900"];
    if BOLD.iter().any(|token| value.eq_ignore_ascii_case(token)) {
        FontWeight::Bold
    } else {
        FontWeight::Normal
    }
}

/// Resolve a length to whole pixels: `px` as is, `em` at 16px, `%` of 16px.
fn parse_indent_px(value: TextSlice<'_>) -> Option<u16> {
    let (number, factor) = if let Some(number) = value.strip_suffix_ignore_case(b"px") {
        (number, 1.0f32)
    } else if let Some(number) = value.strip_suffix_ignore_case(b"em") {
        (number, 16.0)
    } else if let Some(number) = value.strip_suffix_ignore_case(b"%") {
        (number, 0.16)
    } else {
        (value, 1.0)
    };

    let number = number.trim_whitespace().to_str()?;
    if number.is_empty() {
        return None;
    }
    let parsed: f32 = number.parse().ok()?;
    if !parsed.is_finite() {
        return None;
    }
    // Float-to-int `as` truncates toward zero and saturates at the bounds.
    Some((parsed * factor) as u16)
}
