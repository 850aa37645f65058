//! Class-selector stylesheet parsing into arena-backed rule arrays.
//!
//! Parsing never grows a collection. A sheet is scanned once to count the
//! rules it will produce, the rule array is allocated from the [`Arena`] at
//! its exact size, and a second scan fills it. Selectors are copied into the
//! arena as the array is filled, so the rules stay valid after the sheet's
//! own buffer is gone.
//!
//! ```
//! use epub_stream_style::arena::Arena;
//! use epub_stream_style::style::FontWeight;
//! use epub_stream_style::stylesheet::{get_combined_style, parse_sheet};
//!
//! let mut storage = [0u8; 512];
//! let mut arena = Arena::new(&mut storage);
//! let rules = {
//!     let css = String::from("/* calibre */ .c1 { font-weight: bold } h1 { color: red }");
//!     parse_sheet(css.as_str().into(), &mut arena)
//! };
//! assert_eq!(rules.len(), 1);
//! let style = get_combined_style(rules, "c0 c1");
//! assert_eq!(style.font_weight, Some(FontWeight::Bold));
//! ```

use crate::arena::Arena;
use crate::style::{parse_inline, CssStyle, Precedence};
use crate::text::TextSlice;

const RULES_CANARY: &[u8; 16] = b"____CssRules____";
const SELECTORS_CANARY: &[u8; 16] = b"__CssSelectors__";

/// Hard bounds on stylesheet parsing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StyleLimits {
    /// Maximum number of rules kept from one sheet.
    pub max_rules: usize,
    /// Sheets longer than this are skipped entirely.
    pub max_sheet_bytes: usize,
}

impl Default for StyleLimits {
    fn default() -> Self {
        Self {
            max_rules: 4096,
            max_sheet_bytes: 512 * 1024,
        }
    }
}

impl StyleLimits {
    /// Embedded-focused preset with smaller bounds.
    pub fn embedded() -> Self {
        Self {
            max_rules: 512,
            max_sheet_bytes: 64 * 1024,
        }
    }
}

/// Style engine options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StyleConfig {
    /// Hard parsing limits.
    pub limits: StyleLimits,
    /// How multiple class names on one element combine.
    pub precedence: Precedence,
    /// Element depth tracked by [`ChapterStyler`](crate::chapter::ChapterStyler).
    pub max_nesting: usize,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            limits: StyleLimits::default(),
            precedence: Precedence::default(),
            max_nesting: 32,
        }
    }
}

impl StyleConfig {
    /// Embedded-focused preset with smaller bounds.
    pub fn embedded() -> Self {
        Self {
            limits: StyleLimits::embedded(),
            precedence: Precedence::default(),
            max_nesting: 16,
        }
    }
}

/// A class selector and the style its block declares.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StyleRule<'a> {
    /// Class name without the leading `.`.
    pub selector: TextSlice<'a>,
    /// Declarations of the rule's block.
    pub style: CssStyle,
}

/// Parsed rules together with the precedence used to combine them.
#[derive(Clone, Copy, Debug, Default)]
pub struct Stylesheet<'a> {
    rules: &'a [StyleRule<'a>],
    precedence: Precedence,
}

impl<'a> Stylesheet<'a> {
    pub fn new(rules: &'a [StyleRule<'a>], precedence: Precedence) -> Self {
        Self { rules, precedence }
    }

    /// Parse `sheet` into `arena` under `config`.
    pub fn parse<'s>(sheet: TextSlice<'s>, arena: &mut Arena<'a>, config: &StyleConfig) -> Self
    where
        'a: 's,
    {
        Self::new(
            parse_sheet_with_limits(sheet, arena, &config.limits),
            config.precedence,
        )
    }

    pub fn rules(&self) -> &'a [StyleRule<'a>] {
        self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn precedence(&self) -> Precedence {
        self.precedence
    }

    /// Style of a single class name.
    pub fn style<'c>(&self, class_name: impl Into<TextSlice<'c>>) -> CssStyle {
        get_style(self.rules, class_name)
    }

    /// Combined style of a whitespace-separated class list.
    pub fn combined_style<'c>(&self, class_names: impl Into<TextSlice<'c>>) -> CssStyle {
        get_combined_style_with(self.rules, class_names, self.precedence)
    }
}

/// Remove `/* ... */` comments, copying into `arena` only when needed.
///
/// Returns `sheet` itself when it has no comments. Every segment kept around
/// a comment is trimmed on both sides. An unterminated comment drops the rest
/// of the sheet. If the arena cannot hold the filtered copy the result is
/// empty.
pub fn filter_comments<'s, 'a: 's>(sheet: TextSlice<'s>, arena: &mut Arena<'a>) -> TextSlice<'s> {
    if sheet.find_seq(b"/*").is_none() {
        return sheet;
    }

    let mut length = 0usize;
    for_each_retained(sheet, |piece| length += piece.len());
    if length == sheet.len() {
        return sheet;
    }
    if length == 0 {
        return TextSlice::EMPTY;
    }

    let Some(buf) = arena.alloc_bytes(length) else {
        log::warn!(
            "arena exhausted filtering stylesheet comments ({} bytes needed, {} remaining)",
            length,
            arena.remaining()
        );
        return TextSlice::EMPTY;
    };
    let mut cursor = 0usize;
    for_each_retained(sheet, |piece| {
        if let Some(dst) = buf.get_mut(cursor..cursor + piece.len()) {
            dst.copy_from_slice(piece);
        }
        cursor += piece.len();
    });
    let buf: &'a [u8] = buf;
    TextSlice::new(buf)
}

/// Write the comment-free form of `sheet` into `out`.
///
/// Returns the full filtered length, which may exceed `out.len()`; only the
/// bytes that fit are written.
pub fn filter_comments_into(sheet: TextSlice<'_>, out: &mut [u8]) -> usize {
    let mut cursor = 0usize;
    for_each_retained(sheet, |piece| {
        let fit = piece.len().min(out.len().saturating_sub(cursor));
        if fit > 0 {
            out[cursor..cursor + fit].copy_from_slice(&piece[..fit]);
        }
        cursor += piece.len();
    });
    cursor
}

/// Feed every retained piece of `sheet` to `emit`, in order.
///
/// Both passes of the filter go through here, so the measured length always
/// equals the copied length.
fn for_each_retained(sheet: TextSlice<'_>, mut emit: impl FnMut(&[u8])) {
    let mut last = None;
    for segment in Segments::new(sheet) {
        let Some(first) = segment.first() else {
            continue;
        };
        // Keep `/` + `*` from fusing into a new comment opener.
        if last == Some(b'/') && first == b'*' {
            emit(b" ");
        }
        emit(segment.as_bytes());
        last = segment.as_bytes().last().copied();
    }
}

/// Text between comments.
struct Segments<'s> {
    rest: Option<TextSlice<'s>>,
}

impl<'s> Segments<'s> {
    fn new(sheet: TextSlice<'s>) -> Self {
        Self { rest: Some(sheet) }
    }
}

impl<'s> Iterator for Segments<'s> {
    type Item = TextSlice<'s>;

    fn next(&mut self) -> Option<Self::Item> {
        let sheet = self.rest.take()?;
        if sheet.is_empty() {
            return None;
        }
        let Some(start) = sheet.find_seq(b"/*") else {
            return Some(sheet);
        };
        let after = sheet.skip(start + 2);
        match after.find_seq(b"*/") {
            Some(end) => self.rest = Some(after.skip(end + 2).trim_whitespace()),
            None => log::debug!("unterminated css comment; dropping {} bytes", after.len() + 2),
        }
        Some(sheet.head(start).trim_whitespace())
    }
}

/// Scanner over the class rules of a comment-free sheet.
///
/// Yields `(selector without '.', style)` for every class rule whose block
/// sets something. Blocks end at the first `}`; braces do not nest.
#[derive(Clone, Debug)]
pub struct RuleScanner<'s> {
    rest: TextSlice<'s>,
}

impl<'s> RuleScanner<'s> {
    pub fn new(sheet: TextSlice<'s>) -> Self {
        Self { rest: sheet }
    }

    fn stop(&mut self, reason: &str) -> Option<(TextSlice<'s>, CssStyle)> {
        log::debug!("{}; {} stylesheet bytes left unparsed", reason, self.rest.len());
        self.rest = TextSlice::EMPTY;
        None
    }
}

impl<'s> Iterator for RuleScanner<'s> {
    type Item = (TextSlice<'s>, CssStyle);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let sheet = self.rest;
            let pos = sheet.find_either(b'@', b'{')?;

            if sheet.as_bytes().get(pos) == Some(&b'@') {
                let semi = sheet.find_from(b';', pos);
                let brace = sheet.find_from(b'{', pos);
                match (semi, brace) {
                    (Some(semi), brace) if brace.is_none_or(|brace| semi < brace) => {
                        self.rest = sheet.skip(semi + 1);
                    }
                    (_, Some(brace)) => match sheet.find_from(b'}', brace) {
                        Some(end) => self.rest = sheet.skip(end + 1),
                        None => return self.stop("unterminated at-rule block"),
                    },
                    _ => return self.stop("unterminated at-rule"),
                }
                continue;
            }

            let selector = sheet.head(pos).trim_whitespace();
            let Some(end) = sheet.find_from(b'}', pos) else {
                return self.stop("unterminated rule block");
            };
            self.rest = sheet.skip(end + 1);

            if selector.first() != Some(b'.') {
                log::trace!("skipping non-class selector {}", selector);
                continue;
            }
            let style = parse_inline(sheet.sub(pos + 1..end).trim_whitespace());
            if !style.any() {
                log::trace!("skipping rule {} with no supported declarations", selector);
                continue;
            }
            return Some((selector.skip(1), style));
        }
    }
}

/// Number of rules [`fill_rules`] would produce for `sheet`.
pub fn count_rules(sheet: TextSlice<'_>) -> usize {
    RuleScanner::new(sheet).count()
}

/// Fill `out` with the rules of `sheet`, returning how many were written.
///
/// Selectors point into `sheet`; nothing is retained. Comments must already
/// be filtered out.
pub fn fill_rules<'s>(sheet: TextSlice<'s>, out: &mut [StyleRule<'s>]) -> usize {
    let mut written = 0;
    for (slot, (selector, style)) in out.iter_mut().zip(RuleScanner::new(sheet)) {
        *slot = StyleRule { selector, style };
        written += 1;
    }
    written
}

/// Parse `sheet` into `arena` with default limits.
pub fn parse_sheet<'s, 'a: 's>(sheet: TextSlice<'s>, arena: &mut Arena<'a>) -> &'a [StyleRule<'a>] {
    parse_sheet_with_limits(sheet, arena, &StyleLimits::default())
}

/// Parse `sheet` into `arena`.
///
/// Never fails: malformed input truncates the rule list and arena
/// exhaustion yields fewer (possibly zero) rules.
pub fn parse_sheet_with_limits<'s, 'a: 's>(
    sheet: TextSlice<'s>,
    arena: &mut Arena<'a>,
    limits: &StyleLimits,
) -> &'a [StyleRule<'a>] {
    if sheet.len() > limits.max_sheet_bytes {
        log::warn!(
            "Stylesheet exceeds max_sheet_bytes ({} > {}); skipping",
            sheet.len(),
            limits.max_sheet_bytes
        );
        return &[];
    }

    let sheet = filter_comments(sheet, arena);
    let mut count = count_rules(sheet);
    if count == 0 {
        return &[];
    }
    if count > limits.max_rules {
        log::warn!(
            "Stylesheet exceeds max_rules ({} > {}); truncating",
            count,
            limits.max_rules
        );
        count = limits.max_rules;
    }

    let Some(rules) = arena.sub_alloc(count, StyleRule::default()) else {
        log::warn!(
            "arena exhausted allocating {} css rules ({} bytes remaining)",
            count,
            arena.remaining()
        );
        return &[];
    };
    arena.sub_canary(RULES_CANARY);

    let mut filled = 0;
    for (slot, (selector, style)) in rules.iter_mut().zip(RuleScanner::new(sheet)) {
        let Some(selector) = arena.retain(selector) else {
            log::warn!(
                "arena exhausted retaining css selectors; keeping {} of {} rules",
                filled,
                count
            );
            break;
        };
        *slot = StyleRule { selector, style };
        filled += 1;
    }
    arena.sub_canary(SELECTORS_CANARY);

    let rules: &'a [StyleRule<'a>] = rules;
    &rules[..filled]
}

/// Style of the first rule whose selector equals `class_name`.
pub fn get_style<'c>(rules: &[StyleRule<'_>], class_name: impl Into<TextSlice<'c>>) -> CssStyle {
    let class_name = class_name.into();
    rules
        .iter()
        .find(|rule| rule.selector == class_name)
        .map(|rule| rule.style)
        .unwrap_or_default()
}

/// Combined style of a whitespace-separated class list; earlier classes win.
pub fn get_combined_style<'c>(
    rules: &[StyleRule<'_>],
    class_names: impl Into<TextSlice<'c>>,
) -> CssStyle {
    get_combined_style_with(rules, class_names, Precedence::FirstWins)
}

/// Combined style of a whitespace-separated class list under `precedence`.
pub fn get_combined_style_with<'c>(
    rules: &[StyleRule<'_>],
    class_names: impl Into<TextSlice<'c>>,
    precedence: Precedence,
) -> CssStyle {
    class_names
        .into()
        .words()
        .fold(CssStyle::default(), |mut combined, class_name| {
            combined.combine(&get_style(rules, class_name), precedence);
            combined
        })
}
