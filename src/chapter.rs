//! Style resolution while streaming one XHTML chapter.
//!
//! [`ChapterStyler`] sits between the [`markup::Reader`] and a layout
//! consumer. It collects `<style>` blocks into the arena as they stream past
//! and hands every element and text run to the consumer with the style that
//! applies to it.

use crate::arena::Arena;
use crate::markup::{self, Event, Reader};
use crate::style::{parse_inline, CssStyle, FontStyle, FontWeight};
use crate::stylesheet::{StyleConfig, Stylesheet};
use crate::text::TextSlice;

/// Embedded `<style>` sheets kept per chapter.
pub const MAX_EMBEDDED_SHEETS: usize = 8;

/// Upper bound on [`StyleConfig::max_nesting`].
pub const MAX_NESTING: usize = 64;

/// Markup event annotated with its resolved style.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StyledEvent<'e> {
    Start { name: &'e str, style: CssStyle },
    Text { content: &'e str, style: CssStyle },
    End { name: &'e str },
}

/// Style implied by an element's name alone: `i` and `em` are italic, `b`
/// and `h1` to `h6` are bold. Names compare ASCII case-insensitively.
pub fn element_default_style(name: &str) -> CssStyle {
    let mut style = CssStyle::default();
    match name.as_bytes() {
        [i] if i.eq_ignore_ascii_case(&b'i') => style.font_style = Some(FontStyle::Italic),
        [e, m] if e.eq_ignore_ascii_case(&b'e') && m.eq_ignore_ascii_case(&b'm') => {
            style.font_style = Some(FontStyle::Italic)
        }
        [b] if b.eq_ignore_ascii_case(&b'b') => style.font_weight = Some(FontWeight::Bold),
        [h, b'1'..=b'6'] if h.eq_ignore_ascii_case(&b'h') => {
            style.font_weight = Some(FontWeight::Bold)
        }
        _ => {}
    }
    style
}

/// Streaming style resolver for a single chapter.
pub struct ChapterStyler<'a> {
    external: Stylesheet<'a>,
    embedded: heapless::Vec<Stylesheet<'a>, MAX_EMBEDDED_SHEETS>,
    stack: heapless::Vec<CssStyle, MAX_NESTING>,
    overflow: usize,
    config: StyleConfig,
}

impl<'a> ChapterStyler<'a> {
    /// Build a styler over the chapter's linked stylesheet.
    pub fn new(external: Stylesheet<'a>, config: StyleConfig) -> Self {
        Self {
            external,
            embedded: heapless::Vec::new(),
            stack: heapless::Vec::new(),
            overflow: 0,
            config,
        }
    }

    pub fn config(&self) -> &StyleConfig {
        &self.config
    }

    /// `<style>` sheets collected so far, in document order.
    pub fn embedded_sheets(&self) -> &[Stylesheet<'a>] {
        &self.embedded
    }

    /// Current element depth, including levels past the nesting limit.
    pub fn depth(&self) -> usize {
        self.stack.len() + self.overflow
    }

    /// Style in effect at the current position.
    pub fn current_style(&self) -> CssStyle {
        self.stack.last().copied().unwrap_or_default()
    }

    /// An element's own style, before inheritance.
    ///
    /// The inline `style` attribute decides first, then the embedded sheets in
    /// document order, then the linked sheet, then the element's name (see
    /// [`element_default_style`]).
    pub fn resolve_element_style(
        &self,
        name: &str,
        class: Option<&str>,
        inline: Option<&str>,
    ) -> CssStyle {
        let mut style = inline.map(parse_inline).unwrap_or_default();
        if let Some(class) = class {
            for sheet in &self.embedded {
                style.merge(&sheet.combined_style(class));
            }
            style.merge(&self.external.combined_style(class));
        }
        style.merge(&element_default_style(name));
        style
    }

    /// Pull every event from `reader`, resolving styles as elements open.
    ///
    /// Text inside `<style type="text/css">` (or an untyped `<style>`) is
    /// parsed into `arena` instead of being forwarded. Only markup errors are
    /// returned; style problems degrade to default styles.
    pub fn style_chapter<R, B, F>(
        &mut self,
        reader: &mut Reader<R, B>,
        arena: &mut Arena<'a>,
        mut on_event: F,
    ) -> Result<(), markup::Error>
    where
        R: embedded_io::Read,
        B: AsRef<[u8]> + AsMut<[u8]>,
        F: FnMut(StyledEvent<'_>),
    {
        self.stack.clear();
        self.overflow = 0;
        let mut in_css = false;

        loop {
            match reader.next_event()? {
                Event::StartElement { name, attrs } => {
                    if name.eq_ignore_ascii_case("style") {
                        in_css = attrs
                            .get("type")
                            .is_none_or(|ty| ty.trim_ascii().eq_ignore_ascii_case("text/css"));
                    }
                    let mut style = self.resolve_element_style(name, attrs.get("class"), attrs.get("style"));
                    style.merge(&self.current_style());
                    let style = self.enter(style);
                    on_event(StyledEvent::Start { name, style });
                }
                Event::EndElement { name } => {
                    if name.eq_ignore_ascii_case("style") {
                        in_css = false;
                    }
                    self.leave();
                    on_event(StyledEvent::End { name });
                }
                Event::Text { content } if in_css => {
                    self.add_embedded_sheet(content.into(), arena);
                }
                Event::CData { data } if in_css => {
                    self.add_embedded_sheet(data.into(), arena);
                }
                Event::Text { content } => {
                    on_event(StyledEvent::Text {
                        content,
                        style: self.current_style(),
                    });
                }
                Event::EndOfFile => return Ok(()),
                _ => {}
            }
        }
    }

    fn add_embedded_sheet(&mut self, css: TextSlice<'_>, arena: &mut Arena<'a>) {
        if self.embedded.is_full() {
            log::warn!(
                "more than {} embedded stylesheets; ignoring the rest",
                MAX_EMBEDDED_SHEETS
            );
            return;
        }
        let sheet = Stylesheet::parse(css, arena, &self.config);
        if sheet.is_empty() {
            return;
        }
        let rules = sheet.len();
        match self.embedded.push(sheet) {
            Ok(()) => log::debug!("embedded stylesheet with {} class rules", rules),
            Err(_) => log::warn!("embedded stylesheet dropped"),
        }
    }

    /// Push `style` for a new element, returning the style actually applied.
    fn enter(&mut self, style: CssStyle) -> CssStyle {
        let limit = self.config.max_nesting.min(MAX_NESTING);
        if self.overflow == 0 && self.stack.len() < limit && self.stack.push(style).is_ok() {
            return style;
        }
        if self.overflow == 0 {
            log::debug!(
                "element nesting deeper than {}; reusing parent style",
                limit
            );
        }
        self.overflow += 1;
        self.current_style()
    }

    fn leave(&mut self) {
        if self.overflow > 0 {
            self.overflow -= 1;
        } else {
            self.stack.pop();
        }
    }
}

impl core::fmt::Debug for ChapterStyler<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChapterStyler")
            .field("external_rules", &self.external.len())
            .field("embedded_sheets", &self.embedded.len())
            .field("depth", &self.depth())
            .field("config", &self.config)
            .finish()
    }
}
