//! Attribute lists of start tags and processing instructions.

use core::fmt;

/// Iterator over the `name="value"` pairs of a tag.
///
/// Values may be double-quoted, single-quoted or bare. A name without `=`
/// yields an empty value. Entities are not decoded.
///
/// ```
/// use epub_stream_style::attributes::AttributeReader;
///
/// let mut attrs = AttributeReader::from_block(r#"class="c1 c2" style='text-align: center' hidden"#);
/// assert_eq!(attrs.get("CLASS"), Some("c1 c2"));
/// assert_eq!(attrs.next(), Some(("class", "c1 c2")));
/// assert_eq!(attrs.next(), Some(("style", "text-align: center")));
/// assert_eq!(attrs.next(), Some(("hidden", "")));
/// assert_eq!(attrs.next(), None);
/// ```
#[derive(Clone, Copy, Default)]
pub struct AttributeReader<'a> {
    rest: &'a str,
}

impl<'a> AttributeReader<'a> {
    /// Read attributes out of the text following a tag name.
    pub fn from_block(block: &'a str) -> Self {
        Self {
            rest: block.trim_ascii(),
        }
    }

    /// Value of the first attribute named `name`, compared ASCII
    /// case-insensitively.
    pub fn get(&self, name: &str) -> Option<&'a str> {
        let mut attrs = *self;
        attrs
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    pub fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }
}

impl<'a> Iterator for AttributeReader<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        let s = self.rest.trim_ascii_start();
        if s.is_empty() {
            self.rest = s;
            return None;
        }

        let name_end = s
            .find(|c: char| c == '=' || c.is_ascii_whitespace())
            .unwrap_or(s.len());
        let name = &s[..name_end];
        let after = s[name_end..].trim_ascii_start();

        let Some(value) = after.strip_prefix('=') else {
            self.rest = after;
            return Some((name, ""));
        };
        let value = value.trim_ascii_start();

        match value.as_bytes().first() {
            Some(&quote @ (b'"' | b'\'')) => {
                let inner = &value[1..];
                match inner.find(quote as char) {
                    Some(end) => {
                        self.rest = &inner[end + 1..];
                        Some((name, &inner[..end]))
                    }
                    None => {
                        self.rest = "";
                        Some((name, inner))
                    }
                }
            }
            _ => {
                let end = value
                    .find(|c: char| c.is_ascii_whitespace())
                    .unwrap_or(value.len());
                self.rest = &value[end..];
                Some((name, &value[..end]))
            }
        }
    }
}

impl fmt::Debug for AttributeReader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(*self).finish()
    }
}

impl PartialEq for AttributeReader<'_> {
    fn eq(&self, other: &Self) -> bool {
        let mut left = *self;
        let mut right = *other;
        loop {
            match (left.next(), right.next()) {
                (None, None) => return true,
                (Some((n1, v1)), Some((n2, v2))) if n1.eq_ignore_ascii_case(n2) && v1 == v2 => {}
                _ => return false,
            }
        }
    }
}
