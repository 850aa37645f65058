//! Zero-copy byte slices for tokenizing stylesheet and markup text.
//!
//! [`TextSlice`] is a borrowed view over bytes owned by somebody else: the
//! caller's input buffer, a markup reader window, or an [`Arena`](crate::arena::Arena).
//! Every slicing operation returns a view into the same storage, so nothing
//! here allocates.

use core::fmt;
use core::ops::Range;

/// Non-owning view over a run of bytes.
///
/// Equality is byte-wise. Use [`TextSlice::eq_ignore_ascii_case`] for
/// tokens such as property names.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextSlice<'a> {
    bytes: &'a [u8],
}

impl<'a> TextSlice<'a> {
    /// The empty slice.
    pub const EMPTY: TextSlice<'static> = TextSlice { bytes: &[] };

    /// Wrap raw bytes.
    #[inline]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Underlying bytes.
    #[inline]
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// View as `str` if the bytes are valid UTF-8.
    pub fn to_str(&self) -> Option<&'a str> {
        core::str::from_utf8(self.bytes).ok()
    }

    /// First byte, if any.
    #[inline]
    pub fn first(&self) -> Option<u8> {
        self.bytes.first().copied()
    }

    /// Position of the first `needle` byte.
    #[inline]
    pub fn find(&self, needle: u8) -> Option<usize> {
        memchr::memchr(needle, self.bytes)
    }

    /// Position of the first `needle` byte at or after `from`.
    pub fn find_from(&self, needle: u8, from: usize) -> Option<usize> {
        let tail = self.bytes.get(from..)?;
        memchr::memchr(needle, tail).map(|pos| pos + from)
    }

    /// Position of the first byte equal to either `a` or `b`.
    #[inline]
    pub fn find_either(&self, a: u8, b: u8) -> Option<usize> {
        memchr::memchr2(a, b, self.bytes)
    }

    /// Position of the first occurrence of `needle`.
    pub fn find_seq(&self, needle: &[u8]) -> Option<usize> {
        memchr::memmem::find(self.bytes, needle)
    }

    /// Bytes in `range`, clamped to the slice bounds.
    pub fn sub(&self, range: Range<usize>) -> Self {
        let end = range.end.min(self.bytes.len());
        let start = range.start.min(end);
        Self::new(&self.bytes[start..end])
    }

    /// Drop the first `n` bytes (saturating).
    pub fn skip(&self, n: usize) -> Self {
        Self::new(&self.bytes[n.min(self.bytes.len())..])
    }

    /// Keep the first `n` bytes (saturating).
    pub fn head(&self, n: usize) -> Self {
        Self::new(&self.bytes[..n.min(self.bytes.len())])
    }

    /// Strip ASCII whitespace from both ends.
    pub fn trim_whitespace(&self) -> Self {
        Self::new(self.bytes.trim_ascii())
    }

    /// Strip leading ASCII whitespace.
    pub fn trim_start(&self) -> Self {
        Self::new(self.bytes.trim_ascii_start())
    }

    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.bytes.starts_with(prefix)
    }

    pub fn ends_with(&self, suffix: &[u8]) -> bool {
        self.bytes.ends_with(suffix)
    }

    /// Remove `suffix` if present, comparing ASCII case-insensitively.
    pub fn strip_suffix_ignore_case(&self, suffix: &[u8]) -> Option<Self> {
        let split = self.bytes.len().checked_sub(suffix.len())?;
        let (head, tail) = self.bytes.split_at(split);
        tail.eq_ignore_ascii_case(suffix).then_some(Self::new(head))
    }

    /// ASCII case-insensitive comparison against a token.
    #[inline]
    pub fn eq_ignore_ascii_case(&self, other: &str) -> bool {
        self.bytes.eq_ignore_ascii_case(other.as_bytes())
    }

    /// Split around the first `delimiter`, excluding it.
    pub fn split_once(&self, delimiter: u8) -> Option<(Self, Self)> {
        let pos = self.find(delimiter)?;
        Some((self.head(pos), self.skip(pos + 1)))
    }

    /// Iterate the pieces between `delimiter` bytes.
    ///
    /// Empty pieces are yielded, as with [`str::split`].
    pub fn split(&self, delimiter: u8) -> Split<'a> {
        Split {
            rest: Some(*self),
            delimiter,
        }
    }

    /// Iterate the non-empty runs separated by ASCII whitespace.
    pub fn words(&self) -> Words<'a> {
        Words { rest: *self }
    }
}

impl<'a> From<&'a str> for TextSlice<'a> {
    fn from(value: &'a str) -> Self {
        Self::new(value.as_bytes())
    }
}

impl<'a> From<&'a [u8]> for TextSlice<'a> {
    fn from(value: &'a [u8]) -> Self {
        Self::new(value)
    }
}

impl PartialEq<str> for TextSlice<'_> {
    fn eq(&self, other: &str) -> bool {
        self.bytes == other.as_bytes()
    }
}

impl PartialEq<&str> for TextSlice<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.bytes == other.as_bytes()
    }
}

impl fmt::Display for TextSlice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.bytes.utf8_chunks() {
            f.write_str(chunk.valid())?;
            if !chunk.invalid().is_empty() {
                f.write_str("\u{FFFD}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for TextSlice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"")?;
        for chunk in self.bytes.utf8_chunks() {
            write!(f, "{}", chunk.valid().escape_debug())?;
            for byte in chunk.invalid() {
                write!(f, "\\x{:02x}", byte)?;
            }
        }
        f.write_str("\"")
    }
}

/// Iterator returned by [`TextSlice::split`].
#[derive(Clone, Debug)]
pub struct Split<'a> {
    rest: Option<TextSlice<'a>>,
    delimiter: u8,
}

impl<'a> Iterator for Split<'a> {
    type Item = TextSlice<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.rest?;
        match rest.find(self.delimiter) {
            Some(pos) => {
                self.rest = Some(rest.skip(pos + 1));
                Some(rest.head(pos))
            }
            None => {
                self.rest = None;
                Some(rest)
            }
        }
    }
}

/// Iterator returned by [`TextSlice::words`].
#[derive(Clone, Debug)]
pub struct Words<'a> {
    rest: TextSlice<'a>,
}

impl<'a> Iterator for Words<'a> {
    type Item = TextSlice<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.rest.trim_start();
        if rest.is_empty() {
            self.rest = rest;
            return None;
        }
        let end = rest
            .as_bytes()
            .iter()
            .position(u8::is_ascii_whitespace)
            .unwrap_or(rest.len());
        self.rest = rest.skip(end);
        Some(rest.head(end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_and_compare_ignore_case() {
        let s = TextSlice::from("  Text-Align \t");
        assert!(s.trim_whitespace().eq_ignore_ascii_case("text-align"));
        assert_eq!(s.trim_whitespace(), "Text-Align");
        assert_eq!(s.trim_start(), "Text-Align \t");
    }

    #[test]
    fn slicing_is_clamped() {
        let s = TextSlice::from("abc");
        assert_eq!(s.skip(10), "");
        assert_eq!(s.head(10), "abc");
        assert_eq!(s.sub(1..10), "bc");
        assert_eq!(s.sub(5..2), "");
    }

    #[test]
    fn slices_share_backing_storage() {
        let source = "name: value";
        let s = TextSlice::from(source);
        let (_, value) = s.split_once(b':').expect("colon present");
        let value = value.trim_whitespace();
        assert_eq!(value.as_bytes().as_ptr(), source[6..].as_ptr());
    }

    #[test]
    fn split_keeps_empty_pieces() {
        let pieces: Vec<_> = TextSlice::from("a;;b;").split(b';').collect();
        assert_eq!(pieces, ["a", "", "b", ""]);
    }

    #[test]
    fn words_skip_runs_of_whitespace() {
        let words: Vec<_> = TextSlice::from("  bold \t\n center  ").words().collect();
        assert_eq!(words, ["bold", "center"]);
        assert_eq!(TextSlice::from("   ").words().count(), 0);
    }

    #[test]
    fn find_variants() {
        let s = TextSlice::from("a { b } @c;");
        assert_eq!(s.find(b'{'), Some(2));
        assert_eq!(s.find_from(b'}', 3), Some(6));
        assert_eq!(s.find_from(b'{', 3), None);
        assert_eq!(s.find_from(b'a', 99), None);
        assert_eq!(s.find_either(b'@', b'}'), Some(6));
        assert_eq!(s.find_seq(b"@c"), Some(8));
    }

    #[test]
    fn strip_suffix_ignores_case() {
        let s = TextSlice::from("1.5EM");
        assert_eq!(s.strip_suffix_ignore_case(b"em"), Some(TextSlice::from("1.5")));
        assert_eq!(s.strip_suffix_ignore_case(b"px"), None);
        assert_eq!(TextSlice::from("m").strip_suffix_ignore_case(b"em"), None);
    }

    #[test]
    fn display_is_lossy() {
        let s = TextSlice::new(b"ok\xffok");
        assert_eq!(format!("{}", s), "ok\u{FFFD}ok");
        assert_eq!(format!("{:?}", s), "\"ok\\xffok\"");
        assert_eq!(s.to_str(), None);
    }
}
