//! Streaming XHTML reader over a fixed window.
//!
//! The reader pulls bytes from an [`embedded_io::Read`] source into a buffer
//! that never grows. Consumed bytes are dropped by moving the unread tail to
//! the front before each refill, so a whole chapter can be walked with a few
//! hundred bytes of RAM as long as every single event fits in the window.
//!
//! ```
//! use epub_stream_style::markup::{Event, Reader};
//!
//! let xhtml = r#"<p class="intro">Hello <b>world</b></p>"#;
//! let mut buffer = [0u8; 32];
//! let mut reader = Reader::new(xhtml.as_bytes(), xhtml.len(), &mut buffer[..]);
//! let mut names = Vec::new();
//! loop {
//!     match reader.next_event()? {
//!         Event::StartElement { name, .. } => names.push(name.to_string()),
//!         Event::EndOfFile => break,
//!         _ => {}
//!     }
//! }
//! assert_eq!(names, ["p", "b"]);
//! # Ok::<(), epub_stream_style::markup::Error>(())
//! ```

use core::fmt;
use core::ops::Range;
use core::str::{self, Utf8Error};

use embedded_io::Error as _;

use crate::attributes::AttributeReader;

/// Markup reader failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// The byte source failed.
    Io(embedded_io::ErrorKind),
    /// A name, text run or comment was not valid UTF-8.
    Utf8(Utf8Error),
    /// A single event does not fit in the read buffer.
    SizeExceeded { capacity: usize },
}

impl Error {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "MARKUP_IO",
            Self::Utf8(_) => "MARKUP_UTF8",
            Self::SizeExceeded { .. } => "MARKUP_SIZE_EXCEEDED",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(kind) => write!(f, "{}: read failed ({:?})", self.code(), kind),
            Self::Utf8(err) => write!(f, "{}: {}", self.code(), err),
            Self::SizeExceeded { capacity } => write!(
                f,
                "{}: markup event larger than the {} byte buffer",
                self.code(),
                capacity
            ),
        }
    }
}

impl From<Utf8Error> for Error {
    fn from(err: Utf8Error) -> Self {
        Self::Utf8(err)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Utf8(err) => Some(err),
            _ => None,
        }
    }
}

/// One unit of markup.
///
/// Every borrowed field points into the reader's buffer and is only valid
/// until the next call to [`Reader::next_event`].
#[derive(Clone, Debug, PartialEq)]
pub enum Event<'a> {
    StartElement {
        name: &'a str,
        attrs: AttributeReader<'a>,
    },
    EndElement {
        name: &'a str,
    },
    /// Character data, untrimmed. Entities are not decoded. A run longer
    /// than the buffer arrives as several buffer-sized pieces, split on
    /// character boundaries.
    Text {
        content: &'a str,
    },
    Comment {
        content: &'a str,
    },
    /// Section body, trimmed of ASCII whitespace.
    CData {
        data: &'a [u8],
    },
    /// `<?target attrs?>`, including the XML declaration.
    ProcessingInstruction {
        target: &'a str,
        attrs: AttributeReader<'a>,
    },
    /// `<!DOCTYPE ...>` and other `<!` declarations, without the `<!`.
    Doctype {
        content: &'a str,
    },
    EndOfFile,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Markup {
    StartElement,
    EndElement,
    Comment,
    CData,
    ProcessingInstruction,
    Doctype,
}

impl Markup {
    /// Longest opener, enough to classify any markup block.
    const LOOKAHEAD: usize = 9;

    fn classify(window: &[u8]) -> (Self, &'static [u8], &'static [u8]) {
        if window.starts_with(b"<!--") {
            (Self::Comment, b"<!--", b"-->")
        } else if window.starts_with(b"<![CDATA[") {
            (Self::CData, b"<![CDATA[", b"]]>")
        } else if window.starts_with(b"<!") {
            (Self::Doctype, b"<!", b">")
        } else if window.starts_with(b"<?") {
            (Self::ProcessingInstruction, b"<?", b"?>")
        } else if window.starts_with(b"</") {
            (Self::EndElement, b"</", b">")
        } else {
            (Self::StartElement, b"<", b">")
        }
    }
}

/// Pull parser over a byte source and a fixed buffer.
///
/// The buffer can be borrowed (`&mut [u8]`) or owned (any
/// `AsRef<[u8]> + AsMut<[u8]>`, e.g. a `Vec<u8>` via
/// [`Reader::with_capacity`]).
pub struct Reader<R, B> {
    source: R,
    buffer: B,
    /// First unread byte in `buffer`.
    start: usize,
    /// End of valid data in `buffer`.
    end: usize,
    /// Bytes still expected from `source`.
    remaining: usize,
    /// Bytes dropped off the front of the buffer so far.
    discarded: usize,
    /// Name of a self-closing element whose end event is still owed.
    pending_end: Option<Range<usize>>,
}

#[cfg(feature = "alloc")]
impl<R: embedded_io::Read> Reader<R, alloc::vec::Vec<u8>> {
    /// Create a reader that owns a zeroed buffer of `capacity` bytes.
    pub fn with_capacity(source: R, total_size: usize, capacity: usize) -> Self {
        Self::new(source, total_size, alloc::vec![0; capacity])
    }
}

impl<R: embedded_io::Read, B: AsRef<[u8]> + AsMut<[u8]>> Reader<R, B> {
    /// Create a reader that will pull at most `total_size` bytes from
    /// `source`. Nothing is read until the first event is requested.
    pub fn new(source: R, total_size: usize, buffer: B) -> Self {
        Self {
            source,
            buffer,
            start: 0,
            end: 0,
            remaining: total_size,
            discarded: 0,
            pending_end: None,
        }
    }

    /// Size of the read buffer.
    pub fn capacity(&self) -> usize {
        self.buffer.as_ref().len()
    }

    /// Document offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.discarded + self.start
    }

    /// Give back the byte source.
    pub fn into_inner(self) -> R {
        self.source
    }

    /// Advance to the next event.
    pub fn next_event(&mut self) -> Result<Event<'_>, Error> {
        if let Some(range) = self.pending_end.take() {
            let name = str::from_utf8(&self.buffer.as_ref()[range])?;
            return Ok(Event::EndElement { name });
        }

        loop {
            let found = match self.locate(b"<", 0) {
                Err(Error::SizeExceeded { capacity }) if capacity > 0 => {
                    let len = self.text_prefix()?;
                    let text = self.start..self.start + len;
                    self.start += len;
                    if self.buffer.as_ref()[text.clone()].trim_ascii().is_empty() {
                        continue;
                    }
                    log::trace!("text run fills the {} byte buffer; emitting a piece", capacity);
                    let content = str::from_utf8(&self.buffer.as_ref()[text])?;
                    return Ok(Event::Text { content });
                }
                other => other?,
            };
            match found {
                Some(0) => break,
                Some(len) => {
                    let text = self.start..self.start + len;
                    self.start += len;
                    if !self.buffer.as_ref()[text.clone()].trim_ascii().is_empty() {
                        let content = str::from_utf8(&self.buffer.as_ref()[text])?;
                        return Ok(Event::Text { content });
                    }
                }
                None => {
                    let text = self.start..self.end;
                    self.start = self.end;
                    let bytes = &self.buffer.as_ref()[text];
                    if bytes.trim_ascii().is_empty() {
                        return Ok(Event::EndOfFile);
                    }
                    let content = str::from_utf8(bytes)?;
                    return Ok(Event::Text { content });
                }
            }
        }

        self.ensure(Markup::LOOKAHEAD)?;
        let (kind, opener, closer) = Markup::classify(self.window());
        let body_len = match kind {
            Markup::StartElement => self.locate_tag_end(opener.len())?,
            _ => self.locate(closer, opener.len())?,
        };
        let Some(body_len) = body_len else {
            log::debug!(
                "truncated markup at offset {}; treating as end of input",
                self.position()
            );
            self.start = self.end;
            return Ok(Event::EndOfFile);
        };

        let body = self.start + opener.len()..self.start + body_len;
        self.start += body_len + closer.len();
        let buffer = self.buffer.as_ref();

        match kind {
            Markup::StartElement => {
                let mut bytes = &buffer[body.clone()];
                let self_closing = bytes.ends_with(b"/");
                if self_closing {
                    bytes = &bytes[..bytes.len() - 1];
                }
                let (name, attrs) = name_and_attrs(bytes)?;
                if self_closing {
                    let offset = name.as_ptr() as usize - buffer.as_ptr() as usize;
                    self.pending_end = Some(offset..offset + name.len());
                }
                Ok(Event::StartElement { name, attrs })
            }
            Markup::EndElement => Ok(Event::EndElement {
                name: str::from_utf8(buffer[body].trim_ascii())?,
            }),
            Markup::Comment => Ok(Event::Comment {
                content: str::from_utf8(buffer[body].trim_ascii())?,
            }),
            Markup::CData => Ok(Event::CData {
                data: buffer[body].trim_ascii(),
            }),
            Markup::ProcessingInstruction => {
                let (target, attrs) = name_and_attrs(&buffer[body])?;
                Ok(Event::ProcessingInstruction { target, attrs })
            }
            Markup::Doctype => Ok(Event::Doctype {
                content: str::from_utf8(buffer[body].trim_ascii())?,
            }),
        }
    }

    fn window(&self) -> &[u8] {
        &self.buffer.as_ref()[self.start..self.end]
    }

    /// Offset of `needle` at or after `from`, relative to the window start,
    /// refilling until found or the source is exhausted.
    fn locate(&mut self, needle: &[u8], from: usize) -> Result<Option<usize>, Error> {
        let mut from = from;
        loop {
            let window = self.window();
            if let Some(pos) = window
                .get(from..)
                .and_then(|tail| memchr::memmem::find(tail, needle))
            {
                return Ok(Some(from + pos));
            }
            // A match may straddle the old end of the window.
            from = from.max((window.len() + 1).saturating_sub(needle.len()));
            if !self.refill()? {
                return Ok(None);
            }
        }
    }

    /// Length of the longest whole-character prefix of a window that holds
    /// only text.
    fn text_prefix(&self) -> Result<usize, Error> {
        match str::from_utf8(self.window()) {
            Ok(text) => Ok(text.len()),
            Err(err) if err.error_len().is_none() && err.valid_up_to() > 0 => Ok(err.valid_up_to()),
            Err(err) => Err(Error::Utf8(err)),
        }
    }

    /// Offset of the `>` closing a start tag, skipping quoted attribute
    /// values.
    fn locate_tag_end(&mut self, from: usize) -> Result<Option<usize>, Error> {
        loop {
            let mut quote = None;
            let window = self.window();
            for (offset, &byte) in window.iter().enumerate().skip(from) {
                match (quote, byte) {
                    (None, b'>') => return Ok(Some(offset)),
                    (None, b'"' | b'\'') => quote = Some(byte),
                    (Some(open), _) if open == byte => quote = None,
                    _ => {}
                }
            }
            if !self.refill()? {
                return Ok(None);
            }
        }
    }

    /// Refill until at least `len` bytes are buffered, the window is full or
    /// the source is exhausted.
    fn ensure(&mut self, len: usize) -> Result<(), Error> {
        while self.end - self.start < len.min(self.capacity()) {
            if !self.refill()? {
                break;
            }
        }
        Ok(())
    }

    /// Move the unread tail to the front and read more. Returns `false` once
    /// the source has nothing left to give.
    fn refill(&mut self) -> Result<bool, Error> {
        if self.remaining == 0 {
            return Ok(false);
        }
        if self.start > 0 {
            self.buffer.as_mut().copy_within(self.start..self.end, 0);
            self.discarded += self.start;
            self.end -= self.start;
            self.start = 0;
        }

        let capacity = self.capacity();
        if self.end == capacity {
            return Err(Error::SizeExceeded { capacity });
        }

        let want = (capacity - self.end).min(self.remaining);
        let read = self
            .source
            .read(&mut self.buffer.as_mut()[self.end..self.end + want])
            .map_err(|err| Error::Io(err.kind()))?;
        if read == 0 {
            log::debug!(
                "markup source ended {} bytes short of its declared size",
                self.remaining
            );
            self.remaining = 0;
            return Ok(false);
        }

        self.end += read;
        self.remaining -= read;
        log::trace!(
            "markup buffer refilled with {} bytes ({} buffered, {} remaining)",
            read,
            self.end,
            self.remaining
        );
        Ok(true)
    }
}

impl<R, B: AsRef<[u8]>> fmt::Debug for Reader<R, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reader")
            .field("capacity", &self.buffer.as_ref().len())
            .field("position", &(self.discarded + self.start))
            .field("buffered", &(self.end - self.start))
            .field("remaining", &self.remaining)
            .finish()
    }
}

fn name_and_attrs(block: &[u8]) -> Result<(&str, AttributeReader<'_>), Error> {
    let block = str::from_utf8(block.trim_ascii())?;
    match block.split_once(|c: char| c.is_ascii_whitespace()) {
        Some((name, rest)) => Ok((name, AttributeReader::from_block(rest))),
        None => Ok((block, AttributeReader::default())),
    }
}
