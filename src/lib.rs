//! Bounded-memory stylesheet and markup extraction for embedded EPUB readers.
//!
//! The crate turns a chapter's CSS into a compact table of class rules and
//! resolves the handful of properties a small e-ink layout engine cares about
//! (`text-align`, `font-style`, `font-weight`, `text-indent`). Everything is
//! allocated out of a caller-provided [`Arena`], so parsing a sheet touches
//! no heap at all and the memory ceiling is known up front.
//!
//! - [`text`]: borrowed byte slices used for tokenizing.
//! - [`arena`]: bump allocator with canary checkpoints.
//! - [`style`]: style records and the inline declaration parser.
//! - [`stylesheet`]: comment filtering, rule parsing and class lookup.
//! - [`markup`] / [`attributes`]: streaming XHTML reader over a fixed buffer.
//! - [`chapter`]: streams a chapter and resolves styles per element.
//!
//! ```
//! use epub_stream_style::{Arena, StyleConfig, Stylesheet, TextAlign};
//!
//! let mut storage = [0u8; 1024];
//! let mut arena = Arena::new(&mut storage);
//! let sheet = Stylesheet::parse(
//!     ".title { text-align: center; font-weight: bold }".into(),
//!     &mut arena,
//!     &StyleConfig::embedded(),
//! );
//! assert_eq!(sheet.combined_style("chapter title").text_align, Some(TextAlign::Center));
//! ```
//!
//! ## Features
//!
//! - `std` (default): `std::error::Error` impls; enables `alloc`.
//! - `alloc`: owned read buffers for [`markup::Reader::with_capacity`].
//!
//! Without `std` the crate is `no_std`.

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(
    not(test),
    deny(
        clippy::disallowed_methods,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod arena;
pub mod attributes;
pub mod chapter;
pub mod markup;
pub mod style;
pub mod stylesheet;
pub mod text;

pub use arena::{Arena, CanaryViolation};
pub use chapter::{ChapterStyler, StyledEvent};
pub use style::{parse_inline, CssStyle, FontStyle, FontWeight, Precedence, TextAlign};
pub use stylesheet::{
    filter_comments, get_combined_style, get_style, parse_sheet, StyleConfig, StyleLimits,
    StyleRule, Stylesheet,
};
pub use text::TextSlice;
