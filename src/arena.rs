//! Bump arena over caller-provided storage.
//!
//! The arena never grows and never frees individual allocations: it carves
//! blocks off the front of the free region until it runs out, at which point
//! allocation returns `None` and callers degrade to partial results. All
//! storage is reclaimed at once when the borrow of the backing region ends.
//!
//! ```
//! use epub_stream_style::arena::Arena;
//! use epub_stream_style::text::TextSlice;
//!
//! let mut storage = [0u8; 64];
//! let mut arena = Arena::new(&mut storage);
//! let kept = {
//!     let transient = String::from("headline");
//!     arena.retain(TextSlice::from(transient.as_str())).unwrap()
//! };
//! assert_eq!(kept, "headline");
//! assert!(arena.sub_canary(b"__checkpoint____"));
//! assert!(arena.verify_canaries().is_ok());
//! ```

use core::fmt;
use core::mem::{align_of, size_of};
use core::ops::Range;

use crate::text::TextSlice;

/// Size of a canary tag in bytes.
pub const CANARY_LEN: usize = 16;

/// Maximum number of canaries an arena keeps track of.
pub const MAX_CANARIES: usize = 16;

/// A checkpoint written into the arena.
#[derive(Clone, Debug)]
pub struct Canary<'a> {
    tag: [u8; CANARY_LEN],
    offset: usize,
    guarded: Range<usize>,
    marker: &'a [u8],
}

impl Canary<'_> {
    /// Tag written at the checkpoint.
    pub fn tag(&self) -> &[u8; CANARY_LEN] {
        &self.tag
    }

    /// Arena offset of the marker.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Arena byte range the marker closes off.
    pub fn guarded(&self) -> Range<usize> {
        self.guarded.clone()
    }

    /// Whether the marker bytes still equal the tag.
    pub fn is_intact(&self) -> bool {
        self.marker == self.tag
    }
}

/// A canary whose marker no longer matches its tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CanaryViolation {
    /// Tag of the damaged checkpoint.
    pub tag: [u8; CANARY_LEN],
    /// Arena offset of the damaged marker.
    pub offset: usize,
}

impl fmt::Display for CanaryViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arena canary {} overwritten at offset {}",
            TextSlice::new(&self.tag),
            self.offset
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CanaryViolation {}

/// Fixed-capacity bump allocator.
pub struct Arena<'a> {
    free: &'a mut [u8],
    capacity: usize,
    used: usize,
    region_start: usize,
    canaries: heapless::Vec<Canary<'a>, MAX_CANARIES>,
}

impl<'a> Arena<'a> {
    /// Create an arena that allocates out of `storage`.
    pub fn new(storage: &'a mut [u8]) -> Self {
        let capacity = storage.len();
        Self {
            free: storage,
            capacity,
            used: 0,
            region_start: 0,
            canaries: heapless::Vec::new(),
        }
    }

    /// Total bytes of backing storage.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes consumed so far, including alignment padding and canaries.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Bytes still available.
    pub fn remaining(&self) -> usize {
        self.free.len()
    }

    /// Allocate `count` slots of `T`, each initialized to `init`.
    ///
    /// Returns `None` when the arena cannot fit the block.
    pub fn bump_alloc<T: Copy>(&mut self, count: usize, init: T) -> Option<&'a mut [T]> {
        let size = size_of::<T>().checked_mul(count)?;
        let align = align_of::<T>();
        let pad = (self.free.as_ptr() as usize).wrapping_neg() & (align - 1);
        let needed = pad.checked_add(size)?;
        if needed > self.free.len() {
            log::trace!(
                "arena exhausted: need {} bytes, {} remaining",
                needed,
                self.free.len()
            );
            return None;
        }

        let (_, rest) = core::mem::take(&mut self.free).split_at_mut(pad);
        let (block, tail) = rest.split_at_mut(size);
        self.free = tail;
        self.used += needed;

        let ptr = block.as_mut_ptr().cast::<T>();
        // SAFETY: `block` is exclusively borrowed for 'a, `size_of::<T>() * count`
        // bytes long and starts on an address aligned for `T` (the padding was
        // skipped above). Every slot is written before the slice is formed, and
        // `T: Copy` means no slot ever needs dropping.
        unsafe {
            for i in 0..count {
                ptr.add(i).write(init);
            }
            Some(core::slice::from_raw_parts_mut(ptr, count))
        }
    }

    /// Allocate `len` zeroed scratch bytes.
    pub fn alloc_bytes(&mut self, len: usize) -> Option<&'a mut [u8]> {
        self.bump_alloc::<u8>(len, 0)
    }

    /// Allocate like [`Arena::bump_alloc`] and open a named sub-region at the
    /// returned block. The next [`Arena::sub_canary`] closes it.
    pub fn sub_alloc<T: Copy>(&mut self, count: usize, init: T) -> Option<&'a mut [T]> {
        let block = self.bump_alloc(count, init)?;
        let block_len = size_of::<T>() * count;
        self.region_start = self.used - block_len;
        Some(block)
    }

    /// Write a tagged marker at the cursor.
    ///
    /// The marker guards everything allocated since the open sub-region (or
    /// since the previous canary). Returns `false` if there is no room for the
    /// marker or the checkpoint registry is full.
    pub fn sub_canary(&mut self, tag: &[u8; CANARY_LEN]) -> bool {
        if self.canaries.is_full() {
            log::warn!(
                "arena canary registry full ({}); skipping checkpoint {}",
                MAX_CANARIES,
                TextSlice::new(tag)
            );
            return false;
        }
        let guarded = self.region_start..self.used;
        let Some(marker) = self.bump_alloc::<u8>(CANARY_LEN, 0) else {
            log::warn!(
                "arena full; skipping checkpoint {}",
                TextSlice::new(tag)
            );
            return false;
        };
        marker.copy_from_slice(tag);
        let offset = self.used - CANARY_LEN;
        let canary = Canary {
            tag: *tag,
            offset,
            guarded,
            marker,
        };
        if self.canaries.push(canary).is_err() {
            return false;
        }
        self.region_start = self.used;
        true
    }

    /// Recorded checkpoints, oldest first.
    pub fn canaries(&self) -> impl Iterator<Item = &Canary<'a>> + '_ {
        self.canaries.iter()
    }

    /// Check every recorded marker against its tag.
    pub fn verify_canaries(&self) -> Result<(), CanaryViolation> {
        match self.canaries.iter().find(|canary| !canary.is_intact()) {
            Some(canary) => Err(CanaryViolation {
                tag: canary.tag,
                offset: canary.offset,
            }),
            None => Ok(()),
        }
    }

    /// Copy `slice` into arena storage so it outlives its original buffer.
    pub fn retain(&mut self, slice: TextSlice<'_>) -> Option<TextSlice<'a>> {
        if slice.is_empty() {
            return Some(TextSlice::EMPTY);
        }
        let buf = self.alloc_bytes(slice.len())?;
        buf.copy_from_slice(slice.as_bytes());
        let buf: &'a [u8] = buf;
        Some(TextSlice::new(buf))
    }
}

impl fmt::Debug for Arena<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("capacity", &self.capacity)
            .field("used", &self.used)
            .field("canaries", &self.canaries.len())
            .finish()
    }
}
