//! Bit layout for 64-bit storage handles.
//!
//! A handle packs the location of a pool slot into a single integer:
//!
//! ```text
//! bit 63      : reserved (handles stay non-negative as i64)
//! bits 62..60 : flags (bit 62 = detached)
//! next Pᵢ bits: page index
//! next Pₛ bits: slot index within the page
//! low bits    : zero
//! ```
//!
//! The widths `Pᵢ` and `Pₛ` come from [`Config`] and must satisfy
//! `3 + Pᵢ + Pₛ <= 63`. With the defaults (14 and 16) the page field sits at
//! bits 59..46 and the slot field at bits 45..30.
//!
//! [`Config`]: crate::ecs::Config

/// Number of flag bits reserved at the top of a handle, below the sign bit.
pub const FLAG_BITS: u32 = 3;

/// Bit position of the lowest flag bit.
pub const FLAGS_SHIFT: u32 = 60;

/// The flag marking a handle whose slot has been released by its tenant.
pub const DETACHED_BIT: u64 = 1 << 62;

/// Sentinel for "no handle". Carries the reserved sign bit, so it can never
/// collide with a real handle.
pub const NIL: u64 = u64::MAX;

/// Determine whether a handle carries the detached flag.
#[inline]
pub const fn is_detached(handle: u64) -> bool {
    handle & DETACHED_BIT != 0
}

/// Get the handle with the detached flag set.
#[inline]
pub const fn with_detached(handle: u64) -> u64 {
    handle | DETACHED_BIT
}

/// Get the handle with all flag bits cleared. Applied when a freed handle is
/// re-issued, so recycled handles never carry a stale detached mark.
#[inline]
pub const fn without_flags(handle: u64) -> u64 {
    handle & !(0b111 << FLAGS_SHIFT)
}

/// The bit schema used to pack and unpack handles for one pool.
///
/// A pure value type; all operations are shift/mask arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdSchema {
    page_bits: u32,
    slot_bits: u32,
}

impl Default for IdSchema {
    /// The default schema: 2^14 pages of 2^16 slots.
    fn default() -> Self {
        Self::new(14, 16)
    }
}

impl IdSchema {
    /// Create a schema with the given page-index and slot-index widths.
    ///
    /// # Panics
    /// Panics if the fields do not fit below the flag bits, i.e. when
    /// `3 + page_bits + slot_bits > 63`.
    pub fn new(page_bits: u32, slot_bits: u32) -> Self {
        assert!(page_bits > 0 && slot_bits > 0, "field widths must be non-zero");
        assert!(
            page_bits < 32 && slot_bits < 32,
            "page and slot indices are u32; widths above 31 bits are unusable"
        );
        assert!(
            FLAG_BITS + page_bits + slot_bits <= 63,
            "handle fields exceed 63 bits: {} flag + {} page + {} slot",
            FLAG_BITS,
            page_bits,
            slot_bits
        );
        Self { page_bits, slot_bits }
    }

    /// The maximum number of pages addressable under this schema.
    #[inline]
    pub const fn max_pages(&self) -> u32 {
        1 << self.page_bits
    }

    /// The number of slots per page under this schema.
    #[inline]
    pub const fn page_capacity(&self) -> u32 {
        1 << self.slot_bits
    }

    #[inline]
    const fn page_shift(&self) -> u32 {
        FLAGS_SHIFT - self.page_bits
    }

    #[inline]
    const fn slot_shift(&self) -> u32 {
        self.page_shift() - self.slot_bits
    }

    /// Pack a page index, slot index and flag bits into a handle.
    ///
    /// Values wider than the schema fields are masked off; callers are
    /// expected to stay within [`max_pages`](Self::max_pages) and
    /// [`page_capacity`](Self::page_capacity).
    #[inline]
    pub const fn encode(&self, page: u32, slot: u32, flags: u8) -> u64 {
        let page = (page as u64) & (self.max_pages() as u64 - 1);
        let slot = (slot as u64) & (self.page_capacity() as u64 - 1);
        let flags = (flags as u64) & 0b111;
        (flags << FLAGS_SHIFT) | (page << self.page_shift()) | (slot << self.slot_shift())
    }

    /// Extract the page index from a handle.
    #[inline]
    pub const fn page_of(&self, handle: u64) -> u32 {
        ((handle >> self.page_shift()) & (self.max_pages() as u64 - 1)) as u32
    }

    /// Extract the slot index from a handle.
    #[inline]
    pub const fn slot_of(&self, handle: u64) -> u32 {
        ((handle >> self.slot_shift()) & (self.page_capacity() as u64 - 1)) as u32
    }

    /// Extract the flag bits from a handle.
    #[inline]
    pub const fn flags_of(&self, handle: u64) -> u8 {
        ((handle >> FLAGS_SHIFT) & 0b111) as u8
    }
}
