use crate::{FrameNumber, PAGE_SHIFT, PageSize, VirtualAddress};
use core::fmt;

/// Physical memory address.
///
/// Denotes **physical** addresses (host RAM / MMIO) and prevents accidental
/// VA↔PA mix-ups. Page-table entries store a page-aligned physical base plus
/// flag bits; the walker only ever produces values of this type through
/// [`FrameNumber::base`] or [`PhysicalAddress::join`].
///
/// ### Examples
/// ```rust
/// # use pt_addresses::*;
/// let pa = PhysicalAddress::new(0x0000_0010_2000_0042);
/// assert_eq!(pa.frame().as_u64(), 0x0102_0000);
/// assert_eq!(pa.page_offset(PageSize::Size4K), 0x42);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(u64);

impl PhysicalAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// The 4 KiB frame containing this address.
    #[inline]
    #[must_use]
    pub const fn frame(self) -> FrameNumber {
        FrameNumber::new(self.0 >> PAGE_SHIFT)
    }

    /// Offset of this address inside a page of the given size.
    #[inline]
    #[must_use]
    pub const fn page_offset(self, size: PageSize) -> u64 {
        self.0 & size.offset_mask()
    }

    /// Align down to a page boundary of the given size.
    #[inline]
    #[must_use]
    pub const fn align_down(self, size: PageSize) -> Self {
        Self(self.0 & size.base_mask())
    }

    /// Check alignment against a power-of-two byte boundary.
    #[inline]
    #[must_use]
    pub const fn is_aligned_to(self, align: u64) -> bool {
        self.0 & (align - 1) == 0
    }

    /// Combine this page base with the in-page offset bits of `va`.
    ///
    /// The base is first aligned down to `size`, so stray low bits in a
    /// huge-page base never leak into the result:
    /// `(self & !(size - 1)) | (va & (size - 1))`.
    #[inline]
    #[must_use]
    pub const fn join(self, va: VirtualAddress, size: PageSize) -> Self {
        Self((self.0 & size.base_mask()) | (va.as_u64() & size.offset_mask()))
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA(0x{:016X})", self.0)
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl fmt::LowerHex for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl From<u64> for PhysicalAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}

impl From<PhysicalAddress> for u64 {
    #[inline]
    fn from(v: PhysicalAddress) -> Self {
        v.as_u64()
    }
}
