use crate::PageSize;
use core::fmt;

/// Virtual memory address.
///
/// Carries the *kind* of address at the type level so it can't be confused
/// with a [`PhysicalAddress`](crate::PhysicalAddress). Canonicality is not
/// enforced on construction; use [`VirtualAddress::is_canonical`] with the
/// address width of the active paging mode (48 bits for 4-level, 57 bits for
/// 5-level paging).
///
/// ### Examples
/// ```rust
/// # use pt_addresses::*;
/// let va = VirtualAddress::new(0x0000_8000_0000_1234);
/// assert!(!va.is_canonical(48));
/// assert!(va.is_canonical(57));
/// assert!(VirtualAddress::new(0xFFFF_8000_0000_1234).is_canonical(48));
/// assert_eq!(va.page_offset(PageSize::Size4K), 0x234);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualAddress(u64);

impl VirtualAddress {
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

    /// Offset of this address inside a page of the given size.
    #[inline]
    #[must_use]
    pub const fn page_offset(self, size: PageSize) -> u64 {
        self.0 & size.offset_mask()
    }

    /// The low `width` bits of the address (the part the MMU translates).
    #[inline]
    #[must_use]
    pub const fn truncate(self, width: u32) -> u64 {
        if width >= 64 {
            self.0
        } else {
            self.0 & ((1 << width) - 1)
        }
    }

    /// Sign-extend bit `width - 1` into the upper bits.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub const fn canonicalize(self, width: u32) -> Self {
        if width == 0 || width >= 64 {
            return self;
        }
        let unused = 64 - width;
        Self((((self.0 << unused) as i64) >> unused) as u64)
    }

    /// Whether bits `[63:width]` are all copies of bit `width - 1`.
    #[inline]
    #[must_use]
    pub const fn is_canonical(self, width: u32) -> bool {
        self.canonicalize(width).0 == self.0
    }
}

impl fmt::Debug for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VA(0x{:016X})", self.0)
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl fmt::LowerHex for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl From<u64> for VirtualAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}
