use crate::{PAGE_SHIFT, PhysicalAddress};
use core::fmt;

/// Physical frame number (PFN): a physical address in units of 4 KiB.
///
/// Huge-page entries still yield 4 KiB-granular frame numbers (with the low
/// 9 or 18 bits zero), which keeps them usable as keys into per-frame record
/// stores such as `/proc/kpageflags`.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FrameNumber(u64);

impl FrameNumber {
    #[inline]
    #[must_use]
    pub const fn new(pfn: u64) -> Self {
        Self(pfn)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Physical base address of the frame.
    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        PhysicalAddress::new(self.0 << PAGE_SHIFT)
    }
}

impl fmt::Debug for FrameNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PFN(0x{:x})", self.0)
    }
}

impl fmt::Display for FrameNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl From<u64> for FrameNumber {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}
