use crate::entry::EntryFlags;
use crate::level::TranslationLevel;
use crate::walk::WalkResult;
use pt_addresses::{FrameNumber, PageSize, PhysicalAddress, VirtualAddress};

/// Where a swapped-out page lives.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SwapLocator {
    pub level: TranslationLevel,
    pub swap_type: u8,
    pub offset: u64,
    pub flags: EntryFlags,
}

/// Final answer for one virtual address.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Resolution {
    Physical {
        address: PhysicalAddress,
        /// The 4 KiB frame containing `address`; the key for per-frame
        /// status stores.
        frame: FrameNumber,
        size: PageSize,
    },
    Swap(SwapLocator),
    /// Not mapped; the walk stopped at this level.
    Absent(TranslationLevel),
}

impl Resolution {
    #[must_use]
    pub const fn frame(&self) -> Option<FrameNumber> {
        match self {
            Self::Physical { frame, .. } => Some(*frame),
            _ => None,
        }
    }
}

/// Turns terminal walk results into byte addresses or swap locators.
pub struct Resolver;

impl Resolver {
    /// `(frame.base & !(size - 1)) | (va & (size - 1))`.
    ///
    /// ```rust
    /// # use pt_walk::Resolver;
    /// # use pt_addresses::{FrameNumber, PageSize, VirtualAddress};
    /// let pa = Resolver::physical_address(
    ///     FrameNumber::new(0x40000),
    ///     PageSize::Size1G,
    ///     VirtualAddress::new(0x4012_3456),
    /// );
    /// assert_eq!(pa.as_u64(), 0x4012_3456);
    /// ```
    #[inline]
    #[must_use]
    pub const fn physical_address(
        frame: FrameNumber,
        size: PageSize,
        va: VirtualAddress,
    ) -> PhysicalAddress {
        frame.base().join(va, size)
    }

    #[must_use]
    pub const fn resolve(result: &WalkResult) -> Resolution {
        match *result {
            WalkResult::Resolved {
                physical_address, ..
            } => Resolution::Physical {
                address: physical_address,
                frame: physical_address.frame(),
                size: PageSize::Size4K,
            },
            WalkResult::Huge {
                physical_address,
                size,
                ..
            } => Resolution::Physical {
                address: physical_address,
                frame: physical_address.frame(),
                size,
            },
            WalkResult::Swapped {
                level,
                swap_type,
                swap_offset,
                flags,
            } => Resolution::Swap(SwapLocator {
                level,
                swap_type,
                offset: swap_offset,
                flags,
            }),
            WalkResult::NotPresent { level } => Resolution::Absent(level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn huge_offsets_use_the_huge_mask() {
        let va = VirtualAddress::new(0x7F12_3456_789A);
        let pa = Resolver::physical_address(FrameNumber::new(0x1_2400), PageSize::Size2M, va);
        assert_eq!(pa.as_u64(), 0x1240_0000 | (0x7F12_3456_789A & 0x1F_FFFF));
    }

    #[test]
    fn resolution_frame_is_the_containing_subpage() {
        let result = WalkResult::Huge {
            level: TranslationLevel::L2,
            physical_address: PhysicalAddress::new(0x4012_3456),
            frame: FrameNumber::new(0x40000),
            size: PageSize::Size1G,
            flags: EntryFlags::PRESENT | EntryFlags::HUGE,
        };
        let r = Resolver::resolve(&result);
        assert_eq!(r.frame(), Some(FrameNumber::new(0x40123)));
    }

    #[test]
    fn absence_and_swap() {
        assert_eq!(
            Resolver::resolve(&WalkResult::NotPresent {
                level: TranslationLevel::L3
            }),
            Resolution::Absent(TranslationLevel::L3)
        );
        let swapped = WalkResult::Swapped {
            level: TranslationLevel::L4,
            swap_type: 3,
            swap_offset: 500,
            flags: EntryFlags::SWAP,
        };
        assert!(matches!(
            Resolver::resolve(&swapped),
            Resolution::Swap(SwapLocator {
                swap_type: 3,
                offset: 500,
                ..
            })
        ));
    }
}
