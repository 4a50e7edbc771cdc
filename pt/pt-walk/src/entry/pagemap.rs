use crate::entry::{EntryCodec, EntryFlags};
use crate::error::Error;
use crate::level::TranslationLevel;
use crate::resolve::Resolver;
use crate::walk::WalkResult;
use bitfield_struct::bitfield;
use pt_addresses::{FrameNumber, PageSize, VirtualAddress};

/// One record of `/proc/<pid>/pagemap`.
///
/// The userspace view of a leaf entry: either a frame number (present) or a
/// swap type and offset (swapped), plus status bits.
#[bitfield(u64)]
#[derive(Eq, PartialEq, Hash)]
pub struct PagemapEntry {
    /// Bits 0–54 — PFN if present; swap type (0–4) and offset (5–54) if
    /// swapped. Reads as zero without `CAP_SYS_ADMIN`.
    #[bits(55)]
    pub pfn: u64,

    /// Bit 55 — PTE is soft-dirty.
    pub soft_dirty: bool,

    /// Bit 56 — page is exclusively mapped.
    pub exclusive: bool,

    /// Bit 57 — PTE is userfaultfd write-protected.
    pub uffd_wp: bool,

    /// Bit 58 — guard region (`MADV_GUARD_INSTALL`).
    pub guard: bool,

    #[bits(2)]
    __r: u8,

    /// Bit 61 — file-backed page or shared anonymous.
    pub file: bool,

    /// Bit 62 — page is swapped.
    pub swap: bool,

    /// Bit 63 — page is present.
    pub present: bool,
}

impl PagemapEntry {
    /// All status bits (55–63).
    pub const FLAGS_MASK: u64 = 0x1FF << 55;

    /// Swap type of a swapped entry (bits 0–4).
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn swap_type(&self) -> u8 {
        (self.pfn() & 0x1F) as u8
    }

    /// Swap offset of a swapped entry (bits 5–54).
    #[inline]
    #[must_use]
    pub const fn swap_offset(&self) -> u64 {
        self.pfn() >> 5
    }

    /// Whether any status bit is set; a record without flags describes a
    /// page that was never touched.
    #[inline]
    #[must_use]
    pub const fn has_flags(&self) -> bool {
        self.into_bits() & Self::FLAGS_MASK != 0
    }

    /// Frame number of a present entry.
    #[inline]
    #[must_use]
    pub const fn frame(&self) -> Option<FrameNumber> {
        if self.present() {
            Some(FrameNumber::new(self.pfn()))
        } else {
            None
        }
    }

    #[must_use]
    pub fn flags(&self) -> EntryFlags {
        let mut flags = EntryFlags::empty();
        flags.set(EntryFlags::PRESENT, self.present());
        flags.set(EntryFlags::SWAP, self.swap());
        flags.set(EntryFlags::FILE, self.file());
        flags.set(EntryFlags::UFFD_WP, self.uffd_wp());
        flags.set(EntryFlags::EXCLUSIVE, self.exclusive());
        flags.set(EntryFlags::SOFT_DIRTY, self.soft_dirty());
        flags.set(EntryFlags::GUARD, self.guard());
        flags
    }
}

impl EntryCodec {
    /// Decode a pagemap record for `va` into the same result variants a walk
    /// produces at the leaf.
    ///
    /// # Errors
    /// [`Error::SentinelDecodeFailure`] for a record that claims to be both
    /// present and swapped.
    pub fn decode_pagemap(&self, entry: PagemapEntry, va: VirtualAddress) -> Result<WalkResult, Error> {
        let flags = entry.flags();
        match (entry.present(), entry.swap()) {
            (true, true) => Err(Error::SentinelDecodeFailure {
                what: "pagemap entry",
                value: entry.into_bits(),
            }),
            (true, false) => {
                let frame = FrameNumber::new(entry.pfn());
                Ok(WalkResult::Resolved {
                    physical_address: Resolver::physical_address(frame, PageSize::Size4K, va),
                    frame,
                    flags,
                })
            }
            (false, true) => Ok(WalkResult::Swapped {
                level: TranslationLevel::LEAF,
                swap_type: entry.swap_type(),
                swap_offset: entry.swap_offset(),
                flags,
            }),
            (false, false) => Ok(WalkResult::NotPresent {
                level: TranslationLevel::LEAF,
            }),
        }
    }
}
