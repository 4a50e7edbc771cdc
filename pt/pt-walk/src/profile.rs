//! Architecture profile: every bit position the walker interprets.
//!
//! The profile is resolved once, from the control registers, when an
//! address space is opened and then threaded through the codec and the
//! engine. Nothing else in the crate hard-codes entry bits.

use crate::error::Error;
use crate::level::{ENTRIES_PER_TABLE, INDEX_BITS, LevelCount, TranslationLevel};
use pt_addresses::{PAGE_SHIFT, PageSize};
use pt_registers::{ControlRegisters, PagingMode, UnsupportedMode};

/// Bit masks of a translation-table entry.
///
/// Table, huge and leaf entries share one layout; the codec picks `pat`
/// (bit 7) for 4 KiB leaves and `pat_large` (bit 12) for huge entries, where
/// bit 7 is the page-size bit instead.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct EntryLayout {
    pub present: u64,
    pub writable: u64,
    pub user: u64,
    pub write_through: u64,
    pub cache_disable: u64,
    pub accessed: u64,
    pub dirty: u64,
    /// `PS`: huge page at the pud/pmd levels.
    pub huge: u64,
    /// PAT index bit of 4 KiB leaves.
    pub pat: u64,
    /// PAT index bit of huge entries.
    pub pat_large: u64,
    /// `G` when hardware-present, `PROT_NONE` otherwise.
    pub global: u64,
    pub uffd_wp: u64,
    pub soft_dirty: u64,
    pub no_execute: u64,
    pub pkey_shift: u32,
    pub pkey_mask: u64,
    /// Physical frame bits of table and 4 KiB entries (`PTE_PFN_MASK`).
    pub frame_mask: u64,
}

impl EntryLayout {
    pub const X86_64: Self = Self {
        present: 1 << 0,
        writable: 1 << 1,
        user: 1 << 2,
        write_through: 1 << 3,
        cache_disable: 1 << 4,
        accessed: 1 << 5,
        dirty: 1 << 6,
        huge: 1 << 7,
        pat: 1 << 7,
        pat_large: 1 << 12,
        global: 1 << 8,
        uffd_wp: 1 << 10,
        soft_dirty: 1 << 11,
        no_execute: 1 << 63,
        pkey_shift: 59,
        pkey_mask: 0xF << 59,
        frame_mask: 0x000F_FFFF_FFFF_F000,
    };

    /// The same bit as [`EntryLayout::global`], read while not present.
    #[inline]
    #[must_use]
    pub const fn prot_none(&self) -> u64 {
        self.global
    }

    /// Bits hardware may set spuriously in an otherwise empty entry
    /// (Knights Landing erratum); an entry is "none" if nothing else is set.
    #[inline]
    #[must_use]
    pub const fn none_ignored(&self) -> u64 {
        self.accessed | self.dirty
    }

    /// Bits that make an entry logically present at `level`.
    ///
    /// Only the leaf and the pmd honour `PROT_NONE`; the pmd additionally
    /// counts `PS` so huge pmds stay present while hardware-invalid. The
    /// upper levels look at the hardware present bit alone.
    #[inline]
    #[must_use]
    pub const fn presence(&self, level: TranslationLevel) -> u64 {
        match level {
            TranslationLevel::L4 => self.present | self.prot_none(),
            TranslationLevel::L3 => self.present | self.prot_none() | self.huge,
            TranslationLevel::L0 | TranslationLevel::L1 | TranslationLevel::L2 => self.present,
        }
    }

    /// Frame bits of an entry that maps a page of `size`.
    #[inline]
    #[must_use]
    pub const fn frame_mask_for(&self, size: PageSize) -> u64 {
        self.frame_mask & size.base_mask()
    }

    /// Bits between the 4 KiB frame boundary and a huge frame boundary that
    /// must be zero, except for `pat_large`.
    #[inline]
    #[must_use]
    pub const fn huge_reserved(&self, size: PageSize) -> u64 {
        (self.frame_mask & !self.frame_mask_for(size)) & !self.pat_large
    }
}

/// Layout of a swap entry stored in a non-present, non-"none" entry.
///
/// The type sits in the top `type_bits`; the offset starts at
/// `offset_first_bit` and runs up to the type. With `offset_inverted` the
/// offset is stored complemented, as x86-64 Linux does.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SwapLayout {
    pub type_bits: u32,
    pub offset_first_bit: u32,
    pub offset_inverted: bool,
    pub soft_dirty: u64,
    pub uffd_wp: u64,
    pub exclusive: u64,
}

impl SwapLayout {
    pub const X86_64: Self = Self {
        type_bits: 5,
        offset_first_bit: 9,
        offset_inverted: true,
        soft_dirty: 1 << 1,
        uffd_wp: 1 << 2,
        exclusive: 1 << 3,
    };

    #[inline]
    #[must_use]
    pub const fn offset_bits(&self) -> u32 {
        64 - self.type_bits - self.offset_first_bit
    }
}

/// Everything the codec and engine need to know about the platform.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ArchProfile {
    pub levels: LevelCount,
    pub entry: EntryLayout,
    pub swap: SwapLayout,
    /// Entry bits 59–62 carry a protection key (`CR4.PKE`).
    pub protection_keys: bool,
    /// Bit 63 is no-execute (`EFER.NXE`); reserved otherwise.
    pub no_execute: bool,
    /// Non-present pmd entries may hold swap/migration entries.
    pub pmd_swap: bool,
}

impl ArchProfile {
    #[must_use]
    pub const fn x86_64(mode: PagingMode) -> Self {
        Self {
            levels: LevelCount::from_five_level(mode.five_level),
            entry: EntryLayout::X86_64,
            swap: SwapLayout::X86_64,
            protection_keys: mode.protection_keys,
            no_execute: mode.no_execute,
            pmd_swap: true,
        }
    }

    pub const X86_64_4LEVEL: Self = Self::x86_64(PagingMode::FOUR_LEVEL);
    pub const X86_64_5LEVEL: Self = Self::x86_64(PagingMode::FIVE_LEVEL);

    /// Resolve the profile from a register snapshot.
    ///
    /// # Errors
    /// [`UnsupportedMode`] if the CPU isn't using IA-32e paging.
    pub const fn from_registers(regs: &ControlRegisters) -> Result<Self, UnsupportedMode> {
        match regs.paging_mode() {
            Ok(mode) => Ok(Self::x86_64(mode)),
            Err(e) => Err(e),
        }
    }

    #[must_use]
    pub const fn with_protection_keys(mut self, enabled: bool) -> Self {
        self.protection_keys = enabled;
        self
    }

    #[inline]
    #[must_use]
    pub const fn address_width(&self) -> u32 {
        self.levels.address_width()
    }

    /// Whether a non-present entry at `level` can encode a swap entry.
    #[inline]
    #[must_use]
    pub const fn supports_swap_at(&self, level: TranslationLevel) -> bool {
        match level {
            TranslationLevel::L4 => true,
            TranslationLevel::L3 => self.pmd_swap,
            _ => false,
        }
    }
}

impl Default for ArchProfile {
    fn default() -> Self {
        Self::X86_64_4LEVEL
    }
}

/// Linux-style layout constants, the "dump" view of a profile.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct LayoutConstants {
    pub pgdir_shift: u32,
    pub p4d_shift: u32,
    pub pud_shift: u32,
    pub pmd_shift: u32,
    pub page_shift: u32,
    pub ptrs_per_pgd: u64,
    pub ptrs_per_p4d: u64,
    pub ptrs_per_pud: u64,
    pub ptrs_per_pmd: u64,
    pub ptrs_per_pte: u64,
    pub pgdir_mask: u64,
    pub p4d_mask: u64,
    pub pud_mask: u64,
    pub pmd_mask: u64,
    pub page_mask: u64,
    pub pte_pfn_mask: u64,
    pub page_offset: u64,
}

const fn shift_mask(shift: u32) -> u64 {
    !((1 << shift) - 1)
}

impl LayoutConstants {
    /// Base of the direct map of all physical memory (no KASLR).
    pub const PAGE_OFFSET_4LEVEL: u64 = 0xFFFF_8880_0000_0000;
    pub const PAGE_OFFSET_5LEVEL: u64 = 0xFF11_0000_0000_0000;

    #[must_use]
    pub const fn for_profile(profile: &ArchProfile) -> Self {
        let five = matches!(profile.levels, LevelCount::Five);
        let pgdir_shift = profile.levels.top().shift();
        let p4d_shift = TranslationLevel::L1.shift();
        let pud_shift = TranslationLevel::L2.shift();
        let pmd_shift = TranslationLevel::L3.shift();
        Self {
            pgdir_shift,
            p4d_shift,
            pud_shift,
            pmd_shift,
            page_shift: PAGE_SHIFT,
            ptrs_per_pgd: ENTRIES_PER_TABLE,
            ptrs_per_p4d: if five { ENTRIES_PER_TABLE } else { 1 },
            ptrs_per_pud: ENTRIES_PER_TABLE,
            ptrs_per_pmd: ENTRIES_PER_TABLE,
            ptrs_per_pte: ENTRIES_PER_TABLE,
            pgdir_mask: shift_mask(pgdir_shift),
            p4d_mask: shift_mask(p4d_shift),
            pud_mask: shift_mask(pud_shift),
            pmd_mask: shift_mask(pmd_shift),
            page_mask: shift_mask(PAGE_SHIFT),
            pte_pfn_mask: profile.entry.frame_mask,
            page_offset: if five {
                Self::PAGE_OFFSET_5LEVEL
            } else {
                Self::PAGE_OFFSET_4LEVEL
            },
        }
    }

    /// Check that the index fields are strictly decreasing, don't overlap
    /// and agree with the masks.
    ///
    /// A folded p4d (`PTRS_PER_P4D == 1`) contributes no index bits and is
    /// skipped.
    ///
    /// # Errors
    /// [`Error::SentinelDecodeFailure`] naming the first inconsistent value.
    pub fn validate(&self) -> Result<(), Error> {
        let fields = [
            ("PGDIR_SHIFT", self.pgdir_shift, self.ptrs_per_pgd, self.pgdir_mask),
            ("P4D_SHIFT", self.p4d_shift, self.ptrs_per_p4d, self.p4d_mask),
            ("PUD_SHIFT", self.pud_shift, self.ptrs_per_pud, self.pud_mask),
            ("PMD_SHIFT", self.pmd_shift, self.ptrs_per_pmd, self.pmd_mask),
            ("PAGE_SHIFT", self.page_shift, self.ptrs_per_pte, self.page_mask),
        ];

        let mut upper: Option<u32> = None;
        for (what, shift, ptrs, mask) in fields {
            if shift >= 64 || mask != shift_mask(shift) {
                return Err(Error::SentinelDecodeFailure {
                    what,
                    value: u64::from(shift),
                });
            }
            if !ptrs.is_power_of_two() {
                return Err(Error::SentinelDecodeFailure { what, value: ptrs });
            }
            if ptrs == 1 {
                continue;
            }

            let bits = ptrs.trailing_zeros();
            if let Some(upper) = upper
                && (shift >= upper || shift + bits > upper)
            {
                return Err(Error::SentinelDecodeFailure {
                    what,
                    value: u64::from(shift),
                });
            }
            upper = Some(shift);
        }

        if upper != Some(self.page_shift) || self.pte_pfn_mask & !self.page_mask != 0 {
            return Err(Error::SentinelDecodeFailure {
                what: "PTE_PFN_MASK",
                value: self.pte_pfn_mask,
            });
        }
        Ok(())
    }

    /// Virtual-address bits covered by the top-level index.
    #[must_use]
    pub const fn address_width(&self) -> u32 {
        self.pgdir_shift + INDEX_BITS
    }
}
