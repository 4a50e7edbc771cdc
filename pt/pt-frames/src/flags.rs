use bitflags::bitflags;
use core::fmt;

bitflags! {
    /// `KPF_*` bits of a `/proc/kpageflags` record.
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
    pub struct PageFlags: u64 {
        const LOCKED = 1 << 0;
        const ERROR = 1 << 1;
        const REFERENCED = 1 << 2;
        const UPTODATE = 1 << 3;
        const DIRTY = 1 << 4;
        const LRU = 1 << 5;
        const ACTIVE = 1 << 6;
        const SLAB = 1 << 7;
        const WRITEBACK = 1 << 8;
        const RECLAIM = 1 << 9;
        const BUDDY = 1 << 10;
        const MMAP = 1 << 11;
        const ANON = 1 << 12;
        const SWAPCACHE = 1 << 13;
        const SWAPBACKED = 1 << 14;
        const COMPOUND_HEAD = 1 << 15;
        const COMPOUND_TAIL = 1 << 16;
        const HUGE = 1 << 17;
        const UNEVICTABLE = 1 << 18;
        const HWPOISON = 1 << 19;
        const NOPAGE = 1 << 20;
        const KSM = 1 << 21;
        const THP = 1 << 22;
        const BALLOON = 1 << 23;
        const ZERO_PAGE = 1 << 24;
        const IDLE = 1 << 25;
        const PGTABLE = 1 << 26;

        // Kernel-internal bits, exported for debugging only. Their meaning
        // follows the running kernel's source.
        const RESERVED = 1 << 32;
        const MLOCKED = 1 << 33;
        const MAPPEDTODISK = 1 << 34;
        const PRIVATE = 1 << 35;
        const PRIVATE_2 = 1 << 36;
        const OWNER_PRIVATE = 1 << 37;
        const ARCH = 1 << 38;
        const UNCACHED = 1 << 39;
        const SOFTDIRTY = 1 << 40;
        const ARCH_2 = 1 << 41;
    }
}

impl PageFlags {
    /// The documented, stable ABI bits (0–26).
    pub const STABLE: Self = Self::from_bits_retain((Self::PGTABLE.bits() << 1) - 1);

    /// The extended kernel-internal bits (32–41).
    pub const EXTENDED: Self = Self::from_bits_retain(
        ((Self::ARCH_2.bits() << 1) - 1) & !(Self::RESERVED.bits() - 1),
    );

    /// The flags of a raw record that should be shown: the stable set, plus
    /// the extended set if `extended` is given. Everything else is dropped.
    #[must_use]
    pub const fn visible(raw: u64, extended: bool) -> Self {
        let mask = if extended {
            Self::STABLE.bits() | Self::EXTENDED.bits()
        } else {
            Self::STABLE.bits()
        };
        Self::from_bits_truncate(raw & mask)
    }
}

impl fmt::Display for PageFlags {
    /// Flag names with leading spaces; extended flags follow a `hack:` marker.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str(" no known flags set");
        }

        for (name, _) in self.intersection(Self::STABLE).iter_names() {
            write!(f, " {name}")?;
        }

        let extended = self.intersection(Self::EXTENDED);
        if !extended.is_empty() {
            f.write_str(if self.intersects(Self::STABLE) {
                " | hack:"
            } else {
                " hack:"
            })?;
            for (name, _) in extended.iter_names() {
                write!(f, " {name}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_cover_documented_ranges() {
        assert_eq!(PageFlags::STABLE.bits(), 0x07FF_FFFF);
        assert_eq!(PageFlags::EXTENDED.bits(), 0x03FF_0000_0000);
        assert!(!PageFlags::STABLE.intersects(PageFlags::EXTENDED));
    }

    #[test]
    fn extended_bits_need_opt_in() {
        let raw = (PageFlags::LRU | PageFlags::MLOCKED).bits() | 1 << 50;
        assert_eq!(PageFlags::visible(raw, false), PageFlags::LRU);
        assert_eq!(
            PageFlags::visible(raw, true),
            PageFlags::LRU | PageFlags::MLOCKED
        );
    }

    #[test]
    fn display_separates_extended_flags() {
        assert_eq!(
            (PageFlags::ACTIVE | PageFlags::LRU).to_string(),
            " LRU ACTIVE"
        );
        assert_eq!(
            (PageFlags::ANON | PageFlags::PRIVATE).to_string(),
            " ANON | hack: PRIVATE"
        );
        assert_eq!(PageFlags::RESERVED.to_string(), " hack: RESERVED");
        assert_eq!(PageFlags::empty().to_string(), " no known flags set");
    }
}
