use core::fmt;

/// Supported x86-64 page sizes.
///
/// These correspond to the PS (Page Size) bit usage in PDE/PDPTE.
/// 4 KiB pages are mapped through the PT level; 2 MiB and 1 GiB are
/// "huge pages" that terminate early at PD or PDPT.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum PageSize {
    /// 4 KiB page mapped by a PTE (PT leaf).
    Size4K,
    /// 2 MiB page mapped by a PDE with `PS=1` (PD leaf).
    Size2M,
    /// 1 GiB page mapped by a PDPTE with `PS=1` (PDPT leaf).
    Size1G,
}

impl PageSize {
    /// log2 of the page size, i.e. the number of low address bits used as
    /// in-page offset.
    #[inline]
    #[must_use]
    pub const fn shift(self) -> u32 {
        match self {
            Self::Size4K => 12,
            Self::Size2M => 21,
            Self::Size1G => 30,
        }
    }

    /// Page size in bytes.
    #[inline]
    #[must_use]
    pub const fn size(self) -> u64 {
        1 << self.shift()
    }

    /// Mask selecting the in-page offset bits (`size - 1`).
    #[inline]
    #[must_use]
    pub const fn offset_mask(self) -> u64 {
        self.size() - 1
    }

    /// Mask selecting the page base bits (`!(size - 1)`).
    #[inline]
    #[must_use]
    pub const fn base_mask(self) -> u64 {
        !self.offset_mask()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Size4K => "4K",
            Self::Size2M => "2M",
            Self::Size1G => "1G",
        }
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
