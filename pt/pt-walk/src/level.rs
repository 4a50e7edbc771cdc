//! Translation levels and virtual-address index decomposition.

use core::fmt;
use pt_addresses::{PAGE_SHIFT, PageSize, VirtualAddress};

/// Number of index bits per level (512 entries per table).
pub const INDEX_BITS: u32 = 9;

/// Entries per translation table.
pub const ENTRIES_PER_TABLE: u64 = 1 << INDEX_BITS;

/// One stage of the translation hierarchy, top (`L0`) to leaf (`L4`).
///
/// | Level | Linux | Intel  | Shift | Huge page |
/// |-------|-------|--------|-------|-----------|
/// | `L0`  | pgd   | PML5E  | 48    | –         |
/// | `L1`  | p4d   | PML4E  | 39    | –         |
/// | `L2`  | pud   | PDPTE  | 30    | 1 GiB     |
/// | `L3`  | pmd   | PDE    | 21    | 2 MiB     |
/// | `L4`  | pte   | PTE    | 12    | (4 KiB)   |
///
/// With 4-level paging `L0` doesn't exist and `L1` is the root; Linux calls
/// that root `pgd` and folds the p4d into it, see [`TranslationLevel::name`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum TranslationLevel {
    L0,
    L1,
    L2,
    L3,
    L4,
}

impl TranslationLevel {
    pub const ALL: [Self; 5] = [Self::L0, Self::L1, Self::L2, Self::L3, Self::L4];

    /// The level holding 4 KiB page entries.
    pub const LEAF: Self = Self::L4;

    #[inline]
    #[must_use]
    pub const fn depth(self) -> usize {
        self as usize
    }

    /// Position of the lowest virtual-address bit this level indexes with.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn shift(self) -> u32 {
        PAGE_SHIFT + INDEX_BITS * (Self::LEAF.depth() - self.depth()) as u32
    }

    /// `index(level) = (addr >> shift(level)) & (entries_per_table - 1)`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn index_of(self, va: VirtualAddress) -> u16 {
        ((va.as_u64() >> self.shift()) & (ENTRIES_PER_TABLE - 1)) as u16
    }

    #[inline]
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::L0 => Some(Self::L1),
            Self::L1 => Some(Self::L2),
            Self::L2 => Some(Self::L3),
            Self::L3 => Some(Self::L4),
            Self::L4 => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_leaf(self) -> bool {
        matches!(self, Self::L4)
    }

    /// Size of the region one entry at this level maps when it terminates
    /// the walk. `None` for levels that can only point to tables.
    #[inline]
    #[must_use]
    pub const fn page_size(self) -> Option<PageSize> {
        match self {
            Self::L0 | Self::L1 => None,
            Self::L2 => Some(PageSize::Size1G),
            Self::L3 => Some(PageSize::Size2M),
            Self::L4 => Some(PageSize::Size4K),
        }
    }

    /// Whether an entry at this level may map a huge page (`PS=1`).
    #[inline]
    #[must_use]
    pub const fn supports_huge(self) -> bool {
        matches!(self, Self::L2 | Self::L3)
    }

    #[must_use]
    pub const fn linux_name(self) -> &'static str {
        match self {
            Self::L0 => "pgd",
            Self::L1 => "p4d",
            Self::L2 => "pud",
            Self::L3 => "pmd",
            Self::L4 => "pte",
        }
    }

    #[must_use]
    pub const fn intel_name(self) -> &'static str {
        match self {
            Self::L0 => "PML5E",
            Self::L1 => "PML4E",
            Self::L2 => "PDPTE",
            Self::L3 => "PDE",
            Self::L4 => "PTE",
        }
    }

    /// Display name under the given layout: the 4-level root is `pgd`.
    #[must_use]
    pub const fn name(self, levels: LevelCount) -> &'static str {
        if matches!(levels, LevelCount::Four) && matches!(self, Self::L1) {
            "pgd"
        } else {
            self.linux_name()
        }
    }
}

impl fmt::Display for TranslationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.linux_name())
    }
}

/// Depth of the active paging layout.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum LevelCount {
    /// 4-level paging, 48-bit virtual addresses.
    #[default]
    Four,
    /// 5-level paging (`CR4.LA57`), 57-bit virtual addresses.
    Five,
}

impl LevelCount {
    #[inline]
    #[must_use]
    pub const fn from_five_level(la57: bool) -> Self {
        if la57 { Self::Five } else { Self::Four }
    }

    /// The level the walk starts at.
    #[inline]
    #[must_use]
    pub const fn top(self) -> TranslationLevel {
        match self {
            Self::Four => TranslationLevel::L1,
            Self::Five => TranslationLevel::L0,
        }
    }

    #[inline]
    #[must_use]
    pub const fn count(self) -> usize {
        match self {
            Self::Four => 4,
            Self::Five => 5,
        }
    }

    /// Number of translated virtual-address bits.
    #[inline]
    #[must_use]
    pub const fn address_width(self) -> u32 {
        self.top().shift() + INDEX_BITS
    }

    /// Whether `level` takes part in walks under this layout.
    #[inline]
    #[must_use]
    pub const fn contains(self, level: TranslationLevel) -> bool {
        level.depth() >= self.top().depth()
    }

    /// Active levels, top to leaf.
    pub fn levels(self) -> impl DoubleEndedIterator<Item = TranslationLevel> + Clone {
        TranslationLevel::ALL
            .into_iter()
            .skip(self.top().depth())
    }
}

impl fmt::Display for LevelCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-level", self.count())
    }
}

/// A virtual address split into one table index per active level plus the
/// 4 KiB page offset.
///
/// ```rust
/// # use pt_walk::{IndexSplit, LevelCount, TranslationLevel};
/// # use pt_addresses::VirtualAddress;
/// let va = VirtualAddress::new(0x0000_7FFF_DEAD_B123);
/// let split = IndexSplit::decompose(va, LevelCount::Four);
/// assert_eq!(split.index(TranslationLevel::L0), None);
/// assert_eq!(split.index(TranslationLevel::L1), Some(0xFF));
/// assert_eq!(split.offset(), 0x123);
/// assert_eq!(split.reconstruct(), va);
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct IndexSplit {
    levels: LevelCount,
    indices: [u16; 5],
    offset: u16,
}

impl IndexSplit {
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn decompose(va: VirtualAddress, levels: LevelCount) -> Self {
        let mut indices = [0; 5];
        for level in levels.levels() {
            indices[level.depth()] = level.index_of(va);
        }
        Self {
            levels,
            indices,
            offset: va.page_offset(PageSize::Size4K) as u16,
        }
    }

    #[inline]
    #[must_use]
    pub const fn levels(&self) -> LevelCount {
        self.levels
    }

    /// The index for `level`, or `None` if the level isn't part of the layout.
    #[inline]
    #[must_use]
    pub const fn index(&self, level: TranslationLevel) -> Option<u16> {
        if self.levels.contains(level) {
            Some(self.indices[level.depth()])
        } else {
            None
        }
    }

    #[inline]
    #[must_use]
    pub const fn offset(&self) -> u16 {
        self.offset
    }

    /// Reassemble the canonical address the indices and offset describe.
    #[must_use]
    pub fn reconstruct(&self) -> VirtualAddress {
        let raw = self
            .levels
            .levels()
            .fold(u64::from(self.offset), |acc, level| {
                acc | (u64::from(self.indices[level.depth()]) << level.shift())
            });
        VirtualAddress::new(raw).canonicalize(self.levels.address_width())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn shifts_are_strictly_decreasing() {
        let shifts: Vec<u32> = TranslationLevel::ALL.iter().map(|l| l.shift()).collect();
        assert_eq!(shifts, [48, 39, 30, 21, 12]);
    }

    #[test]
    fn widths() {
        assert_eq!(LevelCount::Four.address_width(), 48);
        assert_eq!(LevelCount::Five.address_width(), 57);
        assert_eq!(LevelCount::Four.levels().count(), 4);
        assert_eq!(LevelCount::Five.levels().next(), Some(TranslationLevel::L0));
    }

    #[test]
    fn names_follow_layout() {
        assert_eq!(TranslationLevel::L1.name(LevelCount::Four), "pgd");
        assert_eq!(TranslationLevel::L1.name(LevelCount::Five), "p4d");
        assert_eq!(TranslationLevel::L0.name(LevelCount::Five), "pgd");
        assert_eq!(TranslationLevel::L3.intel_name(), "PDE");
    }

    #[test]
    fn index_extraction() {
        let va = VirtualAddress::new(0xFFFF_FFFF_8010_2345);
        assert_eq!(TranslationLevel::L1.index_of(va), 0x1FF);
        assert_eq!(TranslationLevel::L2.index_of(va), 0x1FE);
        assert_eq!(TranslationLevel::L3.index_of(va), 0x000);
        assert_eq!(TranslationLevel::L4.index_of(va), 0x102);
    }

    proptest! {
        #[test]
        fn decomposition_round_trips(raw in any::<u64>(), five in any::<bool>()) {
            let levels = LevelCount::from_five_level(five);
            let width = levels.address_width();
            let va = VirtualAddress::new(raw);
            let back = IndexSplit::decompose(va, levels).reconstruct();
            prop_assert_eq!(back.truncate(width), va.truncate(width));
            if va.is_canonical(width) {
                prop_assert_eq!(back, va);
            }
        }
    }
}
