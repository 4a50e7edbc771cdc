//! # Entry Codec
//!
//! Turns one raw 64-bit translation entry into a level-aware
//! [`DecodedEntry`]. Decoding is pure and never fails: patterns the codec
//! can't fully interpret come back as [`EntryKind::Malformed`] with every
//! flag cleared.
//!
//! ## Presence
//!
//! Three notions of "present" coexist and are kept apart:
//!
//! | Notion | Meaning |
//! |--------|---------|
//! | none | nothing but (possibly) `A`/`D` set; the slot is empty |
//! | logically present | the kernel considers the mapping live, see [`EntryLayout::presence`](crate::EntryLayout::presence) |
//! | hardware present | bit 0 set; the MMU will use the entry |
//!
//! A logically present entry without the hardware bit is a `PROT_NONE`
//! mapping. Its frame bits are stored inverted; undo that with the
//! [`Inverter`](crate::Inverter) before decoding.
//!
//! ## Bit 8
//!
//! Bit 8 is `G` (global) while the entry is hardware-present and `PROT_NONE`
//! otherwise. The codec reports it through both
//! [`DecodedEntry::global`] and [`DecodedEntry::prot_none`] and leaves the
//! choice to the caller.

mod pagemap;
mod swap;

pub use crate::entry::pagemap::PagemapEntry;
pub use crate::entry::swap::SwapEntry;
use crate::level::TranslationLevel;
use crate::profile::ArchProfile;
use bitflags::bitflags;
use core::fmt;
use pt_addresses::{FrameNumber, PAGE_SHIFT, PageSize, PhysicalAddress};

/// A translation entry exactly as read from a table.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct RawEntry(u64);

impl RawEntry {
    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for RawEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawEntry(0x{:016x})", self.0)
    }
}

impl fmt::Display for RawEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::LowerHex for RawEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl From<u64> for RawEntry {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}

bitflags! {
    /// Semantic status of an entry, independent of where the bits live.
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
    pub struct EntryFlags: u32 {
        /// Logically present.
        const PRESENT = 1 << 0;
        const WRITABLE = 1 << 1;
        const USER = 1 << 2;
        const WRITE_THROUGH = 1 << 3;
        const CACHE_DISABLE = 1 << 4;
        const ACCESSED = 1 << 5;
        const DIRTY = 1 << 6;
        /// Terminal mapping above the leaf level.
        const HUGE = 1 << 7;
        const PAT = 1 << 8;
        const NO_EXECUTE = 1 << 9;
        const SOFT_DIRTY = 1 << 10;
        const UFFD_WP = 1 << 11;
        /// Exclusively mapped (swap and pagemap entries).
        const EXCLUSIVE = 1 << 12;
        /// File-backed or shared anonymous (pagemap entries).
        const FILE = 1 << 13;
        /// Contents live in swap.
        const SWAP = 1 << 14;
        /// Guard region (pagemap entries).
        const GUARD = 1 << 15;
    }
}

/// What an entry points at.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum EntryKind {
    /// Empty slot.
    None,
    /// Next-level table.
    Table,
    /// Huge page terminating the walk above the leaf.
    Huge(PageSize),
    /// 4 KiB page at the leaf.
    Page,
    /// Not present; may still encode a swap entry.
    NotPresent,
    /// A pattern the codec refuses to interpret.
    Malformed,
}

/// Level-aware view of a [`RawEntry`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DecodedEntry {
    raw: RawEntry,
    level: TranslationLevel,
    kind: EntryKind,
    flags: EntryFlags,
    hw_present: bool,
    bit8: bool,
    pkey: Option<u8>,
    frame: Option<FrameNumber>,
}

impl DecodedEntry {
    const fn blank(raw: RawEntry, level: TranslationLevel, kind: EntryKind) -> Self {
        Self {
            raw,
            level,
            kind,
            flags: EntryFlags::empty(),
            hw_present: false,
            bit8: false,
            pkey: None,
            frame: None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn raw(&self) -> RawEntry {
        self.raw
    }

    #[inline]
    #[must_use]
    pub const fn level(&self) -> TranslationLevel {
        self.level
    }

    #[inline]
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub const fn flags(&self) -> EntryFlags {
        self.flags
    }

    /// Logically present (includes `PROT_NONE` where the level honours it).
    #[inline]
    #[must_use]
    pub const fn present(&self) -> bool {
        self.flags.contains(EntryFlags::PRESENT)
    }

    /// The hardware present bit.
    #[inline]
    #[must_use]
    pub const fn hw_present(&self) -> bool {
        self.hw_present
    }

    #[inline]
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self.kind, EntryKind::None)
    }

    #[inline]
    #[must_use]
    pub const fn writable(&self) -> bool {
        self.flags.contains(EntryFlags::WRITABLE)
    }

    #[inline]
    #[must_use]
    pub const fn user(&self) -> bool {
        self.flags.contains(EntryFlags::USER)
    }

    #[inline]
    #[must_use]
    pub const fn accessed(&self) -> bool {
        self.flags.contains(EntryFlags::ACCESSED)
    }

    #[inline]
    #[must_use]
    pub const fn dirty(&self) -> bool {
        self.flags.contains(EntryFlags::DIRTY)
    }

    #[inline]
    #[must_use]
    pub const fn executable(&self) -> bool {
        self.present() && !self.flags.contains(EntryFlags::NO_EXECUTE)
    }

    #[inline]
    #[must_use]
    pub const fn huge(&self) -> bool {
        self.flags.contains(EntryFlags::HUGE)
    }

    #[inline]
    #[must_use]
    pub const fn pat(&self) -> bool {
        self.flags.contains(EntryFlags::PAT)
    }

    /// Bit 8 read as `G`. Meaningful when [`hw_present`](Self::hw_present).
    #[inline]
    #[must_use]
    pub const fn global(&self) -> bool {
        self.bit8
    }

    /// Bit 8 read as `PROT_NONE`. Meaningful when not hardware-present.
    #[inline]
    #[must_use]
    pub const fn prot_none(&self) -> bool {
        self.bit8
    }

    /// Protection key, when the profile enables keys and the entry maps a page.
    #[inline]
    #[must_use]
    pub const fn pkey(&self) -> Option<u8> {
        self.pkey
    }

    /// Frame number (4 KiB units); only set for present entries.
    #[inline]
    #[must_use]
    pub const fn frame(&self) -> Option<FrameNumber> {
        self.frame
    }

    /// Physical base of the next-level table, for [`EntryKind::Table`].
    #[inline]
    #[must_use]
    pub const fn next_table(&self) -> Option<PhysicalAddress> {
        match (self.kind, self.frame) {
            (EntryKind::Table, Some(frame)) => Some(frame.base()),
            _ => None,
        }
    }

    /// Frame and size of the page this entry maps, if it maps one.
    #[inline]
    #[must_use]
    pub const fn mapping(&self) -> Option<(FrameNumber, PageSize)> {
        match (self.kind, self.frame) {
            (EntryKind::Huge(size), Some(frame)) => Some((frame, size)),
            (EntryKind::Page, Some(frame)) => Some((frame, PageSize::Size4K)),
            _ => None,
        }
    }
}

/// Decoder for translation entries of one architecture profile.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct EntryCodec {
    profile: ArchProfile,
}

impl EntryCodec {
    #[must_use]
    pub const fn new(profile: ArchProfile) -> Self {
        Self { profile }
    }

    #[inline]
    #[must_use]
    pub const fn profile(&self) -> &ArchProfile {
        &self.profile
    }

    /// Whether the slot is empty, ignoring spuriously set `A`/`D` bits.
    #[inline]
    #[must_use]
    pub const fn is_none(&self, raw: RawEntry) -> bool {
        raw.as_u64() & !self.profile.entry.none_ignored() == 0
    }

    /// Whether the entry is logically present at `level`.
    #[inline]
    #[must_use]
    pub const fn is_present(&self, raw: RawEntry, level: TranslationLevel) -> bool {
        raw.as_u64() & self.profile.entry.presence(level) != 0
    }

    /// Decode `raw` as an entry at `level`.
    ///
    /// `raw` must already be un-inverted.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn decode(&self, raw: RawEntry, level: TranslationLevel) -> DecodedEntry {
        let l = &self.profile.entry;
        let v = raw.as_u64();

        if self.is_none(raw) {
            return DecodedEntry::blank(raw, level, EntryKind::None);
        }
        if !self.is_present(raw, level) {
            return DecodedEntry::blank(raw, level, EntryKind::NotPresent);
        }

        let malformed = DecodedEntry::blank(raw, level, EntryKind::Malformed);
        let ps = v & l.huge != 0;
        let kind = match (level.page_size(), ps) {
            (None, true) => return malformed,
            (None, false) => EntryKind::Table,
            (Some(PageSize::Size4K), _) => EntryKind::Page,
            (Some(size), true) => {
                if v & l.huge_reserved(size) != 0 {
                    return malformed;
                }
                EntryKind::Huge(size)
            }
            (Some(_), false) => EntryKind::Table,
        };
        if !self.profile.no_execute && v & l.no_execute != 0 {
            return malformed;
        }

        let bit = |mask: u64| v & mask != 0;
        let mut flags = EntryFlags::PRESENT;
        flags.set(EntryFlags::WRITABLE, bit(l.writable));
        flags.set(EntryFlags::USER, bit(l.user));
        flags.set(EntryFlags::WRITE_THROUGH, bit(l.write_through));
        flags.set(EntryFlags::CACHE_DISABLE, bit(l.cache_disable));
        flags.set(EntryFlags::ACCESSED, bit(l.accessed));
        flags.set(EntryFlags::NO_EXECUTE, self.profile.no_execute && bit(l.no_execute));

        let maps_page = matches!(kind, EntryKind::Huge(_) | EntryKind::Page);
        if maps_page {
            flags.set(EntryFlags::DIRTY, bit(l.dirty));
            flags.set(EntryFlags::SOFT_DIRTY, bit(l.soft_dirty));
            flags.set(EntryFlags::UFFD_WP, bit(l.uffd_wp));
            flags.set(EntryFlags::HUGE, matches!(kind, EntryKind::Huge(_)));
        }
        let pat = match kind {
            EntryKind::Huge(_) => bit(l.pat_large),
            EntryKind::Page => bit(l.pat),
            _ => false,
        };
        flags.set(EntryFlags::PAT, pat);

        let frame_mask = match kind {
            EntryKind::Huge(size) => l.frame_mask_for(size),
            _ => l.frame_mask,
        };
        let pkey = (maps_page && self.profile.protection_keys)
            .then(|| ((v & l.pkey_mask) >> l.pkey_shift) as u8);

        DecodedEntry {
            raw,
            level,
            kind,
            flags,
            hw_present: bit(l.present),
            bit8: bit(l.global),
            pkey,
            frame: Some(FrameNumber::new((v & frame_mask) >> PAGE_SHIFT)),
        }
    }
}
