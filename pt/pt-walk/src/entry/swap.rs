use crate::entry::{EntryCodec, EntryFlags, RawEntry};
use crate::level::TranslationLevel;

/// A swap entry decoded from a non-present translation entry.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SwapEntry {
    pub swap_type: u8,
    pub offset: u64,
    /// [`EntryFlags::SWAP`] plus any of `SOFT_DIRTY`, `UFFD_WP`, `EXCLUSIVE`.
    pub flags: EntryFlags,
}

impl EntryCodec {
    /// Decode `raw` as a swap entry at `level`.
    ///
    /// Returns `None` when the entry is "none", logically present, or sits
    /// at a level whose non-present entries don't carry swap entries.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn decode_swap(&self, raw: RawEntry, level: TranslationLevel) -> Option<SwapEntry> {
        let profile = self.profile();
        if !profile.supports_swap_at(level) || self.is_none(raw) || self.is_present(raw, level) {
            return None;
        }

        let s = &profile.swap;
        let v = raw.as_u64();
        let swap_type = (v >> (64 - s.type_bits)) as u8;
        let stored = if s.offset_inverted { !v } else { v };
        let offset = (stored << s.type_bits) >> (s.type_bits + s.offset_first_bit);

        let mut flags = EntryFlags::SWAP;
        flags.set(EntryFlags::SOFT_DIRTY, v & s.soft_dirty != 0);
        flags.set(EntryFlags::UFFD_WP, v & s.uffd_wp != 0);
        flags.set(EntryFlags::EXCLUSIVE, v & s.exclusive != 0);

        Some(SwapEntry {
            swap_type,
            offset,
            flags,
        })
    }

    /// Build the raw entry for a swap location, the inverse of
    /// [`EntryCodec::decode_swap`].
    ///
    /// `swap_type` and `offset` are truncated to their field widths.
    #[must_use]
    pub fn encode_swap(&self, swap_type: u8, offset: u64, flags: EntryFlags) -> RawEntry {
        let s = &self.profile().swap;
        let stored = if s.offset_inverted { !offset } else { offset };
        let mut v = (stored << (s.type_bits + s.offset_first_bit)) >> s.type_bits;
        v |= u64::from(swap_type) << (64 - s.type_bits);
        if flags.contains(EntryFlags::SOFT_DIRTY) {
            v |= s.soft_dirty;
        }
        if flags.contains(EntryFlags::UFFD_WP) {
            v |= s.uffd_wp;
        }
        if flags.contains(EntryFlags::EXCLUSIVE) {
            v |= s.exclusive;
        }
        RawEntry::new(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ArchProfile;

    fn codec() -> EntryCodec {
        EntryCodec::new(ArchProfile::X86_64_4LEVEL)
    }

    #[test]
    fn offset_is_stored_inverted() {
        let raw = codec().encode_swap(3, 0x1F4, EntryFlags::empty());
        assert_eq!(raw.as_u64() >> 59, 3);
        assert_eq!((raw.as_u64() >> 9) & 0x1FF, !0x1F4 & 0x1FF);
        assert_eq!(raw.as_u64() & 0x1FF, 0);
    }

    #[test]
    fn decodes_type_offset_and_flags() {
        let c = codec();
        let raw = c.encode_swap(3, 500, EntryFlags::EXCLUSIVE | EntryFlags::SOFT_DIRTY);
        let swap = c.decode_swap(raw, TranslationLevel::L4).unwrap();
        assert_eq!(swap.swap_type, 3);
        assert_eq!(swap.offset, 500);
        assert_eq!(
            swap.flags,
            EntryFlags::SWAP | EntryFlags::EXCLUSIVE | EntryFlags::SOFT_DIRTY
        );
    }

    #[test]
    fn literal_bits_decode_per_layout() {
        // type 3, offset bits 0x1F4 as stored in the entry
        let stored = (3 << 59) | (0x1F4 << 9);

        let mut plain = ArchProfile::X86_64_4LEVEL;
        plain.swap.offset_inverted = false;
        let swap = EntryCodec::new(plain)
            .decode_swap(RawEntry::new(stored), TranslationLevel::L4)
            .unwrap();
        assert_eq!((swap.swap_type, swap.offset), (3, 500));

        let offset_field = ((1u64 << 50) - 1) << 9;
        let inverted = (3 << 59) | (!(0x1F4 << 9) & offset_field);
        let swap = codec()
            .decode_swap(RawEntry::new(inverted), TranslationLevel::L4)
            .unwrap();
        assert_eq!((swap.swap_type, swap.offset), (3, 500));
        assert_eq!(codec().encode_swap(3, 500, EntryFlags::empty()).as_u64(), inverted);
    }

    #[test]
    fn widest_values_survive() {
        let c = codec();
        let raw = c.encode_swap(0x1F, (1 << 50) - 1, EntryFlags::empty());
        let swap = c.decode_swap(raw, TranslationLevel::L3).unwrap();
        assert_eq!(swap.swap_type, 0x1F);
        assert_eq!(swap.offset, (1 << 50) - 1);
    }

    #[test]
    fn only_at_swap_capable_levels() {
        let c = codec();
        let raw = c.encode_swap(1, 42, EntryFlags::empty());
        assert!(c.decode_swap(raw, TranslationLevel::L2).is_none());
        assert!(c.decode_swap(raw, TranslationLevel::L1).is_none());

        let mut no_pmd = ArchProfile::X86_64_4LEVEL;
        no_pmd.pmd_swap = false;
        assert!(EntryCodec::new(no_pmd).decode_swap(raw, TranslationLevel::L3).is_none());
    }

    #[test]
    fn never_for_none_or_present_entries() {
        let c = codec();
        assert!(c.decode_swap(RawEntry::new(0), TranslationLevel::L4).is_none());
        assert!(c.decode_swap(RawEntry::new(0x60), TranslationLevel::L4).is_none());
        assert!(c.decode_swap(RawEntry::new(0x1001), TranslationLevel::L4).is_none());
    }
}
