//! Undo the L1TF frame-bit inversion of `PROT_NONE` entries.
//!
//! A logically present entry whose hardware present bit is clear would
//! still be followed by a speculatively executing CPU. The kernel therefore
//! stores its frame bits inverted so such a speculative access lands outside
//! populated memory. The walker has to flip them back, once, before reading
//! any address out of the entry.
//!
//! The inversion only touches the frame field, and whether it is needed
//! depends only on bits outside that field (present, `PROT_NONE`, `PS`).
//! Hence [`Inverter::invert`] is an involution.

use crate::entry::RawEntry;
use crate::level::TranslationLevel;
use crate::profile::ArchProfile;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Inverter {
    presence: u64,
    present: u64,
    huge: u64,
    frame_mask: u64,
    huge_frame_mask: Option<u64>,
}

impl Inverter {
    /// The inverter for entries at `level` under `profile`.
    #[must_use]
    pub const fn for_level(profile: &ArchProfile, level: TranslationLevel) -> Self {
        let l = &profile.entry;
        let huge_frame_mask = match level {
            TranslationLevel::L2 | TranslationLevel::L3 => match level.page_size() {
                Some(size) => Some(l.frame_mask_for(size)),
                None => None,
            },
            _ => None,
        };
        Self {
            presence: l.presence(level),
            present: l.present,
            huge: l.huge,
            frame_mask: l.frame_mask,
            huge_frame_mask,
        }
    }

    /// Logically present but not hardware-present.
    #[inline]
    #[must_use]
    pub const fn needs_invert(&self, raw: RawEntry) -> bool {
        let v = raw.as_u64();
        v & self.presence != 0 && v & self.present == 0
    }

    /// Flip the frame field of `raw`. Huge entries flip only the huge frame
    /// bits.
    #[inline]
    #[must_use]
    pub const fn invert(&self, raw: RawEntry) -> RawEntry {
        let v = raw.as_u64();
        let mask = match self.huge_frame_mask {
            Some(mask) if v & self.huge != 0 => mask,
            _ => self.frame_mask,
        };
        RawEntry::new(v ^ mask)
    }

    /// [`invert`](Self::invert) if [`needs_invert`](Self::needs_invert),
    /// `raw` otherwise.
    #[inline]
    #[must_use]
    pub const fn normalize(&self, raw: RawEntry) -> RawEntry {
        if self.needs_invert(raw) {
            self.invert(raw)
        } else {
            raw
        }
    }
}
