//! # Walk Engine
//!
//! Level-by-level descent from the root table to a terminal entry.
//!
//! Per level the engine reads one entry, un-inverts it if needed, decodes
//! it, and then either descends or stops:
//!
//! | Decoded kind | Outcome |
//! |--------------|---------|
//! | none | [`WalkResult::NotPresent`] at this level |
//! | malformed | [`WalkResult::NotPresent`] at this level |
//! | not present | [`WalkResult::Swapped`] where swap entries exist, else `NotPresent` |
//! | huge | [`WalkResult::Huge`] |
//! | page (leaf) | [`WalkResult::Resolved`] |
//! | table | descend |
//!
//! At most five iterations run; the layout (4 or 5 levels) comes from the
//! profile and is fixed per engine.

use crate::address_space::PhysMapper;
use crate::entry::{DecodedEntry, EntryCodec, EntryFlags, EntryKind, RawEntry};
use crate::error::Error;
use crate::invert::Inverter;
use crate::level::{LevelCount, TranslationLevel};
use crate::profile::ArchProfile;
use crate::resolve::Resolver;
use log::debug;
use pt_addresses::{FrameNumber, PageSize, PhysicalAddress, VirtualAddress};

/// Maximum number of levels a walk visits.
pub const MAX_LEVELS: usize = TranslationLevel::ALL.len();

/// Terminal outcome of a walk. Exactly one per walk.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum WalkResult {
    /// A 4 KiB page.
    Resolved {
        physical_address: PhysicalAddress,
        frame: FrameNumber,
        flags: EntryFlags,
    },
    /// A huge page mapped at `level`.
    Huge {
        level: TranslationLevel,
        physical_address: PhysicalAddress,
        /// First 4 KiB frame of the huge page.
        frame: FrameNumber,
        size: PageSize,
        flags: EntryFlags,
    },
    Swapped {
        level: TranslationLevel,
        swap_type: u8,
        swap_offset: u64,
        flags: EntryFlags,
    },
    /// Nothing mapped; the walk stopped at `level`.
    NotPresent { level: TranslationLevel },
}

impl WalkResult {
    /// The level the walk ended at.
    #[must_use]
    pub const fn level(&self) -> TranslationLevel {
        match self {
            Self::Resolved { .. } => TranslationLevel::LEAF,
            Self::Huge { level, .. } | Self::Swapped { level, .. } | Self::NotPresent { level } => {
                *level
            }
        }
    }

    #[must_use]
    pub const fn physical_address(&self) -> Option<PhysicalAddress> {
        match self {
            Self::Resolved {
                physical_address, ..
            }
            | Self::Huge {
                physical_address, ..
            } => Some(*physical_address),
            _ => None,
        }
    }
}

/// One visited level.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct WalkStep {
    pub level: TranslationLevel,
    /// Display name of `level` under the walked layout.
    pub name: &'static str,
    pub table: PhysicalAddress,
    pub index: u16,
    /// The entry as stored.
    pub raw: RawEntry,
    /// Whether the entry was un-inverted before decoding.
    pub inverted: bool,
    pub entry: DecodedEntry,
}

/// The visited levels of a walk, top first.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct WalkTrace {
    steps: [Option<WalkStep>; MAX_LEVELS],
    len: usize,
}

impl WalkTrace {
    fn push(&mut self, step: WalkStep) {
        debug_assert!(self.len < MAX_LEVELS, "walk trace overflow");
        if let Some(slot) = self.steps.get_mut(self.len) {
            *slot = Some(step);
            self.len += 1;
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &WalkStep> {
        self.steps.iter().flatten()
    }

    #[must_use]
    pub fn last(&self) -> Option<&WalkStep> {
        self.len.checked_sub(1).and_then(|i| self.steps[i].as_ref())
    }

    #[must_use]
    pub fn get(&self, level: TranslationLevel) -> Option<&WalkStep> {
        self.iter().find(|s| s.level == level)
    }
}

/// A finished walk: what was visited and how it ended.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Walk {
    pub va: VirtualAddress,
    pub levels: LevelCount,
    pub trace: WalkTrace,
    pub result: WalkResult,
}

/// Drives walks for one architecture profile.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct WalkEngine {
    codec: EntryCodec,
}

impl WalkEngine {
    #[must_use]
    pub const fn new(profile: ArchProfile) -> Self {
        Self {
            codec: EntryCodec::new(profile),
        }
    }

    #[must_use]
    pub const fn codec(&self) -> &EntryCodec {
        &self.codec
    }

    /// Walk the tables rooted at `root` for `va`.
    ///
    /// # Errors
    /// - [`Error::InvalidAddress`] if `va` isn't canonical for the layout;
    ///   nothing is read in that case.
    /// - Any read failure of `mapper`; the walk is abandoned.
    pub fn walk<M: PhysMapper + ?Sized>(
        &self,
        mapper: &M,
        root: PhysicalAddress,
        va: VirtualAddress,
    ) -> Result<Walk, Error> {
        let profile = self.codec.profile();
        let levels = profile.levels;
        let width = levels.address_width();
        if !va.is_canonical(width) {
            return Err(Error::InvalidAddress { address: va, width });
        }

        let mut trace = WalkTrace::default();
        let mut table = root;
        let mut level = levels.top();

        let result = loop {
            let index = level.index_of(va);
            let raw = mapper.read_entry(table, index)?;
            let inverter = Inverter::for_level(profile, level);
            let inverted = inverter.needs_invert(raw);
            let entry = self.codec.decode(inverter.normalize(raw), level);

            let name = level.name(levels);
            debug!("{name}: idx {index:03x} val {raw} {:?}", entry.kind());
            trace.push(WalkStep {
                level,
                name,
                table,
                index,
                raw,
                inverted,
                entry,
            });

            match entry.kind() {
                EntryKind::None | EntryKind::Malformed => break WalkResult::NotPresent { level },
                EntryKind::NotPresent => {
                    break match self.codec.decode_swap(raw, level) {
                        Some(swap) => WalkResult::Swapped {
                            level,
                            swap_type: swap.swap_type,
                            swap_offset: swap.offset,
                            flags: swap.flags,
                        },
                        None => WalkResult::NotPresent { level },
                    };
                }
                EntryKind::Huge(_) | EntryKind::Page => {
                    let Some((frame, size)) = entry.mapping() else {
                        break WalkResult::NotPresent { level };
                    };
                    let physical_address = Resolver::physical_address(frame, size, va);
                    break if level.is_leaf() {
                        WalkResult::Resolved {
                            physical_address,
                            frame,
                            flags: entry.flags(),
                        }
                    } else {
                        WalkResult::Huge {
                            level,
                            physical_address,
                            frame,
                            size,
                            flags: entry.flags(),
                        }
                    };
                }
                EntryKind::Table => match (entry.next_table(), level.next()) {
                    (Some(next_table), Some(next_level)) => {
                        table = next_table;
                        level = next_level;
                    }
                    _ => break WalkResult::NotPresent { level },
                },
            }
        };

        debug!("{va}: {result:?}");
        Ok(Walk {
            va,
            levels,
            trace,
            result,
        })
    }
}
