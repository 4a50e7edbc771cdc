//! # Page-Table Walker for x86-64 (4- and 5-Level Paging)
//!
//! Resolves virtual addresses by walking a translation hierarchy that lives
//! in someone else's memory: a live kernel's, a VM snapshot's, or a captured
//! physical memory image. Along the way every entry is decoded, including
//! the states the MMU itself never sees: `PROT_NONE` mappings with
//! inverted frame bits, swap entries, and migration entries.
//!
//! ## Pipeline
//!
//! ```text
//! AddressSpaceProvider ──open──▶ AddressSpace ──walk──▶ WalkEngine
//!                                                         │ per level:
//!                                                         │   PhysMapper::read_entry
//!                                                         │   Inverter::normalize
//!                                                         │   EntryCodec::decode
//!                                                         ▼
//!                                            WalkResult ──▶ Resolver ──▶ Resolution
//! ```
//!
//! | Component | Role |
//! |-----------|------|
//! | [`EntryCodec`] | Raw entry → [`DecodedEntry`]; swap and pagemap decoding. |
//! | [`Inverter`] | Undo the L1TF frame inversion of `PROT_NONE` entries. |
//! | [`AddressSpaceProvider`] | Selector → pinned [`AddressSpace`]. |
//! | [`WalkEngine`] | Level-by-level descent, huge-page short-circuit. |
//! | [`Resolver`] | Terminal result → byte address or swap locator. |
//!
//! All bit positions come from an [`ArchProfile`], resolved once from the
//! control registers ([`ArchProfile::from_registers`]).
//!
//! ## Example
//!
//! ```rust
//! # use pt_walk::*;
//! # use pt_addresses::{PhysicalAddress, VirtualAddress};
//! # use pt_store::MemoryStore;
//! // A 4-level hierarchy: root at 0x1000, then 0x2000, 0x3000, 0x4000.
//! let mut image = MemoryStore::zeroed(0x5000);
//! image.write_u64_at(0x1000, 0x2000 | 0x67);
//! image.write_u64_at(0x2000, 0x3000 | 0x67);
//! image.write_u64_at(0x3000, 0x4000 | 0x67);
//! image.write_u64_at(0x4000, 0xABCD_E000 | 0x67);
//!
//! let source = SnapshotSource::new(image).with_current(PhysicalAddress::new(0x1000));
//! let provider = AddressSpaceProvider::new(source, ArchProfile::X86_64_4LEVEL);
//! let space = provider.open(AddressSpaceSelector::Current)?;
//! let walk = space.walk(VirtualAddress::new(0x123))?;
//!
//! assert_eq!(
//!     Resolver::resolve(&walk.result),
//!     Resolution::Physical {
//!         address: PhysicalAddress::new(0xABCD_E123),
//!         frame: pt_addresses::FrameNumber::new(0xABCDE),
//!         size: pt_addresses::PageSize::Size4K,
//!     }
//! );
//! # Ok::<(), Error>(())
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

mod address_space;
mod entry;
mod error;
mod invert;
mod level;
mod profile;
mod report;
mod resolve;
mod walk;

pub use crate::address_space::{
    AddressSpace, AddressSpaceProvider, AddressSpaceSelector, AddressSpaceSource, Origin,
    Ownership, ParseSelectorError, PhysMapper, Pid, SnapshotSource,
};
pub use crate::entry::{
    DecodedEntry, EntryCodec, EntryFlags, EntryKind, PagemapEntry, RawEntry, SwapEntry,
};
pub use crate::error::Error;
pub use crate::invert::Inverter;
pub use crate::level::{ENTRIES_PER_TABLE, INDEX_BITS, IndexSplit, LevelCount, TranslationLevel};
pub use crate::profile::{ArchProfile, EntryLayout, LayoutConstants, SwapLayout};
pub use crate::resolve::{Resolution, Resolver, SwapLocator};
pub use crate::walk::{MAX_LEVELS, Walk, WalkEngine, WalkResult, WalkStep, WalkTrace};
