//! # Per-Frame Status for Resolved Pages
//!
//! Once a walk has produced a physical frame, Linux can say more about it
//! through two parallel per-frame record stores:
//!
//! - `/proc/kpageflags`: one `KPF_*` flag word per frame ([`PageFlags`]).
//! - `/proc/kpagecount`: how many times the frame is mapped.
//!
//! [`FrameStatusDecoder`] joins both into a [`FrameStatusRecord`].
//! [`PagemapReader`] covers the userspace side: it reads a process's
//! `pagemap` record for a virtual address, which carries the frame number
//! the frame decoder needs.
//!
//! ```rust
//! # use pt_frames::*;
//! # use pt_addresses::FrameNumber;
//! # use pt_store::MemoryStore;
//! let mut flags = MemoryStore::default();
//! let mut counts = MemoryStore::default();
//! flags.write_record(0x10, (PageFlags::ACTIVE | PageFlags::LRU).bits());
//! counts.write_record(0x10, 2);
//!
//! let decoder = FrameStatusDecoder::new(flags, counts, false);
//! let record = decoder.lookup(FrameNumber::new(0x10))?;
//! assert_eq!(record.flags, PageFlags::ACTIVE | PageFlags::LRU);
//! assert_eq!(record.map_count, 2);
//! # Ok::<(), pt_walk::Error>(())
//! ```

#![cfg_attr(not(any(feature = "std", test, doctest)), no_std)]

mod decoder;
mod flags;
mod pagemap;

pub use crate::decoder::{FrameStatusDecoder, FrameStatusRecord};
pub use crate::flags::PageFlags;
pub use crate::pagemap::{PagemapLookup, PagemapReader};

#[cfg(all(feature = "std", unix))]
pub use crate::decoder::{KPAGECOUNT, KPAGEFLAGS};
