//! # Virtual and Physical Address Types for Page-Table Walks
//!
//! Strongly typed wrappers for the raw integers a page-table walk juggles.
//!
//! ## Overview
//!
//! A walk constantly converts between three kinds of numbers that are all
//! `u64` underneath:
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`VirtualAddress`] | An address in some address space; decomposes into per-level indices. |
//! | [`PhysicalAddress`] | A machine bus address (RAM or MMIO). |
//! | [`FrameNumber`] | A physical address shifted right by 12 (the PFN). |
//!
//! Mixing them up is the classic bug in translation code (e.g. shifting a PFN
//! twice, or treating an entry value as an address). The newtypes make those
//! mix-ups compile errors while staying zero-cost.
//!
//! ## Page Sizes
//!
//! x86-64 maps memory in three granularities, selected by the level at which
//! the walk terminates. [`PageSize`] carries the size and shift at **runtime**,
//! since the walker only learns the terminal level while walking:
//!
//! - [`PageSize::Size4K`] — leaf `PTE`
//! - [`PageSize::Size2M`] — `PDE` with `PS=1`
//! - [`PageSize::Size1G`] — `PDPTE` with `PS=1`
//!
//! ## Typical Usage
//!
//! ```rust
//! # use pt_addresses::*;
//! let va = VirtualAddress::new(0x4012_3456);
//! let frame = FrameNumber::new(0x40000);
//!
//! // Join a huge-page frame with the in-page offset of the virtual address.
//! let pa = frame.base().join(va, PageSize::Size1G);
//! assert_eq!(pa.as_u64(), 0x4012_3456);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod frame_number;
mod page_size;
mod physical_address;
mod virtual_address;

pub use crate::frame_number::FrameNumber;
pub use crate::page_size::PageSize;
pub use crate::physical_address::PhysicalAddress;
pub use crate::virtual_address::VirtualAddress;

/// Base page shift (4 KiB pages).
pub const PAGE_SHIFT: u32 = 12;

/// Base page size in bytes.
pub const PAGE_SIZE: u64 = 1 << PAGE_SHIFT;

/// Align `x` down to the nearest multiple of `a`.
///
/// ### Preconditions
/// - `a` must be **non-zero** and a **power of two**.
///
/// ### Examples
/// ```rust
/// # use pt_addresses::align_down;
/// assert_eq!(align_down(4095, 4096), 0);
/// assert_eq!(align_down(8191, 4096), 4096);
/// assert_eq!(align_down(0x12345, 16), 0x12340);
/// ```
#[inline]
#[must_use]
pub const fn align_down(x: u64, a: u64) -> u64 {
    x & !(a - 1)
}
