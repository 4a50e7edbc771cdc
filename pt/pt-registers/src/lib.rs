//! # Typed `x86_64` Control Registers for Paging-Mode Detection
//!
//! A page-table walk needs exactly four registers to know what it is looking
//! at:
//!
//! | Register | Used for |
//! |----------|----------|
//! | [`Cr0`]  | `PG`: paging enabled at all. |
//! | [`Cr3`]  | Physical base of the top-level table. |
//! | [`Cr4`]  | `PAE`, `LA57` (5-level), `PKE` (protection keys). |
//! | [`Efer`] | `LME`/`LMA` (long mode), `NXE`. |
//!
//! The registers can be read live (feature `asm`, CPL 0 only) or supplied as
//! raw values captured elsewhere, e.g. from a crash dump or a VM snapshot.
//! Either way, [`ControlRegisters::paging_mode`] turns the snapshot into a
//! [`PagingMode`] or reports why the CPU isn't in IA-32e paging.
//!
//! ```rust
//! # use pt_registers::*;
//! let regs = ControlRegisters::from_raw(
//!     1 << 31,               // CR0.PG
//!     0x0010_0000,           // CR3
//!     (1 << 5) | (1 << 12),  // CR4.PAE | CR4.LA57
//!     (1 << 8) | (1 << 10),  // EFER.LME | EFER.LMA
//! );
//! let mode = regs.paging_mode().unwrap();
//! assert!(mode.five_level);
//! assert_eq!(mode.address_width(), 57);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod cr0;
mod cr3;
mod cr4;
mod efer;
mod mode;

pub use crate::cr0::Cr0;
pub use crate::cr3::Cr3;
pub use crate::cr4::Cr4;
pub use crate::efer::Efer;
pub use crate::mode::{ControlRegisters, PagingMode, UnsupportedMode};

pub trait LoadRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety requirements.
    /// For example, the register access might be privileged and require kernel mode (Ring 0).
    unsafe fn load_unsafe() -> Self;
}
