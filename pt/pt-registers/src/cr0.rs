#[cfg(feature = "asm")]
use crate::LoadRegisterUnsafe;
use bitfield_struct::bitfield;

/// CR0 — only the bits that matter to address translation.
#[bitfield(u64, order = Lsb)]
#[derive(Eq, PartialEq)]
pub struct Cr0 {
    /// Bit 0 — PE: Protection Enable.
    pub pe: bool,

    #[bits(15)]
    __r1: u16,

    /// Bit 16 — WP: Write Protect.
    ///
    /// Supervisor writes honour read-only entries when set.
    pub wp: bool,

    #[bits(14)]
    __r2: u16,

    /// Bit 31 — PG: Paging.
    pub pg: bool,

    #[bits(32)]
    __r3: u32,
}

#[cfg(feature = "asm")]
impl LoadRegisterUnsafe for Cr0 {
    unsafe fn load_unsafe() -> Self {
        let mut cr0: u64;
        unsafe {
            core::arch::asm!("mov {}, cr0", out(reg) cr0, options(nomem, nostack, preserves_flags));
        }
        Self::from_bits(cr0)
    }
}
