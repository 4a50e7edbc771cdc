#[cfg(feature = "asm")]
use crate::LoadRegisterUnsafe;
use bitfield_struct::bitfield;

/// CR4 — paging-related feature enables.
#[bitfield(u64, order = Lsb)]
#[derive(Eq, PartialEq)]
pub struct Cr4 {
    #[bits(4)]
    __r1: u8,

    /// Bit 4 — PSE: Page Size Extensions (implied in long mode).
    pub pse: bool,

    /// Bit 5 — PAE: Physical Address Extension. Required for long mode.
    pub pae: bool,

    #[bits(1)]
    __r2: u8,

    /// Bit 7 — PGE: Global pages.
    pub pge: bool,

    #[bits(4)]
    __r3: u8,

    /// Bit 12 — LA57: 5-level paging (57-bit linear addresses).
    pub la57: bool,

    #[bits(4)]
    __r4: u8,

    /// Bit 17 — PCIDE: Process-context identifiers in CR3.
    pub pcide: bool,

    #[bits(2)]
    __r5: u8,

    /// Bit 20 — SMEP: Supervisor Mode Execution Prevention.
    pub smep: bool,

    /// Bit 21 — SMAP: Supervisor Mode Access Prevention.
    pub smap: bool,

    /// Bit 22 — PKE: Protection keys for user-mode pages.
    ///
    /// When set, entry bits 59–62 carry a protection key instead of being
    /// ignored.
    pub pke: bool,

    #[bits(41)]
    __r6: u64,
}

#[cfg(feature = "asm")]
impl LoadRegisterUnsafe for Cr4 {
    unsafe fn load_unsafe() -> Self {
        let mut cr4: u64;
        unsafe {
            core::arch::asm!("mov {}, cr4", out(reg) cr4, options(nomem, nostack, preserves_flags));
        }
        Self::from_bits(cr4)
    }
}
