#[cfg(feature = "asm")]
use crate::LoadRegisterUnsafe;
use bitfield_struct::bitfield;

/// `IA32_EFER` (MSR `0xC000_0080`), long-mode and NX bits only.
#[bitfield(u64, order = Lsb)]
#[derive(Eq, PartialEq)]
pub struct Efer {
    /// Bit 0 — SCE: System Call Extensions.
    pub sce: bool,

    #[bits(7)]
    __r1: u8,

    /// Bit 8 — LME: Long Mode Enable.
    pub lme: bool,

    #[bits(1)]
    __r2: u8,

    /// Bit 10 — LMA: Long Mode Active (read-only).
    pub lma: bool,

    /// Bit 11 — NXE: No-Execute Enable.
    ///
    /// Without it, entry bit 63 is reserved rather than NX.
    pub nxe: bool,

    #[bits(52)]
    __r3: u64,
}

impl Efer {
    pub const MSR: u32 = 0xC000_0080;
}

#[cfg(feature = "asm")]
impl LoadRegisterUnsafe for Efer {
    unsafe fn load_unsafe() -> Self {
        let (lo, hi): (u32, u32);
        unsafe {
            core::arch::asm!(
                "rdmsr",
                in("ecx") Self::MSR,
                out("eax") lo,
                out("edx") hi,
                options(nomem, nostack, preserves_flags)
            );
        }
        Self::from_bits((u64::from(hi) << 32) | u64::from(lo))
    }
}
