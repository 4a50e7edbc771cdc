#[cfg(feature = "asm")]
use crate::LoadRegisterUnsafe;
use bitfield_struct::bitfield;
use pt_addresses::PhysicalAddress;

/// CR3 — root of the paging hierarchy.
///
/// With `CR4.LA57` the root is a PML5 table, otherwise a PML4 table. The low
/// twelve bits hold either `PWT`/`PCD` or, with `CR4.PCIDE`, the PCID; the
/// walker ignores them.
#[bitfield(u64)]
#[derive(Eq, PartialEq)]
pub struct Cr3 {
    /// Bits 0–11 — PCID, or `PWT` (bit 3) / `PCD` (bit 4) without PCIDs.
    #[bits(12)]
    pub low: u16,

    /// Bits 12–51 — root table physical base >> 12.
    #[bits(40)]
    root_4k: u64,

    /// Bits 52–63 — LAM and no-flush controls.
    #[bits(12)]
    pub high: u16,
}

impl Cr3 {
    #[must_use]
    pub const fn from_root(root: PhysicalAddress) -> Self {
        Self::new().with_root_4k(root.as_u64() >> 12)
    }

    /// Physical address of the top-level table.
    #[must_use]
    pub const fn root(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.root_4k() << 12)
    }
}

#[cfg(feature = "asm")]
impl LoadRegisterUnsafe for Cr3 {
    unsafe fn load_unsafe() -> Self {
        let mut cr3: u64;
        unsafe {
            core::arch::asm!("mov {}, cr3", out(reg) cr3, options(nomem, nostack, preserves_flags));
        }
        Self::from_bits(cr3)
    }
}
