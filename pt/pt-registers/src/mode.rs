#[cfg(feature = "asm")]
use crate::LoadRegisterUnsafe;
use crate::{Cr0, Cr3, Cr4, Efer};

/// The paging features a walker has to honour.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct PagingMode {
    /// `CR4.LA57`: five translation levels instead of four.
    pub five_level: bool,
    /// `CR4.PKE`: entry bits 59–62 are a protection key.
    pub protection_keys: bool,
    /// `EFER.NXE`: entry bit 63 is no-execute.
    pub no_execute: bool,
}

impl PagingMode {
    pub const FOUR_LEVEL: Self = Self {
        five_level: false,
        protection_keys: false,
        no_execute: true,
    };

    pub const FIVE_LEVEL: Self = Self {
        five_level: true,
        ..Self::FOUR_LEVEL
    };

    /// Number of translated virtual-address bits.
    #[must_use]
    pub const fn address_width(&self) -> u32 {
        if self.five_level { 57 } else { 48 }
    }

    #[must_use]
    pub const fn levels(&self) -> usize {
        if self.five_level { 5 } else { 4 }
    }
}

/// Why a register snapshot doesn't describe IA-32e paging.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum UnsupportedMode {
    #[error("long mode is not enabled and active (EFER.LME/EFER.LMA)")]
    NotLongMode,
    #[error("paging is disabled (CR0.PG)")]
    PagingDisabled,
    #[error("PAE is disabled (CR4.PAE)")]
    PaeDisabled,
}

/// A snapshot of the registers a walk depends on.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ControlRegisters {
    pub cr0: Cr0,
    pub cr3: Cr3,
    pub cr4: Cr4,
    pub efer: Efer,
}

impl ControlRegisters {
    #[must_use]
    pub const fn from_raw(cr0: u64, cr3: u64, cr4: u64, efer: u64) -> Self {
        Self {
            cr0: Cr0::from_bits(cr0),
            cr3: Cr3::from_bits(cr3),
            cr4: Cr4::from_bits(cr4),
            efer: Efer::from_bits(efer),
        }
    }

    /// Read the live registers.
    ///
    /// # Safety
    /// Must run at CPL 0; `rdmsr` and `mov from crN` fault otherwise.
    #[cfg(feature = "asm")]
    #[must_use]
    pub unsafe fn load_unsafe() -> Self {
        unsafe {
            Self {
                cr0: Cr0::load_unsafe(),
                cr3: Cr3::load_unsafe(),
                cr4: Cr4::load_unsafe(),
                efer: Efer::load_unsafe(),
            }
        }
    }

    /// Derive the paging mode, requiring long mode with paging and PAE on.
    ///
    /// # Errors
    /// [`UnsupportedMode`] naming the first missing requirement.
    pub const fn paging_mode(&self) -> Result<PagingMode, UnsupportedMode> {
        if !self.efer.lme() || !self.efer.lma() {
            return Err(UnsupportedMode::NotLongMode);
        }
        if !self.cr0.pg() {
            return Err(UnsupportedMode::PagingDisabled);
        }
        if !self.cr4.pae() {
            return Err(UnsupportedMode::PaeDisabled);
        }
        Ok(PagingMode {
            five_level: self.cr4.la57(),
            protection_keys: self.cr4.pke(),
            no_execute: self.efer.nxe(),
        })
    }
}
