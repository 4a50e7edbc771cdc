//! Human-readable output, one line per visited level plus a terminal line:
//!
//! ```text
//! pgd: idx 0ff val 0000000000002067 PRESENT RW USER ACCESSED
//! pud: idx 1fe val 0000000000003067 PRESENT RW USER ACCESSED
//! pmd: idx 000 val 0000000000004067 PRESENT RW USER ACCESSED
//! pte: idx 102 val 80000000abcde867 PRESENT RW USER ACCESSED DIRTY NX
//! paddr: 0xabcde123
//! ```

use crate::entry::{DecodedEntry, EntryFlags, EntryKind};
use crate::profile::LayoutConstants;
use crate::walk::{Walk, WalkResult, WalkStep};
use core::fmt;
use pt_addresses::PageSize;

impl fmt::Display for EntryFlags {
    /// Space-separated flag names, each with a leading space.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, _) in self.iter_names() {
            write!(f, " {name}")?;
        }
        Ok(())
    }
}

fn write_entry_flags(f: &mut fmt::Formatter<'_>, entry: &DecodedEntry) -> fmt::Result {
    let flags = entry.flags();
    if entry.hw_present() {
        f.write_str(" PRESENT")?;
    }
    if flags.contains(EntryFlags::WRITABLE) {
        f.write_str(" RW")?;
    }
    f.write_str(if entry.user() { " USER" } else { " KERNEL" })?;
    if flags.contains(EntryFlags::WRITE_THROUGH) {
        f.write_str(" PWT")?;
    }
    if flags.contains(EntryFlags::CACHE_DISABLE) {
        f.write_str(" PCD")?;
    }
    if entry.accessed() {
        f.write_str(" ACCESSED")?;
    }

    match entry.kind() {
        EntryKind::Huge(size) => write!(f, " {size}")?,
        EntryKind::Page => {}
        _ => return Ok(()),
    }

    if entry.pat() {
        f.write_str(" PAT")?;
    }
    if entry.dirty() {
        f.write_str(" DIRTY")?;
    }
    if entry.hw_present() && entry.global() {
        f.write_str(" GLOBAL")?;
    }
    if !entry.hw_present() && entry.prot_none() {
        f.write_str(" PROT_NONE")?;
    }
    if flags.contains(EntryFlags::UFFD_WP) {
        f.write_str(" UFFD_WP")?;
    }
    if flags.contains(EntryFlags::SOFT_DIRTY) {
        f.write_str(" SOFT_DIRTY")?;
    }
    if flags.contains(EntryFlags::NO_EXECUTE) {
        f.write_str(" NX")?;
    }
    if let Some(pkey) = entry.pkey() {
        write!(f, " PKEY={pkey:x}")?;
    }
    Ok(())
}

impl fmt::Display for WalkStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: idx {:03x} val {}", self.name, self.index, self.raw)?;
        match self.entry.kind() {
            EntryKind::None => f.write_str(" none"),
            EntryKind::Malformed => f.write_str(" bad"),
            EntryKind::NotPresent => f.write_str(" not present"),
            EntryKind::Table | EntryKind::Huge(_) | EntryKind::Page => {
                write_entry_flags(f, &self.entry)?;
                if self.inverted {
                    f.write_str(" (inverted)")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for WalkResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved {
                physical_address,
                frame,
                ..
            } => write!(
                f,
                "paddr: {physical_address}, page: {}, PFN: {frame}",
                physical_address.align_down(PageSize::Size4K)
            ),
            Self::Huge {
                physical_address,
                frame,
                size,
                ..
            } => write!(
                f,
                "paddr: {physical_address}, {size} page: {}, PFN: {frame}",
                frame.base()
            ),
            Self::Swapped {
                swap_type,
                swap_offset,
                flags,
                ..
            } => write!(f, "swap type: {swap_type:#x}, offset: {swap_offset:#x},{flags}"),
            Self::NotPresent { level } => write!(f, "not present at {level}"),
        }
    }
}

impl fmt::Display for Walk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in self.trace.iter() {
            writeln!(f, "{step}")?;
        }

        match (self.result, self.trace.last()) {
            (WalkResult::NotPresent { .. }, Some(last)) => match last.entry.kind() {
                EntryKind::None => write!(f, "{} is none", last.name),
                EntryKind::Malformed => write!(f, "{} is bad", last.name),
                _ => write!(f, "not present at {}", last.name),
            },
            (result, _) => write!(f, "{result}"),
        }
    }
}

impl fmt::Display for LayoutConstants {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PGDIR_SHIFT  = {}", self.pgdir_shift)?;
        writeln!(f, "P4D_SHIFT    = {}", self.p4d_shift)?;
        writeln!(f, "PUD_SHIFT    = {}", self.pud_shift)?;
        writeln!(f, "PMD_SHIFT    = {}", self.pmd_shift)?;
        writeln!(f, "PAGE_SHIFT   = {}", self.page_shift)?;
        writeln!(f, "PTRS_PER_PGD = {}", self.ptrs_per_pgd)?;
        writeln!(f, "PTRS_PER_P4D = {}", self.ptrs_per_p4d)?;
        writeln!(f, "PTRS_PER_PUD = {}", self.ptrs_per_pud)?;
        writeln!(f, "PTRS_PER_PMD = {}", self.ptrs_per_pmd)?;
        writeln!(f, "PTRS_PER_PTE = {}", self.ptrs_per_pte)?;
        writeln!(f, "PGDIR_MASK   = 0x{:016x}", self.pgdir_mask)?;
        writeln!(f, "P4D_MASK     = 0x{:016x}", self.p4d_mask)?;
        writeln!(f, "PUD_MASK     = 0x{:016x}", self.pud_mask)?;
        writeln!(f, "PMD_MASK     = 0x{:016x}", self.pmd_mask)?;
        writeln!(f, "PAGE_MASK    = 0x{:016x}", self.page_mask)?;
        writeln!(f, "PTE_PFN_MASK = 0x{:016x}", self.pte_pfn_mask)?;
        write!(f, "PAGE_OFFSET  = 0x{:016x}", self.page_offset)
    }
}
