use core::fmt;
use log::{debug, warn};
use pt_addresses::{FrameNumber, PAGE_SHIFT, PageSize, VirtualAddress};
use pt_store::RecordStore;
use pt_walk::{ArchProfile, EntryCodec, Error, PagemapEntry, WalkResult};

/// Reads a process's pagemap: one [`PagemapEntry`] per virtual page.
#[derive(Debug)]
pub struct PagemapReader<S> {
    store: S,
    codec: EntryCodec,
}

/// A pagemap record together with its decoded meaning.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PagemapLookup {
    pub va: VirtualAddress,
    pub entry: PagemapEntry,
    pub result: WalkResult,
}

impl PagemapLookup {
    /// Present, but the frame number was zeroed for an unprivileged reader.
    #[must_use]
    pub const fn pfn_hidden(&self) -> bool {
        self.entry.present() && self.entry.pfn() == 0
    }

    /// The frame to hand to a frame status lookup, if there is one.
    #[must_use]
    pub const fn frame(&self) -> Option<FrameNumber> {
        if self.pfn_hidden() {
            None
        } else {
            self.entry.frame()
        }
    }

    /// Whether the record describes a page that exists at all.
    #[must_use]
    pub const fn exists(&self) -> bool {
        self.entry.has_flags()
    }
}

impl fmt::Display for PagemapLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.result {
            WalkResult::Resolved {
                physical_address,
                frame,
                ..
            } => writeln!(
                f,
                "Paddr: {physical_address}, page: {}, PFN: {frame}",
                physical_address.align_down(PageSize::Size4K)
            )?,
            WalkResult::Swapped {
                swap_type,
                swap_offset,
                ..
            } => writeln!(f, "Swap type: {swap_type:#x}, offset: {swap_offset:#x}")?,
            WalkResult::Huge { .. } | WalkResult::NotPresent { .. } => {}
        }

        write!(f, "/proc/[pid]/pagemap: 0x{:016x} =", self.entry.into_bits())?;
        if !self.exists() {
            return f.write_str(" no flags set, page does not exist?");
        }
        let e = &self.entry;
        for (set, name) in [
            (e.present(), " PRESENT"),
            (e.swap(), " SWAP"),
            (e.file(), " FILE(_OR_SHANON)"),
            (e.uffd_wp(), " UFFD_WP"),
            (e.exclusive(), " MMAP_EXCLUSIVE"),
            (e.soft_dirty(), " SOFT_DIRTY"),
            (e.guard(), " GUARD"),
        ] {
            if set {
                f.write_str(name)?;
            }
        }
        Ok(())
    }
}

impl<S: RecordStore> PagemapReader<S> {
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self {
            store,
            codec: EntryCodec::new(ArchProfile::X86_64_4LEVEL),
        }
    }

    /// The raw record for the page containing `va`.
    ///
    /// # Errors
    /// [`Error::Truncated`] past the end of the address space, plus any
    /// store failure.
    pub fn read(&self, va: VirtualAddress) -> Result<PagemapEntry, Error> {
        let raw = self.store.read_record(va.as_u64() >> PAGE_SHIFT)?;
        Ok(PagemapEntry::from_bits(raw))
    }

    /// Read and decode the record for `va`.
    ///
    /// # Errors
    /// See [`PagemapReader::read`]; [`Error::SentinelDecodeFailure`] for a
    /// record that is both present and swapped.
    pub fn lookup(&self, va: VirtualAddress) -> Result<PagemapLookup, Error> {
        let entry = self.read(va)?;
        let result = self.codec.decode_pagemap(entry, va)?;
        let lookup = PagemapLookup { va, entry, result };
        if lookup.pfn_hidden() {
            warn!("{va}: page is present but its PFN is hidden, frame status unavailable");
        }
        debug!("{va}: pagemap {:#018x} -> {result:?}", entry.into_bits());
        Ok(lookup)
    }
}

#[cfg(all(feature = "std", unix))]
impl PagemapReader<pt_store::FileStore> {
    /// Open `/proc/<pid>/pagemap` (or `/proc/self/pagemap`).
    ///
    /// # Errors
    /// [`Error::NoSuchAddressSpace`] for the kernel selector or a process
    /// that is gone; [`Error::PermissionDenied`] for another user's process.
    pub fn open_procfs(selector: pt_walk::AddressSpaceSelector) -> Result<Self, Error> {
        use pt_walk::AddressSpaceSelector;

        let path = match selector {
            AddressSpaceSelector::Current => std::string::String::from("/proc/self/pagemap"),
            AddressSpaceSelector::Process(pid) => std::format!("/proc/{pid}/pagemap"),
            AddressSpaceSelector::Kernel => return Err(Error::NoSuchAddressSpace(selector)),
        };
        match pt_store::FileStore::open(&path) {
            Ok(store) => Ok(Self::new(store)),
            Err(pt_store::StoreError::NotFound) => Err(Error::NoSuchAddressSpace(selector)),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pt_addresses::PhysicalAddress;
    use pt_store::MemoryStore;

    const PRESENT: u64 = 1 << 63;
    const SWAP: u64 = 1 << 62;
    const EXCLUSIVE: u64 = 1 << 56;

    fn reader(records: &[(u64, u64)]) -> PagemapReader<MemoryStore> {
        let mut store = MemoryStore::default();
        for &(page, raw) in records {
            store.write_record(usize::try_from(page).unwrap(), raw);
        }
        PagemapReader::new(store)
    }

    #[test]
    fn present_record_resolves_with_offset() {
        let r = reader(&[(0x12, PRESENT | EXCLUSIVE | 0xABCDE)]);
        let lookup = r.lookup(VirtualAddress::new(0x12_345)).unwrap();
        assert_eq!(lookup.frame(), Some(FrameNumber::new(0xABCDE)));
        assert_eq!(
            lookup.result.physical_address(),
            Some(PhysicalAddress::new(0xABCD_E345))
        );
        assert_eq!(
            lookup.to_string(),
            "Paddr: 0xabcde345, page: 0xabcde000, PFN: 0xabcde\n\
             /proc/[pid]/pagemap: 0x81000000000abcde = PRESENT MMAP_EXCLUSIVE"
        );
    }

    #[test]
    fn hidden_pfn_has_no_frame() {
        let r = reader(&[(1, PRESENT)]);
        let lookup = r.lookup(VirtualAddress::new(0x1000)).unwrap();
        assert!(lookup.pfn_hidden());
        assert_eq!(lookup.frame(), None);
    }

    #[test]
    fn swapped_record() {
        let r = reader(&[(2, SWAP | (500 << 5) | 3)]);
        let lookup = r.lookup(VirtualAddress::new(0x2000)).unwrap();
        assert!(matches!(
            lookup.result,
            WalkResult::Swapped {
                swap_type: 3,
                swap_offset: 500,
                ..
            }
        ));
        assert!(lookup.to_string().starts_with("Swap type: 0x3, offset: 0x1f4\n"));
    }

    #[test]
    fn untouched_page_has_no_flags() {
        let r = reader(&[(0, 0)]);
        let lookup = r.lookup(VirtualAddress::new(0x10)).unwrap();
        assert!(!lookup.exists());
        assert!(lookup.to_string().ends_with("= no flags set, page does not exist?"));
    }

    #[test]
    fn present_and_swapped_is_rejected() {
        let r = reader(&[(0, PRESENT | SWAP | 1)]);
        assert!(matches!(
            r.lookup(VirtualAddress::zero()),
            Err(Error::SentinelDecodeFailure { .. })
        ));
    }

    #[test]
    fn reads_past_the_end_are_truncated() {
        let r = reader(&[(0, PRESENT | 1)]);
        assert!(matches!(
            r.read(VirtualAddress::new(0x5000)),
            Err(Error::Truncated { offset: 0x28, read: 0 })
        ));
    }
}
