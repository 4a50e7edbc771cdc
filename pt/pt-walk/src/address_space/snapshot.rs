use crate::address_space::{AddressSpaceSource, Origin, Pid, PhysMapper};
use crate::error::Error;
use crate::AddressSpaceSelector;
use alloc::collections::BTreeMap;
use core::sync::atomic::{AtomicUsize, Ordering};
use pt_addresses::PhysicalAddress;

#[derive(Debug, Default, Copy, Clone)]
struct ProcessRoots {
    owned: Option<PhysicalAddress>,
    borrowed: Option<PhysicalAddress>,
}

/// An [`AddressSpaceSource`] over a captured memory image.
///
/// Roots are registered up front (e.g. CR3 values taken alongside the
/// image). Pins are only counted, which lets callers verify that every pin
/// was released.
///
/// ```rust
/// # use pt_walk::*;
/// # use pt_addresses::PhysicalAddress;
/// # use pt_store::MemoryStore;
/// let source = SnapshotSource::new(MemoryStore::zeroed(0x2000))
///     .with_current(PhysicalAddress::new(0x1000));
/// let provider = AddressSpaceProvider::new(source, ArchProfile::X86_64_4LEVEL);
/// {
///     let space = provider.open(AddressSpaceSelector::Current).unwrap();
///     assert_eq!(provider.source().outstanding_pins(), 1);
///     # drop(space);
/// }
/// assert_eq!(provider.source().outstanding_pins(), 0);
/// ```
#[derive(Debug)]
pub struct SnapshotSource<M> {
    mapper: M,
    current: Option<PhysicalAddress>,
    kernel: Option<PhysicalAddress>,
    processes: BTreeMap<Pid, ProcessRoots>,
    pins: AtomicUsize,
    unpins: AtomicUsize,
}

impl<M: PhysMapper> SnapshotSource<M> {
    #[must_use]
    pub const fn new(mapper: M) -> Self {
        Self {
            mapper,
            current: None,
            kernel: None,
            processes: BTreeMap::new(),
            pins: AtomicUsize::new(0),
            unpins: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub const fn with_current(mut self, root: PhysicalAddress) -> Self {
        self.current = Some(root);
        self
    }

    #[must_use]
    pub const fn with_kernel(mut self, root: PhysicalAddress) -> Self {
        self.kernel = Some(root);
        self
    }

    /// Register a process. Either root may be missing.
    #[must_use]
    pub fn with_process(
        mut self,
        pid: Pid,
        owned: Option<PhysicalAddress>,
        borrowed: Option<PhysicalAddress>,
    ) -> Self {
        self.processes.insert(pid, ProcessRoots { owned, borrowed });
        self
    }

    /// Pins taken so far.
    #[must_use]
    pub fn pin_count(&self) -> usize {
        self.pins.load(Ordering::Acquire)
    }

    /// Pins released so far.
    #[must_use]
    pub fn unpin_count(&self) -> usize {
        self.unpins.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn outstanding_pins(&self) -> usize {
        self.pin_count().saturating_sub(self.unpin_count())
    }

    fn pin(&self, root: Option<PhysicalAddress>) -> Option<PhysicalAddress> {
        if root.is_some() {
            self.pins.fetch_add(1, Ordering::AcqRel);
        }
        root
    }
}

impl<M: PhysMapper> AddressSpaceSource for SnapshotSource<M> {
    type Mapper = M;

    fn mapper(&self) -> &M {
        &self.mapper
    }

    fn pin_current(&self) -> Result<PhysicalAddress, Error> {
        self.pin(self.current)
            .ok_or(Error::NoSuchAddressSpace(AddressSpaceSelector::Current))
    }

    fn pin_owned(&self, pid: Pid) -> Result<Option<PhysicalAddress>, Error> {
        Ok(self.pin(self.processes.get(&pid).and_then(|p| p.owned)))
    }

    fn pin_borrowed(&self, pid: Pid) -> Result<Option<PhysicalAddress>, Error> {
        Ok(self.pin(self.processes.get(&pid).and_then(|p| p.borrowed)))
    }

    fn kernel_root(&self) -> Result<PhysicalAddress, Error> {
        self.kernel
            .ok_or(Error::NoSuchAddressSpace(AddressSpaceSelector::Kernel))
    }

    fn unpin(&self, origin: Origin) {
        match origin {
            Origin::Kernel => {}
            Origin::Current | Origin::Process { .. } => {
                self.unpins.fetch_add(1, Ordering::AcqRel);
            }
        }
    }
}
