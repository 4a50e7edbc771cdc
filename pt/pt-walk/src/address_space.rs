//! # Address Spaces
//!
//! An [`AddressSpace`] is the capability a walk runs against: a root table,
//! the paging layout, and a pin on whatever owns the tables. It is obtained
//! from an [`AddressSpaceProvider`] and releases its pin when dropped, so
//! every exit path of a walk (result, short-circuit, error) unpins exactly
//! once.
//!
//! ## Boundary
//!
//! Acquiring privileged access is not this crate's business. Two traits
//! form the seam:
//!
//! - [`AddressSpaceSource`] finds and pins roots for the current context, a
//!   process, or the kernel.
//! - [`PhysMapper`] reads one entry out of a table given its physical base.
//!   Every [`RecordStore`] is a `PhysMapper`, so a raw memory image works
//!   out of the box.
//!
//! ## Consistency
//!
//! The walker takes no locks on intermediate tables. If the owner modifies
//! the tables mid-walk the result may be stale or mix old and new entries.

mod snapshot;

pub use crate::address_space::snapshot::SnapshotSource;
use crate::entry::RawEntry;
use crate::error::Error;
use crate::level::LevelCount;
use crate::profile::ArchProfile;
use crate::walk::{Walk, WalkEngine};
use alloc::string::String;
use core::fmt;
use core::str::FromStr;
use log::{info, trace, warn};
use pt_addresses::{PhysicalAddress, VirtualAddress};
use pt_registers::ControlRegisters;
use pt_store::RecordStore;

/// Reads translation entries out of physical memory.
pub trait PhysMapper {
    /// Read entry `index` of the table at physical address `table`.
    ///
    /// # Errors
    /// Whatever the backing memory reports; a short read is
    /// [`Error::Truncated`].
    fn read_entry(&self, table: PhysicalAddress, index: u16) -> Result<RawEntry, Error>;
}

impl<S: RecordStore + ?Sized> PhysMapper for S {
    fn read_entry(&self, table: PhysicalAddress, index: u16) -> Result<RawEntry, Error> {
        let offset = table.as_u64().saturating_add(u64::from(index) * 8);
        let raw = self.read_u64_at(offset)?;
        trace!("read {raw:#018x} at {offset:#x}");
        Ok(RawEntry::new(raw))
    }
}

/// A user-space process identifier, `1..=i32::MAX`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Pid(u32);

impl Pid {
    pub const MAX: u32 = i32::MAX.unsigned_abs();

    #[must_use]
    pub const fn new(pid: u32) -> Option<Self> {
        if pid == 0 || pid > Self::MAX {
            None
        } else {
            Some(Self(pid))
        }
    }

    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which address space to walk.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AddressSpaceSelector {
    /// The caller's own address space.
    Current,
    Process(Pid),
    /// The kernel's reference tables.
    Kernel,
}

impl fmt::Display for AddressSpaceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current => f.write_str("self"),
            Self::Process(pid) => write!(f, "pid {pid}"),
            Self::Kernel => f.write_str("kernel"),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[error("invalid address space {0:?}: expected \"self\", \"kernel\" or a PID in 1..=2147483647")]
pub struct ParseSelectorError(String);

impl FromStr for AddressSpaceSelector {
    type Err = ParseSelectorError;

    /// Accepts `self` (or `current`), `kernel`, or a decimal PID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "self" | "current" => Ok(Self::Current),
            "kernel" => Ok(Self::Kernel),
            _ => s
                .parse::<u32>()
                .ok()
                .and_then(Pid::new)
                .map(Self::Process)
                .ok_or_else(|| ParseSelectorError(s.into())),
        }
    }
}

/// How a process's address space was obtained.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Ownership {
    /// The process's own tables.
    Owned,
    /// The tables a non-resident task borrows while it runs (kernel threads
    /// run on whatever address space was active before them).
    Borrowed,
}

/// Where an open [`AddressSpace`] came from; also what [`AddressSpaceSource::unpin`]
/// has to release.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Origin {
    Current,
    Process { pid: Pid, ownership: Ownership },
    Kernel,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current => f.write_str("current"),
            Self::Process {
                pid,
                ownership: Ownership::Owned,
            } => write!(f, "pid {pid}"),
            Self::Process {
                pid,
                ownership: Ownership::Borrowed,
            } => write!(f, "pid {pid} (borrowed)"),
            Self::Kernel => f.write_str("kernel"),
        }
    }
}

/// Locates and pins address-space roots.
///
/// Each successful `pin_*` call must be balanced by exactly one
/// [`unpin`](Self::unpin) with the matching [`Origin`]; [`AddressSpace`]
/// takes care of that.
pub trait AddressSpaceSource {
    type Mapper: PhysMapper + ?Sized;

    fn mapper(&self) -> &Self::Mapper;

    /// Pin the caller's own address space.
    ///
    /// # Errors
    /// [`Error::NoSuchAddressSpace`] if there is none.
    fn pin_current(&self) -> Result<PhysicalAddress, Error>;

    /// Pin the process's own address space, if it has one.
    ///
    /// # Errors
    /// Failures of the lookup itself; a missing space is `Ok(None)`.
    fn pin_owned(&self, pid: Pid) -> Result<Option<PhysicalAddress>, Error>;

    /// Pin the address space the process is borrowing, if any.
    ///
    /// # Errors
    /// Failures of the lookup itself; a missing space is `Ok(None)`.
    fn pin_borrowed(&self, pid: Pid) -> Result<Option<PhysicalAddress>, Error>;

    /// Root of the kernel's reference tables. Lives forever; no pin.
    ///
    /// # Errors
    /// [`Error::NoSuchAddressSpace`] if the source has no kernel root.
    fn kernel_root(&self) -> Result<PhysicalAddress, Error>;

    /// Release a pin taken for `origin`. Releasing [`Origin::Kernel`] does
    /// nothing.
    fn unpin(&self, origin: Origin);
}

/// Opens [`AddressSpace`]s with a fixed paging layout.
#[derive(Debug)]
pub struct AddressSpaceProvider<S> {
    source: S,
    profile: ArchProfile,
}

impl<S: AddressSpaceSource> AddressSpaceProvider<S> {
    #[must_use]
    pub const fn new(source: S, profile: ArchProfile) -> Self {
        Self { source, profile }
    }

    /// Build a provider whose layout follows the given control registers.
    ///
    /// # Errors
    /// [`Error::UnsupportedMode`] if the registers don't describe IA-32e
    /// paging.
    pub fn from_registers(source: S, regs: &ControlRegisters) -> Result<Self, Error> {
        let profile = ArchProfile::from_registers(regs)?;
        info!(
            "paging: {}, protection keys {}",
            profile.levels,
            if profile.protection_keys { "on" } else { "off" }
        );
        Ok(Self::new(source, profile))
    }

    #[must_use]
    pub const fn profile(&self) -> &ArchProfile {
        &self.profile
    }

    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Resolve `selector` and pin the result for the lifetime of the
    /// returned [`AddressSpace`].
    ///
    /// A process without an address space of its own falls back to the one
    /// it borrows.
    ///
    /// # Errors
    /// [`Error::NoSuchAddressSpace`] if neither exists, or any failure of the
    /// source.
    pub fn open(&self, selector: AddressSpaceSelector) -> Result<AddressSpace<'_, S>, Error> {
        let (root, origin) = match selector {
            AddressSpaceSelector::Current => (self.source.pin_current()?, Origin::Current),
            AddressSpaceSelector::Kernel => (self.source.kernel_root()?, Origin::Kernel),
            AddressSpaceSelector::Process(pid) => {
                if let Some(root) = self.source.pin_owned(pid)? {
                    let origin = Origin::Process {
                        pid,
                        ownership: Ownership::Owned,
                    };
                    (root, origin)
                } else if let Some(root) = self.source.pin_borrowed(pid)? {
                    warn!("pid {pid} has no address space of its own, using the borrowed one");
                    let origin = Origin::Process {
                        pid,
                        ownership: Ownership::Borrowed,
                    };
                    (root, origin)
                } else {
                    return Err(Error::NoSuchAddressSpace(selector));
                }
            }
        };

        info!("opened {origin} address space, root {root}");
        Ok(AddressSpace {
            source: &self.source,
            root,
            origin,
            profile: self.profile,
        })
    }
}

/// A pinned address space, ready to walk.
pub struct AddressSpace<'s, S: AddressSpaceSource> {
    source: &'s S,
    root: PhysicalAddress,
    origin: Origin,
    profile: ArchProfile,
}

impl<S: AddressSpaceSource> AddressSpace<'_, S> {
    #[inline]
    #[must_use]
    pub const fn root(&self) -> PhysicalAddress {
        self.root
    }

    #[inline]
    #[must_use]
    pub const fn origin(&self) -> Origin {
        self.origin
    }

    #[inline]
    #[must_use]
    pub const fn levels(&self) -> LevelCount {
        self.profile.levels
    }

    #[inline]
    #[must_use]
    pub const fn profile(&self) -> &ArchProfile {
        &self.profile
    }

    #[inline]
    #[must_use]
    pub fn mapper(&self) -> &S::Mapper {
        self.source.mapper()
    }

    /// Translate `va` in this address space.
    ///
    /// # Errors
    /// See [`WalkEngine::walk`].
    pub fn walk(&self, va: VirtualAddress) -> Result<Walk, Error> {
        WalkEngine::new(self.profile).walk(self.mapper(), self.root, va)
    }
}

impl<S: AddressSpaceSource> fmt::Debug for AddressSpace<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressSpace")
            .field("root", &self.root)
            .field("origin", &self.origin)
            .field("levels", &self.profile.levels)
            .finish_non_exhaustive()
    }
}

impl<S: AddressSpaceSource> Drop for AddressSpace<'_, S> {
    fn drop(&mut self) {
        trace!("releasing {} address space", self.origin);
        self.source.unpin(self.origin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_parsing() {
        assert_eq!("self".parse(), Ok(AddressSpaceSelector::Current));
        assert_eq!("kernel".parse(), Ok(AddressSpaceSelector::Kernel));
        assert_eq!(
            "1234".parse(),
            Ok(AddressSpaceSelector::Process(Pid::new(1234).unwrap()))
        );
        assert!("0".parse::<AddressSpaceSelector>().is_err());
        assert!("2147483648".parse::<AddressSpaceSelector>().is_err());
        assert!("-1".parse::<AddressSpaceSelector>().is_err());
        assert!("12ab".parse::<AddressSpaceSelector>().is_err());
    }

    #[test]
    fn pid_bounds() {
        assert!(Pid::new(1).is_some());
        assert!(Pid::new(0x7FFF_FFFF).is_some());
        assert!(Pid::new(0x8000_0000).is_none());
    }
}
