//! # Fixed-Width Indexed Record Stores
//!
//! Everything the walker and the frame decoder read from the outside world is
//! a flat array of 8-byte records addressed by byte offset:
//!
//! | Store | Record index | Record |
//! |-------|--------------|--------|
//! | physical memory image | `table + index * 8` | page-table entry |
//! | `/proc/kpageflags` | frame number | `KPF_*` flag word |
//! | `/proc/kpagecount` | frame number | mapping count |
//! | `/proc/<pid>/pagemap` | `vaddr >> 12` | pagemap entry |
//!
//! [`RecordStore`] captures that access pattern. Records are native-endian,
//! and a read that returns fewer than [`RECORD_SIZE`] bytes is reported as
//! [`StoreError::Truncated`]; the missing bytes are never treated as zero.
//!
//! ```rust
//! # use pt_store::*;
//! let store = MemoryStore::from_records([0x11, 0x22]);
//! assert_eq!(store.read_record(1).unwrap(), 0x22);
//! assert!(matches!(store.read_record(2), Err(StoreError::Truncated { read: 0, .. })));
//! ```

#![cfg_attr(not(any(feature = "std", test, doctest)), no_std)]

extern crate alloc;

mod error;
#[cfg(all(feature = "std", unix))]
mod file;
mod memory;

pub use crate::error::StoreError;
#[cfg(all(feature = "std", unix))]
pub use crate::file::FileStore;
pub use crate::memory::MemoryStore;

/// Size of one record in bytes.
pub const RECORD_SIZE: usize = 8;

/// Random-access, read-only byte store holding 8-byte records.
pub trait RecordStore {
    /// Read up to `buf.len()` bytes starting at `offset`.
    ///
    /// Returns the number of bytes read; `0` means `offset` lies at or past
    /// the end of the store.
    ///
    /// # Errors
    /// Backend-specific failures (permissions, I/O).
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, StoreError>;

    /// Read one native-endian record at a byte offset.
    ///
    /// # Errors
    /// [`StoreError::Truncated`] when fewer than eight bytes are available,
    /// [`StoreError::OutOfRange`] when the record would overflow the offset
    /// space, plus anything [`RecordStore::read_at`] reports.
    fn read_u64_at(&self, offset: u64) -> Result<u64, StoreError> {
        let mut buf = [0u8; RECORD_SIZE];
        let mut filled = 0;
        while filled < RECORD_SIZE {
            let at = offset
                .checked_add(filled as u64)
                .ok_or(StoreError::OutOfRange { offset })?;
            let n = self.read_at(at, &mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled < RECORD_SIZE {
            return Err(StoreError::Truncated {
                offset,
                read: filled,
            });
        }
        Ok(u64::from_ne_bytes(buf))
    }

    /// Read the record with the given index, i.e. at byte offset `index * 8`.
    ///
    /// # Errors
    /// See [`RecordStore::read_u64_at`].
    fn read_record(&self, index: u64) -> Result<u64, StoreError> {
        let offset = index
            .checked_mul(RECORD_SIZE as u64)
            .ok_or(StoreError::OutOfRange { offset: index })?;
        self.read_u64_at(offset)
    }
}

impl<S: RecordStore + ?Sized> RecordStore for &S {
    #[inline]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, StoreError> {
        (**self).read_at(offset, buf)
    }
}

impl<S: RecordStore + ?Sized> RecordStore for alloc::boxed::Box<S> {
    #[inline]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, StoreError> {
        (**self).read_at(offset, buf)
    }
}
